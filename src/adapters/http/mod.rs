//! Inbound HTTP adapter: the axum router over the registry service.

pub mod error;
pub mod upload;
pub mod videos;
pub mod watch;

use crate::application::registry::RegistryService;
use crate::config::Config;
use crate::ports::repository::VideoRepository;
use crate::ports::thumbnailer::Thumbnailer;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the application router. Body limits are disabled because the
/// storage layer enforces its own byte cap while writing.
pub fn router<R, T>(registry: Arc<RegistryService<R, T>>, config: &Config) -> Router
where
    R: VideoRepository + 'static,
    T: Thumbnailer + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/videos", get(videos::list::<R, T>))
        .route(
            "/api/videos/:id",
            get(videos::get_one::<R, T>).delete(videos::delete::<R, T>),
        )
        .route("/api/upload", post(upload::upload::<R, T>))
        .route("/watch/:id", get(watch::watch::<R, T>))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .nest_service("/thumbnails", ServeDir::new(&config.thumbnail_dir))
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs::FsStorage;
    use crate::adapters::json_library::JsonLibrary;
    use crate::domain::video::VideoRecord;
    use crate::ports::thumbnailer::MockThumbnailer;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tempfile::{tempdir, TempDir};
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "X-TUBELET-BOUNDARY";

    struct Fixture {
        _dir: TempDir,
        upload_dir: std::path::PathBuf,
        app: Router,
    }

    async fn fixture(owner_required: bool) -> Fixture {
        let dir = tempdir().unwrap();
        let config = Config {
            addr: String::from("127.0.0.1"),
            port: String::from("0"),
            upload_dir: dir.path().join("uploads"),
            thumbnail_dir: dir.path().join("thumbnails"),
            public_dir: dir.path().join("public"),
            library_path: dir.path().join("videos.json"),
            max_upload_bytes: 1024 * 1024,
            owner_required,
            thumbnail_timeout_secs: 5,
            thumbnail_width: 480,
        };
        std::fs::create_dir_all(&config.upload_dir).unwrap();
        std::fs::create_dir_all(&config.thumbnail_dir).unwrap();

        let repo = Arc::new(JsonLibrary::open(&config.library_path).await.unwrap());

        let mut thumbnailer = MockThumbnailer::new();
        thumbnailer.expect_media_duration().returning(|_| Ok(10.0));
        thumbnailer.expect_extract_frame().returning(|_, _, output| {
            std::fs::write(output, b"jpg").unwrap();
            Ok(())
        });

        let registry = Arc::new(RegistryService::new(
            repo,
            FsStorage::new(&config.upload_dir, config.max_upload_bytes),
            Arc::new(thumbnailer),
            &config.thumbnail_dir,
            owner_required,
        ));

        let app = router(registry, &config);
        Fixture {
            _dir: dir,
            upload_dir: config.upload_dir,
            app,
        }
    }

    fn multipart_body(file: Option<(&str, &str)>, title: Option<&str>, owner: Option<&str>) -> Body {
        let mut body = String::new();
        if let Some((file_name, contents)) = file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"videoFile\"; filename=\"{file_name}\"\r\nContent-Type: video/mp4\r\n\r\n{contents}\r\n"
            ));
        }
        if let Some(title) = title {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n"
            ));
        }
        if let Some(owner) = owner {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"owner\"\r\n\r\n{owner}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn upload_request(file: Option<(&str, &str)>, title: Option<&str>, owner: Option<&str>) -> Request<Body> {
        Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(file, title, owner))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn upload_then_list_round_trip() {
        let fx = fixture(false).await;

        let response = fx
            .app
            .clone()
            .oneshot(upload_request(
                Some(("clip one.mp4", "FAKEVIDEO")),
                Some("Demo"),
                Some("abc"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        assert_eq!(body["video"]["id"], 1);
        assert_eq!(body["video"]["title"], "Demo");
        assert_eq!(body["video"]["ownerKey"], "abc");

        let response = fx
            .app
            .clone()
            .oneshot(Request::get("/api/videos").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let videos: Vec<VideoRecord> =
            serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, 1);
    }

    #[tokio::test]
    async fn upload_without_a_file_is_a_client_error() {
        let fx = fixture(false).await;

        let response = fx
            .app
            .clone()
            .oneshot(upload_request(None, Some("Demo"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn upload_without_an_owner_is_rejected_when_scoped() {
        let fx = fixture(true).await;

        let response = fx
            .app
            .clone()
            .oneshot(upload_request(
                Some(("clip.mp4", "FAKEVIDEO")),
                Some("Demo"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn multipart_error_after_the_file_leaves_no_orphan() {
        let fx = fixture(false).await;

        // A form that dies mid-way: the file part arrives in full, the title
        // part is cut off before its closing boundary.
        let mut body = String::new();
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"videoFile\"; filename=\"clip.mp4\"\r\nContent-Type: video/mp4\r\n\r\nFAKEVIDEO\r\n"
        ));
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nDem"
        ));

        let request = Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = fx.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // The stored file was discarded along with the failed form.
        assert_eq!(std::fs::read_dir(&fx.upload_dir).unwrap().count(), 0);

        let response = fx
            .app
            .clone()
            .oneshot(Request::get("/api/videos").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let videos: Vec<VideoRecord> =
            serde_json::from_value(json_body(response).await).unwrap();
        assert!(videos.is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let fx = fixture(false).await;
        let huge = "x".repeat(2 * 1024 * 1024);

        let response = fx
            .app
            .clone()
            .oneshot(upload_request(Some(("big.mp4", &huge)), None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn list_requires_an_owner_when_scoped() {
        let fx = fixture(true).await;

        let response = fx
            .app
            .clone()
            .oneshot(Request::get("/api/videos").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = fx
            .app
            .clone()
            .oneshot(
                Request::get("/api/videos?owner=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_unknown_video_is_not_found() {
        let fx = fixture(false).await;

        let response = fx
            .app
            .clone()
            .oneshot(Request::get("/api/videos/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json_body(response).await;
        assert_eq!(body["message"], "video not found");
    }

    #[tokio::test]
    async fn malformed_id_is_a_client_error() {
        let fx = fixture(false).await;

        let response = fx
            .app
            .clone()
            .oneshot(
                Request::get("/api/videos/notanumber")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_by_a_non_owner_is_forbidden() {
        let fx = fixture(false).await;

        let response = fx
            .app
            .clone()
            .oneshot(upload_request(
                Some(("clip.mp4", "FAKEVIDEO")),
                Some("Demo"),
                Some("abc"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = fx
            .app
            .clone()
            .oneshot(
                Request::delete("/api/videos/1?owner=xyz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = fx
            .app
            .clone()
            .oneshot(
                Request::delete("/api/videos/1?owner=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn watch_page_renders_preview_markup() {
        let fx = fixture(false).await;

        fx.app
            .clone()
            .oneshot(upload_request(
                Some(("clip.mp4", "FAKEVIDEO")),
                Some("Demo"),
                None,
            ))
            .await
            .unwrap();

        let response = fx
            .app
            .clone()
            .oneshot(Request::get("/watch/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let page = text_body(response).await;
        assert!(page.contains(r#"<meta property="og:title" content="Demo">"#));
        assert!(page.contains("<video"));
    }

    #[tokio::test]
    async fn watch_page_for_unknown_video_is_an_html_404() {
        let fx = fixture(false).await;

        let response = fx
            .app
            .clone()
            .oneshot(Request::get("/watch/99").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let page = text_body(response).await;
        assert!(page.contains("Video not found"));
    }
}
