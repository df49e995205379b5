//! Server-rendered watch page with social-preview meta tags.

use super::error::ApiError;
use crate::application::registry::{RegistryError, RegistryService};
use crate::domain::video::VideoRecord;
use crate::ports::repository::VideoRepository;
use crate::ports::thumbnailer::Thumbnailer;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;

pub async fn watch<R, T>(
    State(registry): State<Arc<RegistryService<R, T>>>,
    Path(id): Path<u64>,
) -> Response
where
    R: VideoRepository + 'static,
    T: Thumbnailer + 'static,
{
    match registry.get(id).await {
        Ok(video) => Html(render_watch_page(&video)).into_response(),
        Err(RegistryError::NotFound) => {
            (StatusCode::NOT_FOUND, Html(render_not_found())).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn render_watch_page(video: &VideoRecord) -> String {
    let title = escape_html(&video.title);
    format!(
        r#"<!doctype html>
<html>
    <head>
        <title>{title}</title>
        <meta property="og:title" content="{title}">
        <meta property="og:type" content="video.other">
        <meta property="og:image" content="{thumbnail}">
        <meta property="og:video" content="{source}">
    </head>
    <body>
        <h1>{title}</h1>
        <p>Uploaded on {date}</p>
        <video controls autoplay src="{source}" poster="{thumbnail}"></video>
    </body>
</html>
"#,
        title = title,
        thumbnail = escape_html(&video.thumbnail_path),
        source = escape_html(&video.path),
        date = video.upload_date.format("%Y-%m-%d"),
    )
}

fn render_not_found() -> String {
    String::from(
        r#"<!doctype html>
<html>
    <head><title>Video not found</title></head>
    <body>
        <h1>Video not found</h1>
        <p>This video might not exist.</p>
    </body>
</html>
"#,
    )
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::video::{ProcessingState, PENDING_THUMBNAIL};
    use chrono::Utc;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<b>"A & B"</b>"#),
            "&lt;b&gt;&quot;A &amp; B&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn watch_page_embeds_preview_tags() {
        let record = VideoRecord {
            id: 1,
            owner_key: None,
            title: "My <script> clip".to_string(),
            file_name: "1-clip.mp4".to_string(),
            path: "/uploads/1-clip.mp4".to_string(),
            thumbnail_path: PENDING_THUMBNAIL.to_string(),
            upload_date: Utc::now(),
            processing_state: ProcessingState::Pending,
        };

        let page = render_watch_page(&record);
        assert!(page.contains(r#"<meta property="og:title" content="My &lt;script&gt; clip">"#));
        assert!(page.contains(r#"<meta property="og:video" content="/uploads/1-clip.mp4">"#));
        assert!(!page.contains("<script>"));
    }
}
