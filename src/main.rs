//! Service entry point.
//!
//! Wires up the local adapters (JSON library, filesystem storage, ffmpeg),
//! the application services and the HTTP layer, then serves.

use std::sync::Arc;
use std::time::Duration;
use tubelet::adapters::http;
use tubelet::application::registry::RegistryService;
use tubelet::{Config, FfmpegThumbnailer, FsStorage, JsonLibrary};

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt::init();

    for dir in [&config.upload_dir, &config.thumbnail_dir] {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            eprintln!("Failed to create {:?}: {}", dir, e);
            std::process::exit(1);
        }
    }

    let library = match JsonLibrary::open(&config.library_path).await {
        Ok(library) => Arc::new(library),
        Err(e) => {
            eprintln!("Failed to open library {:?}: {}", config.library_path, e);
            std::process::exit(1);
        }
    };

    let storage = FsStorage::new(&config.upload_dir, config.max_upload_bytes);
    let thumbnailer = Arc::new(FfmpegThumbnailer::new(
        Duration::from_secs(config.thumbnail_timeout_secs),
        config.thumbnail_width,
    ));

    let registry = Arc::new(RegistryService::new(
        library,
        storage,
        thumbnailer,
        &config.thumbnail_dir,
        config.owner_required,
    ));

    let app = http::router(registry, &config);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    println!("Listening at {}:{}", config.addr, config.port);
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
