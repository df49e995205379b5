//! List, get-one and delete handlers for `/api/videos`.

use super::error::ApiError;
use crate::application::registry::RegistryService;
use crate::domain::video::VideoRecord;
use crate::ports::repository::VideoRepository;
use crate::ports::thumbnailer::Thumbnailer;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: Option<String>,
}

pub async fn list<R, T>(
    State(registry): State<Arc<RegistryService<R, T>>>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<VideoRecord>>, ApiError>
where
    R: VideoRepository + 'static,
    T: Thumbnailer + 'static,
{
    let videos = registry.list(query.owner.as_deref()).await?;
    Ok(Json(videos))
}

pub async fn get_one<R, T>(
    State(registry): State<Arc<RegistryService<R, T>>>,
    Path(id): Path<u64>,
) -> Result<Json<VideoRecord>, ApiError>
where
    R: VideoRepository + 'static,
    T: Thumbnailer + 'static,
{
    let video = registry.get(id).await?;
    Ok(Json(video))
}

pub async fn delete<R, T>(
    State(registry): State<Arc<RegistryService<R, T>>>,
    Path(id): Path<u64>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Value>, ApiError>
where
    R: VideoRepository + 'static,
    T: Thumbnailer + 'static,
{
    registry.delete(id, query.owner.as_deref()).await?;
    Ok(Json(json!({ "message": "Video deleted." })))
}
