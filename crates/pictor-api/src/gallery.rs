use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use pictor_db::models::ImageRow;
use pictor_types::api::{ImageResponse, UserQuery};

use crate::error::ApiError;
use crate::state::{AppState, with_db};

const NOT_OWNED: &str = "Image not found or access denied";
const NOT_STAGED: &str = "Stored image not found";
const DOWNLOAD_FAILED: &str = "Failed to download image";

fn to_response(row: ImageRow) -> Result<ImageResponse, ApiError> {
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map_err(|e| anyhow::anyhow!("bad created_at {:?} on image {}: {}", row.created_at, row.id, e))?
        .with_timezone(&Utc);

    Ok(ImageResponse {
        id: row.id,
        prompt: row.prompt,
        openai_url: row.openai_url,
        s3_url: row.s3_url,
        created_at,
    })
}

/// All images owned by `user_id`, newest first. Empty when there are none.
pub async fn list_images(state: &AppState, user_id: i64) -> Result<Vec<ImageResponse>, ApiError> {
    let rows = with_db(state, move |db| Ok(db.list_images_for_user(user_id)?)).await?;
    rows.into_iter().map(to_response).collect()
}

/// Bytes of an owned, staged image.
///
/// A foreign image id and a nonexistent one fail identically.
pub async fn fetch_image(state: &AppState, image_id: i64, user_id: i64) -> Result<Bytes, ApiError> {
    let image = with_db(state, move |db| Ok(db.get_owned_image(image_id, user_id)?))
        .await?
        .ok_or(ApiError::NotFound(NOT_OWNED))?;

    let s3_url = image.s3_url.ok_or(ApiError::NotFound(NOT_STAGED))?;

    let key = state.store.key_from_url(&s3_url).ok_or_else(|| {
        error!("Image {} has a storage URL outside the bucket: {}", image_id, s3_url);
        ApiError::Upstream(DOWNLOAD_FAILED.into())
    })?;

    state.store.get(&key).await.map_err(|e| {
        error!("Object storage read of {} failed: {}", key, e);
        ApiError::Upstream(DOWNLOAD_FAILED.into())
    })
}

pub async fn my_images(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ImageResponse>>, ApiError> {
    let images = list_images(&state, query.user_id).await?;
    info!("Listed {} images for user {}", images.len(), query.user_id);
    Ok(Json(images))
}

pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = fetch_image(&state, image_id, query.user_id).await?;
    info!("Serving image {} to user {}", image_id, query.user_id);
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}
