use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use tracing::{error, info};

use pictor_types::api::{GenerateImageRequest, GenerateImageResponse};

use crate::error::ApiError;
use crate::staging::{self, StagingJob};
use crate::state::AppState;

/// Object-storage file name for a generation started at `now`.
///
/// Second granularity: two generations in the same second get the same name
/// and the later upload overwrites the earlier object.
pub fn generated_filename(now: DateTime<Utc>) -> String {
    format!("generated_image_{}.png", now.format("%Y%m%d%H%M%S"))
}

/// Ask the provider for an image and hand its URL straight back. Staging into
/// object storage and recording metadata run on a detached task; nothing is
/// scheduled when the provider call fails.
pub async fn start_generation(
    state: &AppState,
    prompt: String,
    user_id: Option<i64>,
) -> Result<String, ApiError> {
    info!("Generating image for user {:?}", user_id);

    let image_url = state.generator.generate(&prompt).await.map_err(|e| {
        error!("Image generation failed: {}", e);
        ApiError::Upstream("Image generation API request failed".into())
    })?;

    let job = StagingJob {
        image_url: image_url.clone(),
        filename: generated_filename(Utc::now()),
        prompt,
        user_id,
    };
    tokio::spawn(staging::run(state.clone(), job));

    Ok(image_url)
}

pub async fn generate_image(
    State(state): State<AppState>,
    Json(req): Json<GenerateImageRequest>,
) -> Result<Json<GenerateImageResponse>, ApiError> {
    let image_url = start_generation(&state, req.prompt, req.user_id).await?;
    Ok(Json(GenerateImageResponse { image_url }))
}
