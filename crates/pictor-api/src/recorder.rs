use tracing::info;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// Insert one image row and return its id. `s3_url` is absent when staging
/// into object storage failed; `user_id` is absent for anonymous generations.
pub async fn record(
    state: &AppState,
    prompt: String,
    openai_url: String,
    s3_url: Option<String>,
    user_id: Option<i64>,
) -> Result<i64, ApiError> {
    let id = with_db(state, move |db| {
        Ok(db.insert_image(&prompt, &openai_url, s3_url.as_deref(), user_id)?)
    })
    .await?;

    info!("Recorded image {}", id);
    Ok(id)
}
