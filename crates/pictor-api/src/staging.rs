use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use pictor_storage::ObjectStore;

use crate::error::ApiError;
use crate::recorder;
use crate::state::AppState;

/// Object-storage prefix for staged images.
pub const KEY_PREFIX: &str = "generated_images";

/// Everything the background task needs, captured when the provider answers.
#[derive(Debug, Clone)]
pub struct StagingJob {
    pub image_url: String,
    pub filename: String,
    pub prompt: String,
    pub user_id: Option<i64>,
}

/// Background entry point. Nobody waits on this task, so failures end here.
pub async fn run(state: AppState, job: StagingJob) {
    if let Err(e) = stage_and_record(&state, &job).await {
        error!("Background staging of {} failed: {}", job.filename, e);
    }
}

/// Download the provider image, copy it into object storage and record it.
///
/// A failed download aborts before anything is recorded. A failed upload does
/// not: the row is written without a storage URL and the provider URL stays
/// the only reference. Each job downloads into its own scratch file, which is
/// removed on every path.
pub async fn stage_and_record(state: &AppState, job: &StagingJob) -> Result<i64, ApiError> {
    tokio::fs::create_dir_all(&state.scratch_dir).await?;
    let scratch = tempfile::Builder::new()
        .prefix("pictor-")
        .suffix(".png")
        .tempfile_in(&state.scratch_dir)?;

    download(&state.http, &job.image_url, scratch.path()).await?;

    let s3_url = upload(state.store.as_ref(), scratch.path(), &job.filename).await;
    if let Err(e) = scratch.close() {
        warn!("Failed to remove scratch file for {}: {}", job.filename, e);
    }

    recorder::record(
        state,
        job.prompt.clone(),
        job.image_url.clone(),
        s3_url,
        job.user_id,
    )
    .await
}

async fn download(client: &Client, url: &str, path: &Path) -> Result<u64, ApiError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::Download(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(ApiError::Download(format!("provider returned {}", resp.status())));
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ApiError::Download(e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    info!("Downloaded {} ({} bytes)", path.display(), written);
    Ok(written)
}

/// Upload the scratch file; `None` on any failure.
async fn upload(store: &dyn ObjectStore, path: &Path, filename: &str) -> Option<String> {
    let key = format!("{}/{}", KEY_PREFIX, filename);

    let body = match tokio::fs::read(path).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Could not read {} for upload: {}", path.display(), e);
            return None;
        }
    };

    match store.put(&key, body, "image/png").await {
        Ok(url) => {
            info!("Uploaded {} to {}", key, url);
            Some(url)
        }
        Err(e) => {
            warn!("Upload of {} failed, recording without storage URL: {}", key, e);
            None
        }
    }
}
