use std::path::PathBuf;
use std::sync::Arc;

use pictor_db::Database;
use pictor_storage::ObjectStore;

use crate::error::ApiError;
use crate::openai::ImageGenerator;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler or background task needs. Clients are built once at
/// startup and shared; nothing here is mutated after construction.
pub struct AppStateInner {
    pub db: Database,
    pub generator: Arc<dyn ImageGenerator>,
    pub store: Arc<dyn ObjectStore>,
    /// Used to fetch generated images from the provider.
    pub http: reqwest::Client,
    /// Where downloads are staged before upload.
    pub scratch_dir: PathBuf,
}

/// Run blocking database (and hashing) work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db)).await?
}
