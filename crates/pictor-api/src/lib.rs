pub mod auth;
pub mod error;
pub mod gallery;
pub mod generation;
pub mod openai;
pub mod recorder;
pub mod staging;
pub mod state;

use axum::{
    Json, Router,
    routing::{get, post},
};

use pictor_types::api::RootResponse;

pub use state::{AppState, AppStateInner};

/// All HTTP routes, with state applied. Middleware layers are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/generate-image", post(generation::generate_image))
        .route("/my-images", get(gallery::my_images))
        .route("/get-image/{image_id}", get(gallery::get_image));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .with_state(state)
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse { message: "Pictor is running" })
}
