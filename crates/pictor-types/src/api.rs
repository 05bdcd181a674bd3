use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub msg: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub msg: String,
    pub user_id: i64,
}

// -- Generation --

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    /// Anonymous generations are allowed.
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    /// The provider's transient URL; staging into object storage happens later.
    pub image_url: String,
}

// -- Images --

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: i64,
    pub prompt: String,
    pub openai_url: String,
    pub s3_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Misc --

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}
