//! Database row types. These map directly to SQLite rows and are distinct
//! from the pictor-types API models.

/// The columns login needs; the rest of the user row is never read back.
pub struct UserRow {
    pub id: i64,
    /// Argon2 PHC string.
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ImageRow {
    pub id: i64,
    pub prompt: String,
    pub openai_url: String,
    /// Absent when the image never made it into object storage.
    pub s3_url: Option<String>,
    pub user_id: Option<i64>,
    pub created_at: String,
}
