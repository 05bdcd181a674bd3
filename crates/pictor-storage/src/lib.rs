//! Durable object storage for generated images.
//!
//! [`ObjectStore`] is the seam the rest of the server talks to; [`S3Store`]
//! implements it on top of the `object_store` crate's S3 client.

pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use s3::{S3Config, S3Store};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {0} not found")]
    NotFound(String),
    #[error("object storage request failed: {0}")]
    Backend(#[from] object_store::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing any existing object, and return
    /// the object's public URL.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    fn public_url(&self, key: &str) -> String;

    /// Inverse of [`ObjectStore::public_url`]. `None` if the URL does not
    /// point into this store.
    fn key_from_url(&self, url: &str) -> Option<String>;
}
