use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore as _, PutOptions, PutPayload, RetryConfig};
use tracing::{debug, info};

use crate::{ObjectStore, StorageError};

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// S3-compatible endpoint, addressed path-style (`{endpoint}/{bucket}/{key}`).
    /// When unset, AWS virtual-hosted URLs are used.
    pub endpoint: Option<String>,
}

/// S3 bucket client. Requests go through `object_store`, which signs them with
/// whatever credentials the environment provides; the URLs it hands out are
/// the bucket's plain object URLs.
pub struct S3Store {
    inner: AmazonS3,
    config: S3Config,
}

impl S3Store {
    /// Credentials come from the standard AWS environment: static keys,
    /// web identity, container or instance role.
    pub fn from_env(config: S3Config) -> Result<Self, StorageError> {
        Self::with_builder(AmazonS3Builder::from_env(), config)
    }

    /// Applies `config` on top of `builder`, which may already carry
    /// credentials.
    pub fn with_builder(builder: AmazonS3Builder, config: S3Config) -> Result<Self, StorageError> {
        let mut builder = builder
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_retry(RetryConfig {
                max_retries: 0,
                ..Default::default()
            });
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint.trim_end_matches('/'))
                .with_allow_http(true)
                .with_virtual_hosted_style_request(false);
        }
        let inner = builder.build()?;

        info!(
            "Object storage: bucket {} in {}{}",
            config.bucket,
            config.region,
            config
                .endpoint
                .as_deref()
                .map(|e| format!(" via {}", e))
                .unwrap_or_default()
        );
        Ok(Self { inner, config })
    }
}

fn not_found(key: &str) -> impl FnOnce(object_store::Error) -> StorageError + '_ {
    move |e| match e {
        object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
        other => StorageError::Backend(other),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let size = body.len();
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.inner
            .put_opts(&Path::from(key), PutPayload::from(body), opts)
            .await?;

        debug!("Stored {} ({} bytes)", key, size);
        Ok(self.public_url(key))
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let object = self.inner.get(&Path::from(key)).await.map_err(not_found(key))?;
        object.bytes().await.map_err(not_found(key))
    }

    fn public_url(&self, key: &str) -> String {
        let S3Config { bucket, region, endpoint } = &self.config;
        match endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
            None => format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
        }
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let key = match &self.config.endpoint {
            Some(endpoint) => {
                let prefix = format!("{}/{}/", endpoint.trim_end_matches('/'), self.config.bucket);
                url.strip_prefix(&prefix)?
            }
            None => url.rsplit_once(".amazonaws.com/")?.1,
        };

        if key.is_empty() { None } else { Some(key.to_string()) }
    }
}
