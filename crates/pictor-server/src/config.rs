use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use pictor_api::openai::DEFAULT_BASE_URL;
use pictor_storage::S3Config;

const DEFAULT_REGION: &str = "ap-northeast-2";

/// Required variables; startup aborts if any is unset or empty.
///
/// S3 credentials are not listed: the object store resolves them itself from
/// the usual AWS sources.
pub const REQUIRED: &[&str] = &["DATABASE_URL", "AWS_S3_BUCKET", "OPENAI_API_KEY"];

#[derive(Debug)]
pub struct Config {
    pub db_path: PathBuf,
    pub s3: S3Config,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub host: String,
    pub port: u16,
    pub scratch_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        let missing: Vec<&str> = REQUIRED.iter().copied().filter(|name| get(*name).is_none()).collect();
        if !missing.is_empty() {
            bail!("missing required environment variables: {}", missing.join(", "));
        }
        let required = |name: &str| get(name).unwrap_or_default();

        let port = match get("PICTOR_PORT") {
            Some(port) => port.parse().with_context(|| format!("PICTOR_PORT is not a port: {}", port))?,
            None => 8000,
        };

        Ok(Self {
            db_path: db_path_from_url(&required("DATABASE_URL")),
            s3: S3Config {
                bucket: required("AWS_S3_BUCKET"),
                region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.into()),
                endpoint: get("AWS_S3_ENDPOINT"),
            },
            openai_api_key: required("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            host: get("PICTOR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            scratch_dir: get("PICTOR_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
        })
    }
}

/// Accepts a bare path or a `sqlite:` URL.
fn db_path_from_url(url: &str) -> PathBuf {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    PathBuf::from(path)
}
