//! `ObjectStore` implementations: a GCS REST-backed one for production, and
//! a local-disk one for development and integration tests — mirrors the
//! spec's framing of the object store as an external collaborator (spec.md
//! §1) that core logic never touches directly.

use std::path::PathBuf;

use tango_core::ports::ObjectStore;

const GCS_UPLOAD_API: &str = "https://storage.googleapis.com/upload/storage/v1/b";

pub struct GcsObjectStore {
    client: reqwest::Client,
    access_token: String,
}

impl GcsObjectStore {
    pub fn new(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for GcsObjectStore {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        let url = format!("{GCS_UPLOAD_API}/{bucket}/o?uploadType=media&name={key}");
        self.client
            .post(&url)
            .bearer_auth(&self.access_token)
            .body(bytes)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Writes objects under a local directory instead of GCS. Used for local
/// development and in the integration tests under `tests/`, where spinning
/// up real GCP credentials would be out of place.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(key), bytes).await?;
        Ok(())
    }
}
