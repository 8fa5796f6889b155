//! Port traits for collaborators outside the core's scope (spec.md §1:
//! "the object store used to durably archive per-job accounting" and "the
//! secret store that yields signing keys and serving certificates" are
//! both named as out-of-scope external collaborators).
//!
//! Mirrors `sem_os_core::ports` — core logic depends only on these traits,
//! never on a concrete GCS/secret-manager client. `tango-server` supplies
//! the real implementations; tests supply in-memory ones.

use async_trait::async_trait;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` to `bucket/key`, overwriting any existing object.
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the named secret's current version payload.
    async fn access_secret(&self, resource_name: &str) -> anyhow::Result<Vec<u8>>;
}
