//! `SecretStore` implementation over the GCP Secret Manager REST API.
//!
//! The corpus has no GCP SDK crate anywhere (the teacher talks to Postgres
//! and Tantivy, not GCP); rather than fabricate a `google-cloud-*` dependency
//! that isn't grounded in anything here, this hits the plain REST surface
//! with `reqwest`, which the workspace root already depends on. Mirrors the
//! request shape of `examples/original_source/src/gcp.go`'s
//! `AccessSecretVersionRequest`.

use tango_core::ports::SecretStore;

const SECRET_MANAGER_API: &str = "https://secretmanager.googleapis.com/v1";

pub struct GcpSecretStore {
    client: reqwest::Client,
    access_token: String,
}

impl GcpSecretStore {
    /// `access_token` is an OAuth2 bearer token for a service account with
    /// `secretmanager.versions.access`; obtaining one is out of scope here
    /// (spec.md §1 names the secret store as an external collaborator) —
    /// callers typically source it from the metadata server or
    /// `GOOGLE_APPLICATION_CREDENTIALS` via a sidecar.
    pub fn new(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }
}

#[async_trait::async_trait]
impl SecretStore for GcpSecretStore {
    async fn access_secret(&self, resource_name: &str) -> anyhow::Result<Vec<u8>> {
        let url = format!("{SECRET_MANAGER_API}/{resource_name}:access");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;

        #[derive(serde::Deserialize)]
        struct Payload {
            data: String,
        }
        #[derive(serde::Deserialize)]
        struct AccessSecretVersionResponse {
            payload: Payload,
        }

        let parsed: AccessSecretVersionResponse = response.json().await?;
        let decoded = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            parsed.payload.data,
        )?;
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_url_is_versioned() {
        let url = format!(
            "{SECRET_MANAGER_API}/projects/p/secrets/TangoJWTSecret/versions/latest:access"
        );
        assert!(url.starts_with("https://secretmanager.googleapis.com/v1/"));
    }
}
