//! Access to the [GCE metadata server](https://cloud.google.com/compute/docs/metadata/overview).

use crate::error::Error;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Environment variable overriding the metadata server host, honoured by Google's client
/// libraries as well. When set, the process is assumed to run on GCE.
pub const METADATA_HOST_VAR: &str = "GCE_METADATA_HOST";

// Documented metadata server IP address. Asking the IP avoids waiting for a DNS lookup
// that will never succeed off-platform.
const METADATA_IP: &str = "169.254.169.254";

const PRESENCE_TIMEOUT: Duration = Duration::from_secs(2);

/// What the environment resolver needs to know about the platform.
#[async_trait]
pub trait Metadata: Send + Sync {
    /// Whether the process runs on Google Compute Engine (which includes GKE nodes).
    async fn on_gce(&self) -> bool;

    async fn project_id(&self) -> Result<String, Error>;

    /// The name of the VM instance, i.e. the GKE node.
    async fn instance_name(&self) -> Result<String, Error>;

    /// The host serving the metadata, which also hands out access tokens.
    fn host(&self) -> &str;
}

/// Talks to the metadata server over HTTP.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Client,
    host: String,
    host_from_env: bool,
}

impl MetadataClient {
    /// Uses the host in `GCE_METADATA_HOST` if present, otherwise the documented IP.
    pub fn from_env() -> Self {
        Self::from_host_var(std::env::var(METADATA_HOST_VAR).ok())
    }

    fn from_host_var(value: Option<String>) -> Self {
        match value {
            Some(host) if !host.is_empty() => Self {
                host_from_env: true,
                ..Self::with_host(host)
            },
            _ => Self::with_host(METADATA_IP),
        }
    }

    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            // The metadata server is link-local; never route it through a proxy.
            client: Client::builder().no_proxy().build().unwrap_or_default(),
            host: host.into(),
            host_from_env: false,
        }
    }

    async fn get(&self, suffix: &str) -> Result<String, Error> {
        let url = format!("http://{}/computeMetadata/v1/{}", self.host, suffix);
        let response = self
            .client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::MetadataRequestError {
                context: format!("performing HTTP GET of '{suffix}'"),
                source: e,
            })?
            .error_for_status()
            .map_err(|e| Error::MetadataRequestError {
                context: format!("response status of '{suffix}'"),
                source: e,
            })?;

        let value = response
            .text()
            .await
            .map_err(|e| Error::MetadataRequestError {
                context: format!("consuming response body of '{suffix}'"),
                source: e,
            })?;
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::MetadataValueEmpty(suffix.to_string()));
        }
        Ok(value.to_string())
    }
}

#[async_trait]
impl Metadata for MetadataClient {
    async fn on_gce(&self) -> bool {
        if self.host_from_env {
            return true;
        }
        let presence = self
            .client
            .get(format!("http://{}", self.host))
            .timeout(PRESENCE_TIMEOUT)
            .send()
            .await;
        match presence {
            Ok(response) => response
                .headers()
                .get("Metadata-Flavor")
                .map_or(false, |v| v == "Google"),
            Err(_) => false,
        }
    }

    async fn project_id(&self) -> Result<String, Error> {
        self.get("project/project-id").await
    }

    async fn instance_name(&self) -> Result<String, Error> {
        self.get("instance/name").await
    }

    fn host(&self) -> &str {
        &self.host
    }
}
