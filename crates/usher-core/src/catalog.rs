//! Remote catalog client
//!
//! Fetches the list of playable assets from `{serverAddress}/api/v1/files`.
//! Consumed once at catalog-load time; the descriptors it returns feed the
//! supervisor's play requests unchanged.

use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    error::{Error, Result},
    types::{AssetDescriptor, ControllerConfig},
};

/// Client for the remote catalog service
pub struct CatalogClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl CatalogClient {
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let endpoint = config.server_address.join("api/v1/files")?;

        Ok(Self { client, endpoint })
    }

    /// Fetch the ordered list of playable assets.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn list_files(&self) -> Result<Vec<AssetDescriptor>> {
        let files: Vec<AssetDescriptor> = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| Error::CatalogFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::CatalogFetch(e.to_string()))?;

        debug!(count = files.len(), "Catalog fetched");
        Ok(files)
    }
}
