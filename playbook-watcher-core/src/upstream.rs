use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::PLAYBOOKS_API_PATH;
use crate::error::{WatcherError, WatcherResult};
use crate::models::PlaybookRunList;

const RUNS_PATH: &str = "/runs";

/// REST client for the playbooks API, authenticated as the plugin's bot.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    api_url: String,
    token: String,
}

impl UpstreamClient {
    /// Builds a client rooted at `<site_url>/plugins/playbooks/api/v0`.
    pub fn new(site_url: &str, token: impl Into<String>, timeout: Duration) -> WatcherResult<Self> {
        Self::with_api_path(site_url, PLAYBOOKS_API_PATH, token, timeout)
    }

    pub fn with_api_path(
        site_url: &str,
        api_path: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> WatcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WatcherError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: format!("{}{}", site_url.trim_end_matches('/'), api_path),
            token: token.into(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn runs_url(&self) -> String {
        format!("{}{}", self.api_url, RUNS_PATH)
    }

    pub async fn list_runs(&self) -> WatcherResult<PlaybookRunList> {
        let url = self.runs_url();
        debug!(url = %url, "Fetching playbook runs");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| {
                let err = WatcherError::from(e);
                error!(error_code = err.error_code(), "{}", err);
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = WatcherError::ApiStatus {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            };
            error!(error_code = err.error_code(), "{}", err);
            return Err(err);
        }

        let bytes = response.bytes().await.map_err(|e| {
            let err = WatcherError::from(e);
            error!(error_code = err.error_code(), "{}", err);
            err
        })?;

        let runs: PlaybookRunList = serde_json::from_slice(&bytes).map_err(|e| {
            let err = WatcherError::ApiParseError(e.to_string());
            error!(error_code = err.error_code(), "{}", err);
            err
        })?;

        debug!(count = runs.len(), total = runs.total_count, "Fetched playbook runs");
        Ok(runs)
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}
