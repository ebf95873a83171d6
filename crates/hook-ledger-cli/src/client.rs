//! HTTP client for the hook-ledger service.

use crate::CliError;
use hook_ledger_core::{EventId, RetrievalResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of an administrative clear
#[derive(Debug, Deserialize)]
struct ClearBody {
    deleted: u64,
}

/// One component entry of a health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub healthy: bool,
    pub message: String,
}

/// Health report as seen by the client.
///
/// The service answers an unhealthy probe with a bare `503`, so only the
/// status code is known in that case.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub status_code: u16,
    pub version: Option<String>,
    pub checks: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    checks: HashMap<String, ComponentHealth>,
}

/// Thin wrapper over `reqwest` for the service's retrieval and admin routes
#[derive(Debug, Clone)]
pub struct EventsClient {
    base_url: String,
    http: reqwest::Client,
}

impl EventsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CliError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CliError::InvalidArgument {
                arg: "--url".to_string(),
                message: format!("'{}' is not an http(s) URL", base_url),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("hook-ledger-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the batch after `after` in cursor mode
    pub async fn poll(
        &self,
        after: Option<EventId>,
        limit: Option<usize>,
    ) -> Result<RetrievalResponse, CliError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        // The service treats a request without a cursor as a read from the start
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_events(&query).await
    }

    /// Fetch records newer than a canonical timestamp in the legacy mode
    pub async fn list_since(
        &self,
        since: Option<&str>,
        limit: Option<usize>,
    ) -> Result<RetrievalResponse, CliError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_events(&query).await
    }

    /// Delete every stored record; returns how many were removed
    pub async fn clear(&self) -> Result<u64, CliError> {
        let url = format!("{}/admin/events", self.base_url);
        let response = self.http.delete(&url).send().await?;
        let response = check_status(response).await?;
        let body: ClearBody = response.json().await?;
        Ok(body.deleted)
    }

    /// Probe `/health`, or `/health/deep` when `deep` is set
    pub async fn health(&self, deep: bool) -> Result<HealthReport, CliError> {
        let path = if deep { "health/deep" } else { "health" };
        let url = format!("{}/{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Ok(HealthReport {
                healthy: false,
                status_code: status.as_u16(),
                version: None,
                checks: HashMap::new(),
            });
        }

        let response = check_status(response).await?;
        let body: HealthBody = response.json().await?;
        Ok(HealthReport {
            healthy: true,
            status_code: status.as_u16(),
            version: body.version,
            checks: body.checks,
        })
    }

    async fn get_events(&self, query: &[(&str, String)]) -> Result<RetrievalResponse, CliError> {
        let url = format!("{}/api/events", self.base_url);
        debug!(url = %url, query = ?query, "Requesting events");

        let response = self.http.get(&url).query(query).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-success response into [`CliError::Service`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CliError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| {
            body.get("message")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text
            }
        });

    Err(CliError::Service {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
