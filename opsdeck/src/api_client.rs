//! REST client for the activity-feed and backup services
//!
//! Thin typed wrapper over [`reqwest`]: one method per endpoint, bearer
//! token applied to every request, non-2xx statuses mapped to [`ApiError`].
//!
//! # Example
//! ```no_run
//! use crate::api_client::DashboardApiClient;
//! use crate::error::ApiError;
//! use opsdeck_common::DashboardConfig;
//!
//! # async fn example() -> Result<(), ApiError> {
//! let client = DashboardApiClient::new(&DashboardConfig::default())?;
//! let coverage = client.fetch_backup_coverage().await?;
//! println!("{}% covered", coverage.coverage_percentage.unwrap_or(0.0));
//! # Ok(())
//! # }
//! ```

use opsdeck_common::{
    ActivityFeed, ActivityStats, CoverageSummary, DashboardConfig, PendingBackupPage,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const ACTIVITY_FEED_PATH: &str = "/api/activity-feed";
pub const ACTIVITY_STATS_PATH: &str = "/api/activity-feed/stats";
pub const BACKUP_COVERAGE_PATH: &str = "/api/backups/coverage";
pub const PENDING_BACKUPS_PATH: &str = "/api/backups/pending";

/// Typed client for the dashboard API
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DashboardApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl DashboardApiClient {
    /// Build a client from the dashboard configuration
    pub fn new(config: &DashboardConfig) -> Result<Self, ApiError> {
        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "API URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url,
            token: config.api_token.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the most recent activities, optionally scoped to one event
    ///
    /// Calls `GET /api/activity-feed?event_id={id}&limit={limit}`.
    pub async fn fetch_activity_feed(
        &self,
        event_id: Option<u64>,
        limit: u32,
    ) -> Result<ActivityFeed, ApiError> {
        self.get_json(ACTIVITY_FEED_PATH, &feed_query(event_id, limit)).await
    }

    /// Fetch today's counters and the hourly histogram
    ///
    /// Calls `GET /api/activity-feed/stats?event_id={id}`.
    pub async fn fetch_activity_stats(
        &self,
        event_id: Option<u64>,
    ) -> Result<ActivityStats, ApiError> {
        self.get_json(ACTIVITY_STATS_PATH, &event_query(event_id)).await
    }

    /// Fetch the backup coverage summary and disk inventory
    ///
    /// Calls `GET /api/backups/coverage`.
    pub async fn fetch_backup_coverage(&self) -> Result<CoverageSummary, ApiError> {
        self.get_json(BACKUP_COVERAGE_PATH, &[]).await
    }

    /// Fetch the first page of media awaiting backup
    ///
    /// Calls `GET /api/backups/pending?per_page={per_page}`.
    pub async fn fetch_pending_backups(
        &self,
        per_page: u32,
    ) -> Result<PendingBackupPage, ApiError> {
        self.get_json(
            PENDING_BACKUPS_PATH,
            &[("per_page", per_page.to_string())],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut request = self.http.get(self.url(path)).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        log::debug!("GET {}{} {:?}", self.base_url, path, query);
        let response = request.send().await?;
        parse_json_response(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Parse a JSON body on 2xx, or map the status to [`ApiError`].
async fn parse_json_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status.as_u16(), body))
}

fn event_query(event_id: Option<u64>) -> Vec<(&'static str, String)> {
    event_id
        .map(|id| vec![("event_id", id.to_string())])
        .unwrap_or_default()
}

fn feed_query(event_id: Option<u64>, limit: u32) -> Vec<(&'static str, String)> {
    let mut query = event_query(event_id);
    query.push(("limit", limit.to_string()));
    query
}
