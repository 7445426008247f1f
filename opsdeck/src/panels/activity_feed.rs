//! Activity feed panel: recent activities, headline counters, category filter

use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use opsdeck_common::{
    ActivityCounts, ActivityRecord, ActivityStats, DashboardConfig, DisplayActivity,
    FilterBucket, HourlyActivity, SessionContext, derive_activity_counts, filter_by_bucket,
    to_display,
};
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::watch;

use crate::api_client::DashboardApiClient;
use crate::error::ApiError;
use crate::live_view::{LiveViewModel, PanelSource, PanelState};

/// One refresh worth of feed data
#[derive(Debug, Clone, Default)]
pub struct ActivityFeedSnapshot {
    pub records: Vec<ActivityRecord>,
    /// Display rows, mapped once per fetch
    pub items: Vec<DisplayActivity>,
    pub stats: ActivityStats,
}

impl ActivityFeedSnapshot {
    pub fn new(records: Vec<ActivityRecord>, stats: ActivityStats) -> Self {
        let items = records.iter().map(to_display).collect();
        Self {
            records,
            items,
            stats,
        }
    }
}

/// Loads the feed and its stats concurrently
pub struct ActivityFeedSource {
    client: DashboardApiClient,
    limit: u32,
}

impl ActivityFeedSource {
    pub fn new(client: DashboardApiClient, limit: u32) -> Self {
        Self { client, limit }
    }
}

impl PanelSource for ActivityFeedSource {
    type Snapshot = ActivityFeedSnapshot;

    fn name(&self) -> &'static str {
        "activity-feed"
    }

    fn load(
        &self,
        subject: Option<u64>,
    ) -> impl Future<Output = Result<ActivityFeedSnapshot, ApiError>> + Send {
        let client = self.client.clone();
        let limit = self.limit;
        async move {
            let (feed, stats) = try_join(
                client.fetch_activity_feed(subject, limit),
                client.fetch_activity_stats(subject),
            )
            .await?;
            log::debug!("activity-feed: loaded {} activities", feed.activities.len());
            Ok(ActivityFeedSnapshot::new(feed.activities, stats))
        }
    }
}

/// What the renderer draws for the activity feed
#[derive(Debug, Clone)]
pub struct ActivityFeedView {
    pub bucket: FilterBucket,
    pub items: Vec<DisplayActivity>,
    pub counts: ActivityCounts,
    pub hourly: Vec<HourlyActivity>,
    pub busiest_hour: Option<u32>,
    pub is_loading: bool,
    pub is_live: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ActivityFeedView {
    /// Project the panel state through the selected filter
    pub fn from_state(state: &PanelState<ActivityFeedSnapshot>, bucket: FilterBucket) -> Self {
        let snapshot = state.data.as_deref();
        let (items, counts, hourly, busiest_hour) = match snapshot {
            Some(snapshot) => (
                filter_by_bucket(&snapshot.items, bucket),
                derive_activity_counts(&snapshot.records, Some(&snapshot.stats)),
                snapshot.stats.hourly_activity.clone(),
                snapshot.stats.busiest_hour().map(|h| h.hour),
            ),
            None => (Vec::new(), ActivityCounts::default(), Vec::new(), None),
        };

        Self {
            bucket,
            items,
            counts,
            hourly,
            busiest_hour,
            is_loading: state.is_loading,
            is_live: state.is_live,
            error: state.last_error.clone(),
            last_updated: state.last_updated,
        }
    }

    /// Nothing loaded yet and nothing in flight
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && !self.is_loading
    }
}

/// Activity feed panel
pub struct ActivityFeedPanel {
    model: LiveViewModel<ActivityFeedSource>,
    bucket: Mutex<FilterBucket>,
}

impl ActivityFeedPanel {
    pub fn new(client: DashboardApiClient, config: &DashboardConfig) -> Self {
        let source = ActivityFeedSource::new(client, config.feed_limit);
        Self {
            model: LiveViewModel::new(source, config.refresh_interval(), config.retry.clone()),
            bucket: Mutex::new(FilterBucket::All),
        }
    }

    pub async fn attach(&self, session: &SessionContext) {
        self.model.attach(session).await;
    }

    pub fn detach(&self) {
        self.model.detach();
    }

    pub async fn refresh(&self) {
        self.model.refresh().await;
    }

    pub fn set_live(&self, live: bool) {
        self.model.set_live(live);
    }

    pub fn filter_bucket(&self) -> FilterBucket {
        *self.bucket.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_filter_bucket(&self, bucket: FilterBucket) {
        *self.bucket.lock().unwrap_or_else(|e| e.into_inner()) = bucket;
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelState<ActivityFeedSnapshot>> {
        self.model.subscribe()
    }

    pub fn view(&self) -> ActivityFeedView {
        ActivityFeedView::from_state(&self.model.state(), self.filter_bucket())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn state_with(records: Value, stats: Value) -> PanelState<ActivityFeedSnapshot> {
        let records: Vec<ActivityRecord> = serde_json::from_value(records).unwrap();
        let stats: ActivityStats = serde_json::from_value(stats).unwrap();
        PanelState {
            data: Some(Arc::new(ActivityFeedSnapshot::new(records, stats))),
            ..PanelState::default()
        }
    }

    #[test]
    fn test_issue_filter_scenario() {
        let state = state_with(
            json!([
                {"id": 1, "type": "media_upload", "description": "uploaded file"},
                {"id": 2, "type": "issue_created", "description": "reported issue",
                 "metadata": {"issue_id": "ISS-7"}}
            ]),
            json!({}),
        );

        let view = ActivityFeedView::from_state(&state, FilterBucket::Issue);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].id, 2);
        assert_eq!(view.items[0].target.as_deref(), Some("ISS-7"));
        assert_eq!(view.items[0].message, "reported issue");
        assert_eq!(view.counts.today, 2);
        assert_eq!(view.counts.issues, 1);
        assert_eq!(view.counts.media, 0);
    }

    #[test]
    fn test_view_uses_server_counts_and_hourly() {
        let state = state_with(
            json!([{"id": 1, "type": "media_copy_started"}]),
            json!({
                "today": {"copies_started": 3, "copies_completed": 2, "issues_created": 4},
                "hourly_activity": [{"hour": 8, "count": 1}, {"hour": 9, "count": 6}]
            }),
        );

        let view = ActivityFeedView::from_state(&state, FilterBucket::All);
        assert_eq!(view.counts.media, 5);
        assert_eq!(view.counts.issues, 4);
        assert_eq!(view.hourly.len(), 2);
        assert_eq!(view.busiest_hour, Some(9));
    }

    #[test]
    fn test_view_before_first_load() {
        let state = PanelState {
            is_loading: true,
            ..PanelState::default()
        };
        let view = ActivityFeedView::from_state(&state, FilterBucket::Media);
        assert!(view.items.is_empty());
        assert!(view.is_loading);
        assert!(!view.is_empty());
        assert_eq!(view.counts, ActivityCounts::default());
    }

    #[test]
    fn test_view_carries_error_and_keeps_items() {
        let mut state = state_with(json!([{"id": 1, "type": "user_login"}]), json!({}));
        state.last_error = Some("Server error (502): bad gateway".to_string());

        let view = ActivityFeedView::from_state(&state, FilterBucket::All);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].actor, "System");
        assert!(view.error.is_some());
    }

    #[test]
    fn test_panel_filter_bucket() {
        let client = DashboardApiClient::new(&DashboardConfig::default()).unwrap();
        let panel = ActivityFeedPanel::new(client, &DashboardConfig::default());

        assert_eq!(panel.filter_bucket(), FilterBucket::All);
        panel.set_filter_bucket(FilterBucket::Backup);
        assert_eq!(panel.filter_bucket(), FilterBucket::Backup);
        assert_eq!(panel.view().bucket, FilterBucket::Backup);
        assert!(!panel.view().is_live);
    }
}
