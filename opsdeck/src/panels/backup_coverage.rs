//! Backup coverage panel: coverage counts, disk inventory, pending queue

use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use opsdeck_common::{
    CoverageSummary, DashboardConfig, DiskRecord, DiskTone, EntityRef, PendingBackupItem,
    PendingBackupPage, SessionContext, coverage_percentage, format_bytes,
    format_local_timestamp,
};
use std::future::Future;
use tokio::sync::watch;

use crate::api_client::DashboardApiClient;
use crate::error::ApiError;
use crate::live_view::{LiveViewModel, PanelSource, PanelState};

#[derive(Debug, Clone, Default)]
pub struct BackupSnapshot {
    pub coverage: CoverageSummary,
    pub pending: PendingBackupPage,
}

/// Loads coverage and the pending queue concurrently
pub struct BackupCoverageSource {
    client: DashboardApiClient,
    per_page: u32,
}

impl BackupCoverageSource {
    pub fn new(client: DashboardApiClient, per_page: u32) -> Self {
        Self { client, per_page }
    }
}

impl PanelSource for BackupCoverageSource {
    type Snapshot = BackupSnapshot;

    fn name(&self) -> &'static str {
        "backup-coverage"
    }

    // Coverage is global; the active event does not scope it
    fn load(
        &self,
        _subject: Option<u64>,
    ) -> impl Future<Output = Result<BackupSnapshot, ApiError>> + Send {
        let client = self.client.clone();
        let per_page = self.per_page;
        async move {
            let (coverage, pending) = try_join(
                client.fetch_backup_coverage(),
                client.fetch_pending_backups(per_page),
            )
            .await?;
            Ok(BackupSnapshot { coverage, pending })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskRow {
    pub name: String,
    pub purpose: String,
    pub status: String,
    pub tone: DiskTone,
    pub backup_count: u64,
    pub verified_count: u64,
    pub usage_percentage: Option<f64>,
}

impl From<&DiskRecord> for DiskRow {
    fn from(disk: &DiskRecord) -> Self {
        Self {
            name: if disk.name.is_empty() {
                format!("Disk #{}", disk.id)
            } else {
                disk.name.clone()
            },
            purpose: disk.purpose.clone().unwrap_or_default(),
            status: disk.status.label().to_string(),
            tone: disk.status.tone(),
            backup_count: disk.backup_count,
            verified_count: disk.verified_count,
            usage_percentage: disk
                .usage_percentage
                .filter(|pct| pct.is_finite())
                .map(|pct| pct.clamp(0.0, 100.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    pub filename: String,
    pub media_id: String,
    pub editor: Option<String>,
    pub event: Option<String>,
    pub size: String,
    pub queued_at: String,
}

impl From<&PendingBackupItem> for PendingRow {
    fn from(item: &PendingBackupItem) -> Self {
        Self {
            filename: item.filename.clone(),
            media_id: item.media_id.clone().unwrap_or_else(|| "-".to_string()),
            editor: item.editor.as_ref().and_then(EntityRef::display_name),
            event: item.event.as_ref().and_then(EntityRef::display_name),
            size: format_bytes(item.size_bytes),
            queued_at: item
                .created_at
                .as_ref()
                .map(format_local_timestamp)
                .unwrap_or_default(),
        }
    }
}

/// What the renderer draws for the backup panel
#[derive(Debug, Clone)]
pub struct BackupCoverageView {
    pub total_media: u64,
    pub backed_up: u64,
    pub verified: u64,
    pub pending: u64,
    pub coverage_percent: f64,
    pub disks: Vec<DiskRow>,
    pub pending_items: Vec<PendingRow>,
    pub pending_total: u64,
    pub pending_bytes: String,
    pub has_data: bool,
    pub is_loading: bool,
    pub is_live: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl BackupCoverageView {
    pub fn from_state(state: &PanelState<BackupSnapshot>) -> Self {
        let default_snapshot = BackupSnapshot::default();
        let snapshot = state.data.as_deref().unwrap_or(&default_snapshot);
        let coverage = &snapshot.coverage;

        Self {
            total_media: coverage.total_media,
            backed_up: coverage.backed_up,
            verified: coverage.verified,
            pending: coverage.pending,
            coverage_percent: coverage_percentage(coverage),
            disks: coverage.disks.iter().map(DiskRow::from).collect(),
            pending_items: snapshot.pending.data.iter().map(PendingRow::from).collect(),
            pending_total: snapshot.pending.total_items(),
            pending_bytes: format_bytes(snapshot.pending.page_bytes()),
            has_data: state.data.is_some(),
            is_loading: state.is_loading,
            is_live: state.is_live,
            error: state.last_error.clone(),
            last_updated: state.last_updated,
        }
    }
}

/// Backup coverage panel
pub struct BackupCoveragePanel {
    model: LiveViewModel<BackupCoverageSource>,
}

impl BackupCoveragePanel {
    pub fn new(client: DashboardApiClient, config: &DashboardConfig) -> Self {
        let source = BackupCoverageSource::new(client, config.pending_per_page);
        Self {
            model: LiveViewModel::new(source, config.refresh_interval(), config.retry.clone()),
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

    pub fn subscribe(&self) -> watch::Receiver<PanelState<BackupSnapshot>> {
        self.model.subscribe()
    }

    pub fn view(&self) -> BackupCoverageView {
        BackupCoverageView::from_state(&self.model.state())
    }
}
