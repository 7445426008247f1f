// Shared types and utilities for OpsDeck

pub mod activity;
pub mod backup;
pub mod config;
mod de;
pub mod display;
pub mod format;
pub mod projector;
pub mod session;

pub use activity::{
    ActivityActor, ActivityFeed, ActivityGroup, ActivityKind, ActivityRecord, ActivityStats,
    HourlyActivity, TodayStats,
};
pub use backup::{
    CoverageSummary, DiskRecord, DiskStatus, DiskTone, EntityRef, PendingBackupItem,
    PendingBackupPage,
};
pub use config::{DashboardConfig, RetryConfig};
pub use display::{DisplayActivity, to_display};
pub use format::{
    clamp_byte_count, format_age, format_bytes, format_local_timestamp, format_optional_bytes,
    parse_size,
};
pub use projector::{
    ActivityCounts, FilterBucket, Tagged, coverage_percentage, derive_activity_counts,
    filter_by_bucket,
};
pub use session::{EventRef, SessionContext, SessionUser};

/// Fallback actor name for activities without a user
pub const SYSTEM_ACTOR: &str = "System";

/// Default auto-refresh period for live panels (in seconds)
pub const DEFAULT_REFRESH_SECS: u64 = 30;
