//! Dashboard panels built on [`LiveViewModel`](crate::live_view::LiveViewModel)

pub mod activity_feed;
pub mod backup_coverage;

pub use activity_feed::{ActivityFeedPanel, ActivityFeedView};
pub use backup_coverage::{BackupCoveragePanel, BackupCoverageView};
