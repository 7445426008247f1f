//! Client-side filters and derived counts over the loaded record set

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::activity::{ActivityKind, ActivityRecord, ActivityStats};
use crate::backup::CoverageSummary;
use crate::display::DisplayActivity;

/// Category filter for the activity feed
///
/// A record falls in a bucket when its type tag *contains* the bucket's
/// keyword, so `"media_copy_started"` is in `Media` and a hypothetical
/// `"user_issue_escalated"` is in both `User` and `Issue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterBucket {
    #[default]
    All,
    Media,
    Issue,
    Backup,
    User,
}

impl FilterBucket {
    pub const ALL: [FilterBucket; 5] = [
        FilterBucket::All,
        FilterBucket::Media,
        FilterBucket::Issue,
        FilterBucket::Backup,
        FilterBucket::User,
    ];

    /// Substring matched against the type tag; `None` matches everything
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Media => Some("media"),
            Self::Issue => Some("issue"),
            Self::Backup => Some("backup"),
            Self::User => Some("user"),
        }
    }

    pub fn matches(&self, kind: &ActivityKind) -> bool {
        match self.keyword() {
            None => true,
            Some(keyword) => kind.as_str().contains(keyword),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.keyword().unwrap_or("all")
    }
}

impl fmt::Display for FilterBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FilterBucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == wanted)
            .ok_or_else(|| {
                format!("Unknown filter '{s}' (expected all, media, issue, backup or user)")
            })
    }
}

/// Anything carrying an activity kind
pub trait Tagged {
    fn kind(&self) -> &ActivityKind;
}

impl Tagged for ActivityRecord {
    fn kind(&self) -> &ActivityKind {
        &self.kind
    }
}

impl Tagged for DisplayActivity {
    fn kind(&self) -> &ActivityKind {
        &self.kind
    }
}

/// Keep the items that fall in `bucket`, preserving order
pub fn filter_by_bucket<T: Tagged + Clone>(items: &[T], bucket: FilterBucket) -> Vec<T> {
    items
        .iter()
        .filter(|item| bucket.matches(item.kind()))
        .cloned()
        .collect()
}

/// Headline counters shown above the activity feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActivityCounts {
    /// Number of loaded records; not restricted to the calendar day
    pub today: u64,
    pub media: u64,
    pub issues: u64,
}

/// Compute the headline counters, preferring server figures when present
pub fn derive_activity_counts(
    records: &[ActivityRecord],
    stats: Option<&ActivityStats>,
) -> ActivityCounts {
    let today_stats = stats.and_then(|s| s.today.as_ref());

    let media = today_stats
        .map(|t| {
            t.copies_started
                .unwrap_or(0)
                .saturating_add(t.copies_completed.unwrap_or(0))
        })
        .unwrap_or(0);

    let issues = today_stats
        .and_then(|t| t.issues_created)
        .unwrap_or_else(|| {
            records
                .iter()
                .filter(|r| FilterBucket::Issue.matches(&r.kind))
                .count() as u64
        });

    ActivityCounts {
        today: records.len() as u64,
        media,
        issues,
    }
}

/// Coverage percentage in 0-100
///
/// Uses the server figure when present, otherwise `verified / total_media`.
pub fn coverage_percentage(summary: &CoverageSummary) -> f64 {
    let raw = match summary.coverage_percentage {
        Some(pct) if pct.is_finite() => pct,
        _ if summary.total_media == 0 => 0.0,
        _ => summary.verified as f64 / summary.total_media as f64 * 100.0,
    };
    raw.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::TodayStats;
    use crate::display::to_display;
    use serde_json::json;

    fn feed() -> Vec<ActivityRecord> {
        serde_json::from_value(json!([
            {"id": 1, "type": "media_upload", "description": "uploaded file"},
            {"id": 2, "type": "issue_created", "description": "reported issue",
             "metadata": {"issue_id": "ISS-7"}},
            {"id": 3, "type": "backup_verified"},
            {"id": 4, "type": "user_login", "user": {"name": "Sam"}},
            {"id": 5, "type": "media_copy_completed"},
            {"id": 6, "type": "user_issue_escalated"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_issue_bucket_scenario() {
        let records: Vec<ActivityRecord> = feed().into_iter().take(2).collect();
        let issues = filter_by_bucket(&records, FilterBucket::Issue);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, 2);
        assert_eq!(to_display(&issues[0]).target.as_deref(), Some("ISS-7"));
    }

    #[test]
    fn test_substring_matching_is_loose() {
        let records = feed();
        let ids = |bucket| {
            filter_by_bucket(&records, bucket)
                .iter()
                .map(|r| r.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(FilterBucket::All), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(ids(FilterBucket::Media), vec![1, 5]);
        assert_eq!(ids(FilterBucket::Issue), vec![2, 6]);
        assert_eq!(ids(FilterBucket::Backup), vec![3]);
        assert_eq!(ids(FilterBucket::User), vec![4, 6]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = feed();
        for bucket in FilterBucket::ALL {
            let once = filter_by_bucket(&records, bucket);
            let twice = filter_by_bucket(&once, bucket);
            assert_eq!(once, twice, "bucket {bucket}");
        }
    }

    #[test]
    fn test_filter_display_rows() {
        let rows: Vec<DisplayActivity> = feed().iter().map(to_display).collect();
        let backups = filter_by_bucket(&rows, FilterBucket::Backup);
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].id, 3);
        assert_eq!(backups[0].actor, "System");
    }

    #[test]
    fn test_bucket_parsing() {
        assert_eq!("issue".parse::<FilterBucket>(), Ok(FilterBucket::Issue));
        assert_eq!(" Media ".parse::<FilterBucket>(), Ok(FilterBucket::Media));
        assert_eq!("all".parse::<FilterBucket>(), Ok(FilterBucket::All));
        assert!("camera".parse::<FilterBucket>().is_err());
    }

    #[test]
    fn test_counts_without_stats() {
        let counts = derive_activity_counts(&feed(), None);
        assert_eq!(
            counts,
            ActivityCounts {
                today: 6,
                media: 0,
                issues: 2,
            }
        );
    }

    #[test]
    fn test_counts_prefer_server_figures() {
        let stats = ActivityStats {
            today: Some(TodayStats {
                copies_started: Some(5),
                copies_completed: Some(4),
                issues_created: Some(11),
                ..Default::default()
            }),
            hourly_activity: Vec::new(),
        };

        let counts = derive_activity_counts(&feed(), Some(&stats));
        assert_eq!(counts.today, 6);
        assert_eq!(counts.media, 9);
        assert_eq!(counts.issues, 11);
    }

    #[test]
    fn test_counts_partial_server_figures() {
        let stats = ActivityStats {
            today: Some(TodayStats {
                copies_completed: Some(2),
                ..Default::default()
            }),
            hourly_activity: Vec::new(),
        };

        let counts = derive_activity_counts(&feed(), Some(&stats));
        assert_eq!(counts.media, 2);
        assert_eq!(counts.issues, 2);
    }

    #[test]
    fn test_coverage_percentage() {
        let mut summary = CoverageSummary {
            total_media: 100,
            backed_up: 80,
            verified: 60,
            pending: 20,
            coverage_percentage: Some(80.0),
            disks: Vec::new(),
        };
        assert_eq!(coverage_percentage(&summary), 80.0);

        summary.coverage_percentage = None;
        assert_eq!(coverage_percentage(&summary), 60.0);

        summary.coverage_percentage = Some(140.0);
        assert_eq!(coverage_percentage(&summary), 100.0);

        let empty = CoverageSummary::default();
        assert_eq!(coverage_percentage(&empty), 0.0);
    }
}
