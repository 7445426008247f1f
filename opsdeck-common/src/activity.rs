//! Activity feed records and aggregate statistics
//!
//! Records arrive from the activity-feed service with a required type tag and
//! a loose collection of optional fields. Nothing here fails on a missing or
//! oddly typed optional field; the tag is the only hard requirement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::de;

/// Kind of activity, keyed by the feed's `type` tag
///
/// Unknown tags are preserved verbatim in [`ActivityKind::Other`] so that
/// filtering and display still work for kinds added server-side later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    MediaUpload,
    MediaCopyStarted,
    MediaCopyCompleted,
    MediaDeleted,
    IssueCreated,
    IssueResolved,
    BackupCreated,
    BackupVerified,
    BackupFailed,
    UserLogin,
    UserCreated,
    EventCreated,
    EventActivated,
    /// Any tag not listed above
    Other(String),
}

impl ActivityKind {
    /// The raw tag as sent by the server
    pub fn as_str(&self) -> &str {
        match self {
            Self::MediaUpload => "media_upload",
            Self::MediaCopyStarted => "media_copy_started",
            Self::MediaCopyCompleted => "media_copy_completed",
            Self::MediaDeleted => "media_deleted",
            Self::IssueCreated => "issue_created",
            Self::IssueResolved => "issue_resolved",
            Self::BackupCreated => "backup_created",
            Self::BackupVerified => "backup_verified",
            Self::BackupFailed => "backup_failed",
            Self::UserLogin => "user_login",
            Self::UserCreated => "user_created",
            Self::EventCreated => "event_created",
            Self::EventActivated => "event_activated",
            Self::Other(tag) => tag,
        }
    }

    /// Short human-readable label
    ///
    /// Unknown kinds get their tag with underscores turned into spaces and
    /// the first letter capitalized (`"disk_swapped"` -> `"Disk swapped"`).
    pub fn label(&self) -> String {
        let fixed = match self {
            Self::MediaUpload => "Media uploaded",
            Self::MediaCopyStarted => "Copy started",
            Self::MediaCopyCompleted => "Copy completed",
            Self::MediaDeleted => "Media deleted",
            Self::IssueCreated => "Issue reported",
            Self::IssueResolved => "Issue resolved",
            Self::BackupCreated => "Backup created",
            Self::BackupVerified => "Backup verified",
            Self::BackupFailed => "Backup failed",
            Self::UserLogin => "User signed in",
            Self::UserCreated => "User created",
            Self::EventCreated => "Event created",
            Self::EventActivated => "Event activated",
            Self::Other(tag) => return humanize_tag(tag),
        };
        fixed.to_string()
    }

    /// Whether this kind is one the dashboard knows about
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

fn humanize_tag(tag: &str) -> String {
    let spaced = tag.replace(['_', '-'], " ");
    let trimmed = spaced.trim();
    if trimmed.is_empty() {
        return "Activity".to_string();
    }

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Activity".to_string(),
    }
}

impl From<String> for ActivityKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "media_upload" => Self::MediaUpload,
            "media_copy_started" => Self::MediaCopyStarted,
            "media_copy_completed" => Self::MediaCopyCompleted,
            "media_deleted" => Self::MediaDeleted,
            "issue_created" => Self::IssueCreated,
            "issue_resolved" => Self::IssueResolved,
            "backup_created" => Self::BackupCreated,
            "backup_verified" => Self::BackupVerified,
            "backup_failed" => Self::BackupFailed,
            "user_login" => Self::UserLogin,
            "user_created" => Self::UserCreated,
            "event_created" => Self::EventCreated,
            "event_activated" => Self::EventActivated,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for ActivityKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User who performed an activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityActor {
    #[serde(default, deserialize_with = "de::optional_count")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "de::label")]
    pub name: Option<String>,
}

/// Group (crew/team) an activity belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityGroup {
    #[serde(default, deserialize_with = "de::label")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "de::label")]
    pub name: Option<String>,
}

/// A single entry of the activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(default, deserialize_with = "de::count")]
    pub id: u64,

    /// Type tag; the only field the server must always send
    #[serde(rename = "type")]
    pub kind: ActivityKind,

    #[serde(default, deserialize_with = "de::object")]
    pub user: Option<ActivityActor>,

    #[serde(default, deserialize_with = "de::object")]
    pub group: Option<ActivityGroup>,

    #[serde(default, deserialize_with = "de::label")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "de::label")]
    pub title: Option<String>,

    /// Free-form key/value bag; non-object payloads are treated as absent
    #[serde(default, deserialize_with = "metadata_object")]
    pub metadata: Option<Map<String, Value>>,

    #[serde(default, deserialize_with = "de::timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    /// Relative time already formatted by the server ("5 minutes ago")
    #[serde(default, deserialize_with = "de::label")]
    pub time_ago: Option<String>,
}

impl ActivityRecord {
    /// Create a bare record with only the required fields
    pub fn new(id: u64, kind: impl Into<ActivityKind>) -> Self {
        Self {
            id,
            kind: kind.into(),
            user: None,
            group: None,
            description: None,
            title: None,
            metadata: None,
            created_at: None,
            time_ago: None,
        }
    }

    /// Look up a metadata field, treating JSON `null` as absent
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get(key))
            .filter(|value| !value.is_null())
    }
}

fn metadata_object<'de, D>(deserializer: D) -> Result<Option<Map<String, Value>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    })
}

/// Response body of the activity feed endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityFeed {
    /// Records that fail to decode are dropped individually
    #[serde(default, deserialize_with = "de::skip_invalid")]
    pub activities: Vec<ActivityRecord>,
}

/// Counters for the current day as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodayStats {
    #[serde(default, deserialize_with = "de::optional_count")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "de::optional_count")]
    pub copies_started: Option<u64>,
    #[serde(default, deserialize_with = "de::optional_count")]
    pub copies_completed: Option<u64>,
    #[serde(default, deserialize_with = "de::optional_count")]
    pub issues_created: Option<u64>,
    #[serde(default, deserialize_with = "de::optional_count")]
    pub backups_completed: Option<u64>,
}

/// Number of activities recorded in one hour of the day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyActivity {
    #[serde(default, deserialize_with = "de::hour")]
    pub hour: u32,
    #[serde(default, deserialize_with = "de::count")]
    pub count: u64,
}

/// Response body of the activity stats endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    #[serde(default, deserialize_with = "de::object")]
    pub today: Option<TodayStats>,
    #[serde(default, deserialize_with = "de::skip_invalid")]
    pub hourly_activity: Vec<HourlyActivity>,
}

impl ActivityStats {
    /// Hour with the most activity, if any activity was recorded
    pub fn busiest_hour(&self) -> Option<&HourlyActivity> {
        self.hourly_activity
            .iter()
            .filter(|h| h.count > 0)
            .max_by_key(|h| h.count)
    }
}
