//! Backup coverage summary, disk inventory and pending backup queue
//!
//! These mirror what the backup service reports; counts are lenient about
//! numeric encodings and disk status is an open set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::de;

/// Status of a backup disk
///
/// The server is free to send statuses the dashboard doesn't know; those are
/// kept verbatim and rendered with the neutral treatment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DiskStatus {
    /// Disk is mounted and accepting backups
    Active,
    /// Disk has no space left for new backups
    Full,
    /// Any other status string
    Other(String),
}

/// Visual/semantic treatment of a disk status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskTone {
    Good,
    Warning,
    Neutral,
}

impl DiskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Full => "full",
            Self::Other(status) => status,
        }
    }

    /// Display label; an empty status shows as "unknown"
    pub fn label(&self) -> &str {
        match self.as_str() {
            "" => "unknown",
            status => status,
        }
    }

    pub fn tone(&self) -> DiskTone {
        match self {
            Self::Active => DiskTone::Good,
            Self::Full => DiskTone::Warning,
            Self::Other(_) => DiskTone::Neutral,
        }
    }
}

impl Default for DiskStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for DiskStatus {
    fn from(status: String) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "full" => Self::Full,
            _ => Self::Other(status),
        }
    }
}

impl From<&str> for DiskStatus {
    fn from(status: &str) -> Self {
        Self::from(status.to_string())
    }
}

impl From<DiskStatus> for String {
    fn from(status: DiskStatus) -> Self {
        match status {
            DiskStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status from any scalar; missing or non-scalar values are unknown
fn disk_status<'de, D>(deserializer: D) -> Result<DiskStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(de::label(deserializer)?.map(DiskStatus::from).unwrap_or_default())
}

/// A backup disk and how much of the media it holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskRecord {
    #[serde(default, deserialize_with = "de::count")]
    pub id: u64,

    #[serde(default, deserialize_with = "de::text")]
    pub name: String,

    /// What the disk is used for (primary, secondary, offsite, ...)
    #[serde(default, deserialize_with = "de::label")]
    pub purpose: Option<String>,

    #[serde(default, deserialize_with = "disk_status")]
    pub status: DiskStatus,

    #[serde(default, deserialize_with = "de::count")]
    pub backup_count: u64,

    #[serde(default, deserialize_with = "de::count")]
    pub verified_count: u64,

    /// Used space as a percentage (0-100)
    #[serde(default, deserialize_with = "de::optional_number")]
    pub usage_percentage: Option<f64>,
}

/// Aggregate backup coverage for all media
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    #[serde(default, deserialize_with = "de::count")]
    pub total_media: u64,

    #[serde(default, deserialize_with = "de::count")]
    pub backed_up: u64,

    #[serde(default, deserialize_with = "de::count")]
    pub verified: u64,

    #[serde(default, deserialize_with = "de::count")]
    pub pending: u64,

    /// Server-computed coverage (0-100); derived client-side when absent
    #[serde(default, deserialize_with = "de::optional_number")]
    pub coverage_percentage: Option<f64>,

    #[serde(default, deserialize_with = "de::skip_invalid")]
    pub disks: Vec<DiskRecord>,
}

/// Reference to a related entity (editor, event)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default, deserialize_with = "de::optional_count")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "de::label")]
    pub name: Option<String>,
}

impl EntityRef {
    /// Name if known, otherwise `#id`
    pub fn display_name(&self) -> Option<String> {
        self.name
            .clone()
            .or_else(|| self.id.map(|id| format!("#{id}")))
    }
}

/// A media file waiting to be backed up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingBackupItem {
    #[serde(default, deserialize_with = "de::count")]
    pub id: u64,

    #[serde(default, deserialize_with = "de::text")]
    pub filename: String,

    #[serde(default, deserialize_with = "de::label")]
    pub media_id: Option<String>,

    #[serde(default, deserialize_with = "de::object")]
    pub editor: Option<EntityRef>,

    #[serde(default, deserialize_with = "de::object")]
    pub event: Option<EntityRef>,

    #[serde(default, deserialize_with = "de::byte_count")]
    pub size_bytes: u64,

    #[serde(default, deserialize_with = "de::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of the pending backup list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingBackupPage {
    #[serde(default, deserialize_with = "de::skip_invalid")]
    pub data: Vec<PendingBackupItem>,

    /// Total number of pending items across all pages, when reported
    #[serde(default, deserialize_with = "de::optional_count")]
    pub total: Option<u64>,
}

impl PendingBackupPage {
    /// Total pending items, falling back to the size of this page
    pub fn total_items(&self) -> u64 {
        self.total.unwrap_or(self.data.len() as u64)
    }

    /// Combined size of the items on this page
    pub fn page_bytes(&self) -> u64 {
        self.data
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.size_bytes))
    }
}
