//! Mapping raw activity records into display-ready rows
//!
//! Everything here is total: any record that deserialized can be displayed.

use serde::Serialize;

use crate::SYSTEM_ACTOR;
use crate::activity::{ActivityKind, ActivityRecord};
use crate::de::value_label;
use crate::format::format_local_timestamp;

/// Metadata keys that name an activity's target, highest priority first
pub const TARGET_FIELDS: [&str; 5] = [
    "issue_id",
    "media_id",
    "camera_number",
    "disk_label",
    "event_code",
];

/// Display-ready projection of an [`ActivityRecord`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayActivity {
    pub id: u64,
    pub kind: ActivityKind,
    pub actor: String,
    pub target: Option<String>,
    pub message: String,
    pub time: String,
    pub group: Option<String>,
}

/// Build the display row for a record
pub fn to_display(record: &ActivityRecord) -> DisplayActivity {
    DisplayActivity {
        id: record.id,
        kind: record.kind.clone(),
        actor: actor_name(record),
        target: target_label(record),
        message: message(record),
        time: time_label(record),
        group: record.group.as_ref().and_then(|g| g.code.clone()),
    }
}

fn actor_name(record: &ActivityRecord) -> String {
    record
        .user
        .as_ref()
        .and_then(|u| u.name.clone())
        .unwrap_or_else(|| SYSTEM_ACTOR.to_string())
}

/// First non-null metadata value among [`TARGET_FIELDS`]
pub fn target_label(record: &ActivityRecord) -> Option<String> {
    TARGET_FIELDS
        .iter()
        .find_map(|key| record.metadata_value(key).and_then(value_label))
}

fn message(record: &ActivityRecord) -> String {
    record
        .description
        .clone()
        .or_else(|| record.title.clone())
        .unwrap_or_default()
}

fn time_label(record: &ActivityRecord) -> String {
    if let Some(ago) = &record.time_ago {
        return ago.clone();
    }
    record
        .created_at
        .as_ref()
        .map(format_local_timestamp)
        .unwrap_or_default()
}
