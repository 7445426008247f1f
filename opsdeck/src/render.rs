//! Plain-text rendering of panel views for the terminal

use chrono::{DateTime, Utc};
use opsdeck_common::{DiskTone, FilterBucket, SessionContext, format_age};
use std::fmt::Write;

use crate::panels::{ActivityFeedView, BackupCoverageView};

const BAR_WIDTH: usize = 20;

/// Render the activity feed panel
pub fn render_activity_view(
    view: &ActivityFeedView,
    session: &SessionContext,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    header(&mut out, "Activity Feed", session, view.is_live, view.is_loading);

    let _ = writeln!(
        out,
        "Today: {}   Media: {}   Issues: {}",
        view.counts.today, view.counts.media, view.counts.issues
    );
    let _ = writeln!(out, "Filter: {}", filter_tabs(view.bucket));

    if let Some(hour) = view.busiest_hour {
        let count = view
            .hourly
            .iter()
            .find(|h| h.hour == hour)
            .map(|h| h.count)
            .unwrap_or(0);
        let total: u64 = view.hourly.iter().map(|h| h.count).sum();
        let _ = writeln!(
            out,
            "Busiest hour: {hour:02}:00 ({count} of {total} across {} hours)",
            view.hourly.len()
        );
    }

    if let Some(error) = &view.error {
        let _ = writeln!(out, "Error: {error}");
    }

    if view.is_empty() {
        let _ = writeln!(out, "  No recent activity");
    } else if view.items.is_empty() {
        let _ = writeln!(out, "  Loading activities...");
    }

    for item in &view.items {
        let mut line = format!(
            "  {:<19}  {:<16}  {}",
            item.time,
            item.actor,
            item.kind.label()
        );
        if let Some(target) = &item.target {
            let _ = write!(line, " [{target}]");
        }
        if !item.message.is_empty() {
            let _ = write!(line, ": {}", item.message);
        }
        if let Some(group) = &item.group {
            let _ = write!(line, " ({group})");
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }

    footer(&mut out, view.last_updated, now);
    out
}

/// Render the backup coverage panel
pub fn render_backup_view(
    view: &BackupCoverageView,
    session: &SessionContext,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    header(&mut out, "Backup Coverage", session, view.is_live, view.is_loading);

    let _ = writeln!(
        out,
        "Total: {}   Backed up: {}   Verified: {}   Pending: {}",
        view.total_media, view.backed_up, view.verified, view.pending
    );
    let _ = writeln!(out, "Coverage {}", coverage_bar(view.coverage_percent));

    if let Some(error) = &view.error {
        let _ = writeln!(out, "Error: {error}");
    }

    if !view.disks.is_empty() {
        let _ = writeln!(out, "Disks:");
    }
    for disk in &view.disks {
        let mut line = format!(
            "  {} {:<16} {:<10} {}/{} verified",
            tone_marker(disk.tone),
            disk.name,
            disk.status,
            disk.verified_count,
            disk.backup_count
        );
        if let Some(usage) = disk.usage_percentage {
            let _ = write!(line, ", {usage:.0}% used");
        }
        if !disk.purpose.is_empty() {
            let _ = write!(line, " ({})", disk.purpose);
        }
        let _ = writeln!(out, "{line}");
    }

    if view.pending_total > 0 {
        let _ = writeln!(
            out,
            "Pending backups: {} (showing {}, {})",
            view.pending_total,
            view.pending_items.len(),
            view.pending_bytes
        );
    } else if view.has_data {
        let _ = writeln!(out, "Pending backups: none");
    }
    for item in &view.pending_items {
        let mut line = format!("  {:<28} {:>10}  {}", item.filename, item.size, item.media_id);
        if let Some(editor) = &item.editor {
            let _ = write!(line, "  by {editor}");
        }
        if let Some(event) = &item.event {
            let _ = write!(line, "  @ {event}");
        }
        if !item.queued_at.is_empty() {
            let _ = write!(line, "  queued {}", item.queued_at);
        }
        let _ = writeln!(out, "{line}");
    }

    footer(&mut out, view.last_updated, now);
    out
}

/// Fixed-width progress bar, e.g. `[################----]  80%`
pub fn coverage_bar(percent: f64) -> String {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

fn tone_marker(tone: DiskTone) -> &'static str {
    match tone {
        DiskTone::Good => "[ok]",
        DiskTone::Warning => "[!!]",
        DiskTone::Neutral => "[--]",
    }
}

fn filter_tabs(selected: FilterBucket) -> String {
    FilterBucket::ALL
        .iter()
        .map(|bucket| {
            if *bucket == selected {
                format!("<{bucket}>")
            } else {
                bucket.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn header(out: &mut String, title: &str, session: &SessionContext, live: bool, loading: bool) {
    let mut line = format!("== {title} ==");
    if live {
        line.push_str(" [live]");
    }
    if loading {
        line.push_str(" [loading]");
    }
    let _ = writeln!(out, "{line}");
    let _ = writeln!(out, "{}", session.describe());
}

fn footer(out: &mut String, last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) {
    match last_updated {
        Some(at) => {
            let _ = writeln!(out, "updated {} ago", format_age(now - at));
        }
        None => {
            let _ = writeln!(out, "not updated yet");
        }
    }
}
