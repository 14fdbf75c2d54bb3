//! Plain-text rendering of a view snapshot

use crate::classifier::Tone;
use crate::view::ViewSnapshot;
use chrono::{DateTime, Local};
use std::fmt::Write;

const TIME_FORMAT: &str = "%H:%M:%S";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn marker(tone: Tone) -> char {
    match tone {
        Tone::Positive => '+',
        Tone::Danger => '!',
        Tone::Caution => '~',
        Tone::Informational => 'i',
        Tone::Neutral => '-',
    }
}

/// Format epoch seconds in local time, or `-` when out of range
pub fn format_epoch(seconds: f64, format: &str) -> String {
    if !seconds.is_finite() {
        return "-".to_string();
    }

    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;

    DateTime::from_timestamp(whole as i64, nanos)
        .map(|utc| utc.with_timezone(&Local).format(format).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Render the whole dashboard as text
pub fn render(snapshot: &ViewSnapshot) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "== Operations Dashboard [{}] ==", snapshot.connection);

    let _ = writeln!(out, "\nServices Status");
    if snapshot.services.is_empty() {
        let _ = writeln!(out, "  (no services reported)");
    }
    for service in &snapshot.services {
        let _ = writeln!(
            out,
            "  {} {:<20} {:<10} uptime {:>6.2}%  last check {}",
            marker(service.status.tone()),
            service.name,
            service.status.to_string(),
            service.uptime,
            format_epoch(service.last_check, TIME_FORMAT)
        );
    }

    let _ = writeln!(out, "\nActive Alerts");
    if snapshot.alerts.is_empty() {
        let _ = writeln!(out, "  No active alerts");
    }
    for alert in &snapshot.alerts {
        let _ = writeln!(
            out,
            "  {} [{}] {}: {} ({})",
            marker(alert.severity.tone()),
            alert.severity,
            alert.service,
            alert.message,
            format_epoch(alert.timestamp, DATE_TIME_FORMAT)
        );
    }

    let _ = writeln!(out, "\nReal-time Incidents");
    if snapshot.incidents.is_empty() {
        let _ = writeln!(out, "  Waiting for incidents...");
    }
    for incident in &snapshot.incidents {
        let _ = writeln!(
            out,
            "  {} [{}] {}: {} ({})",
            marker(incident.severity.tone()),
            incident.severity,
            incident.service,
            incident.message,
            format_epoch(incident.timestamp, TIME_FORMAT)
        );
    }

    out
}
