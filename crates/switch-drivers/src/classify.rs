//! Device reply classification

use l2net_core::DeviceOutcome;
use l2net_shared_types::DeviceOperationKind;

/// What a device reply means for an idempotent command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Outcome(DeviceOutcome),
    Rejected(String),
    Unreachable(String),
}

const ALREADY_PRESENT: &[&str] = &["already exists", "already configured"];
const ALREADY_ABSENT: &[&str] = &["not found", "does not exist", "not configured"];
const ABSENT_SUBJECTS: &[&str] = &["vlan", "trunk"];

/// Classify a free-form CLI reply
pub fn classify_reply(kind: DeviceOperationKind, reply: &str) -> Classified {
    let lowered = reply.to_lowercase();

    if ALREADY_PRESENT.iter().any(|p| lowered.contains(p)) {
        return Classified::Outcome(DeviceOutcome::AlreadyInState);
    }
    if kind.is_removal() && lowered.lines().any(reports_absent_vlan) {
        return Classified::Outcome(DeviceOutcome::AlreadyInState);
    }

    let error_line = reply.lines().map(str::trim).find(|line| {
        line.starts_with('%') || line.to_lowercase().starts_with("error")
    });
    match error_line {
        Some(line) => Classified::Rejected(line.to_string()),
        None => Classified::Outcome(DeviceOutcome::Applied),
    }
}

/// Only a missing VLAN or trunk membership counts; a missing interface does not
fn reports_absent_vlan(line: &str) -> bool {
    ABSENT_SUBJECTS.iter().any(|s| line.contains(s))
        && ALREADY_ABSENT.iter().any(|p| line.contains(p))
}

/// Classify the HTTP status of a session edit
pub fn classify_status(kind: DeviceOperationKind, status: u16, body: &str) -> Classified {
    match status {
        200..=299 => Classified::Outcome(DeviceOutcome::Applied),
        409 => Classified::Outcome(DeviceOutcome::AlreadyInState),
        404 if kind.is_removal() => Classified::Outcome(DeviceOutcome::AlreadyInState),
        502 | 503 | 504 => Classified::Unreachable(format!("HTTP {}: {}", status, body.trim())),
        _ => Classified::Rejected(format!("HTTP {}: {}", status, body.trim())),
    }
}
