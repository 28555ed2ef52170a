//! Retraining progress, reduced from the JSON-lines log the training job writes.
//!
//! Each structured line carries a `type` tag:
//!
//! ```text
//! {"type":"start","epochs_total":5}
//! {"type":"epoch","epoch":2,"train_loss":0.31,"epoch_time_sec":4}
//! {"type":"done","status":"OK"}
//! ```
//!
//! Anything else in the log (banners, stderr dumps, half-written lines) is skipped.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

impl ProgressStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressStatus::Done | ProgressStatus::Error)
    }
}

/// Every field decodes on its own: a value of the wrong JSON type reads as
/// missing instead of rejecting the whole line.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct EpochEvent {
    #[serde(default, deserialize_with = "lenient::count")]
    pub epoch: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub epochs_total: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub train_loss: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub val_loss: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub epoch_time_sec: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Start {
        #[serde(default, deserialize_with = "lenient::count")]
        epochs_total: Option<u32>,
    },
    Epoch(EpochEvent),
    Done {
        #[serde(default, deserialize_with = "lenient::text")]
        status: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Non-negative JSON number, truncated to a whole count (`2.0` reads as 2).
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        Ok(Value::deserialize(deserializer)?
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.min(u32::MAX as f64) as u32))
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(Value::deserialize(deserializer)?.as_f64().filter(|v| v.is_finite()))
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }
}

/// How a single log line was classified.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Blank or free text.
    Noise,
    /// Looked like JSON but did not decode.
    Malformed,
    /// JSON with a `type` the parser does not track.
    Unknown,
    Event(ProgressEvent),
}

pub fn classify_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if !line.starts_with('{') {
        return LineOutcome::Noise;
    }

    match serde_json::from_str::<ProgressEvent>(line) {
        Ok(ProgressEvent::Unknown) => LineOutcome::Unknown,
        Ok(event) => LineOutcome::Event(event),
        Err(e) => {
            log::trace!("skipping malformed progress line ({}): {}", e, line);
            LineOutcome::Malformed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProgressSnapshot {
    pub status: ProgressStatus,
    pub epoch: u32,
    pub epochs_total: u32,
    pub train_loss: Option<f64>,
    pub val_loss: Option<f64>,
    pub epoch_time_sec: Option<f64>,
    pub eta_sec: Option<f64>,
}

impl ProgressSnapshot {
    /// Completed share of the run in `[0, 1]`, or `None` before the total is known.
    pub fn progress_fraction(&self) -> Option<f64> {
        if self.epochs_total == 0 {
            return None;
        }
        Some((self.epoch as f64 / self.epochs_total as f64).clamp(0.0, 1.0))
    }

    pub fn format_eta(&self) -> String {
        match self.eta_sec {
            Some(eta) => format_duration(eta),
            None => "--".to_string(),
        }
    }

    fn recompute_eta(&mut self) {
        self.eta_sec = match self.epoch_time_sec {
            Some(per_epoch) if self.epochs_total > 0 => {
                let remaining = self.epochs_total.saturating_sub(self.epoch);
                Some(remaining as f64 * per_epoch)
            }
            _ => None,
        };
    }
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    if total >= 60 {
        format!("{}m {:02}s", total / 60, total % 60)
    } else {
        format!("{}s", total)
    }
}

/// Reduces a full log window to the current progress snapshot.
///
/// Stateless: the result depends only on `raw`, so callers re-run it on every
/// poll with whatever window the backend returned.
pub fn parse(raw: &str) -> ProgressSnapshot {
    let mut snapshot = ProgressSnapshot::default();
    let mut last_epoch: Option<EpochEvent> = None;
    let mut last_done: Option<Option<String>> = None;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match classify_line(line) {
            LineOutcome::Event(ProgressEvent::Start { epochs_total }) => {
                snapshot.status = ProgressStatus::Running;
                snapshot.epochs_total = epochs_total.unwrap_or(0);
            }
            LineOutcome::Event(ProgressEvent::Epoch(event)) => last_epoch = Some(event),
            LineOutcome::Event(ProgressEvent::Done { status }) => last_done = Some(status),
            LineOutcome::Event(ProgressEvent::Unknown)
            | LineOutcome::Unknown
            | LineOutcome::Malformed
            | LineOutcome::Noise => {}
        }
    }

    if let Some(event) = last_epoch {
        snapshot.status = ProgressStatus::Running;
        snapshot.epoch = event.epoch.unwrap_or(0);
        snapshot.epochs_total = event.epochs_total.unwrap_or(snapshot.epochs_total);
        snapshot.train_loss = event.train_loss;
        snapshot.val_loss = event.val_loss;
        snapshot.epoch_time_sec = event.epoch_time_sec;
        snapshot.recompute_eta();
    }

    // completion wins over the latest epoch in the same window
    if let Some(status) = last_done {
        snapshot.status = if status.as_deref() == Some("OK") {
            ProgressStatus::Done
        } else {
            ProgressStatus::Error
        };
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = r#"{"type":"start","epochs_total":5}"#;
    const EPOCH_2: &str = r#"{"type":"epoch","epoch":2,"train_loss":0.31,"epoch_time_sec":4}"#;

    #[test]
    fn empty_window_is_default() {
        let snapshot = parse("");
        assert_eq!(snapshot, ProgressSnapshot::default());
        assert_eq!(snapshot.status, ProgressStatus::Idle);
        assert_eq!(snapshot.epoch, 0);
        assert_eq!(snapshot.epochs_total, 0);
        assert_eq!(snapshot.train_loss, None);
        assert_eq!(snapshot.eta_sec, None);
    }

    #[test]
    fn start_then_epoch() {
        let snapshot = parse(&format!("{}\n{}", START, EPOCH_2));
        assert_eq!(snapshot.status, ProgressStatus::Running);
        assert_eq!(snapshot.epoch, 2);
        assert_eq!(snapshot.epochs_total, 5);
        assert!((snapshot.train_loss.unwrap() - 0.31).abs() < 1e-9);
        assert_eq!(snapshot.epoch_time_sec, Some(4.0));
        assert_eq!(snapshot.eta_sec, Some(12.0));
    }

    #[test]
    fn eta_from_epoch_fields() {
        let snapshot =
            parse(r#"{"type":"epoch","epoch":4,"epochs_total":10,"epoch_time_sec":5}"#);
        assert_eq!(snapshot.eta_sec, Some(30.0));
    }

    #[test]
    fn eta_unknown_without_total() {
        let snapshot = parse(r#"{"type":"epoch","epoch":4,"epoch_time_sec":5}"#);
        assert_eq!(snapshot.epochs_total, 0);
        assert_eq!(snapshot.eta_sec, None);
    }

    #[test]
    fn start_alone_is_running() {
        let snapshot = parse(START);
        assert_eq!(snapshot.status, ProgressStatus::Running);
        assert_eq!(snapshot.epochs_total, 5);
        assert_eq!(snapshot.eta_sec, None);
    }

    #[test]
    fn done_overrides_latest_epoch() {
        let raw = [
            START,
            EPOCH_2,
            r#"{"type":"done","status":"OK"}"#,
            r#"{"type":"epoch","epoch":3,"epoch_time_sec":4}"#,
        ]
        .join("\n");
        let snapshot = parse(&raw);
        assert_eq!(snapshot.status, ProgressStatus::Done);
        assert_eq!(snapshot.epoch, 3);
    }

    #[test]
    fn done_without_epoch_is_terminal() {
        assert_eq!(parse(r#"{"type":"done","status":"OK"}"#).status, ProgressStatus::Done);
        assert_eq!(
            parse(r#"{"type":"done","status":"FAILED"}"#).status,
            ProgressStatus::Error
        );
        assert_eq!(parse(r#"{"type":"done"}"#).status, ProgressStatus::Error);
    }

    #[test]
    fn last_done_wins() {
        let raw = "{\"type\":\"done\",\"status\":\"ERR\"}\n{\"type\":\"done\",\"status\":\"OK\"}";
        assert_eq!(parse(raw).status, ProgressStatus::Done);
    }

    #[test]
    fn noise_is_ignored() {
        let clean = format!("{}\n{}", START, EPOCH_2);
        let noisy = [
            "[2024-01-01 10:00:00] === RETRAIN START ===",
            START,
            "{\"type\":\"epoch\",\"epoch\":",
            "   ",
            "{not json at all}",
            r#"{"type":"checkpoint","path":"/tmp/x.pt"}"#,
            EPOCH_2,
            "Traceback (most recent call last):",
        ]
        .join("\n");
        assert_eq!(parse(&noisy), parse(&clean));
    }

    #[test]
    fn parse_is_idempotent() {
        let raw = format!("{}\n{}\n{}", START, EPOCH_2, r#"{"type":"done","status":"OK"}"#);
        assert_eq!(parse(&raw), parse(&raw));
    }

    #[test]
    fn classify_lines() {
        assert_eq!(classify_line("hello"), LineOutcome::Noise);
        assert_eq!(classify_line("{oops"), LineOutcome::Malformed);
        assert_eq!(classify_line(r#"{"type":"lr","value":0.1}"#), LineOutcome::Unknown);
        assert!(matches!(
            classify_line(START),
            LineOutcome::Event(ProgressEvent::Start { epochs_total: Some(5) })
        ));
    }

    #[test]
    fn null_fields_default() {
        let snapshot = parse(r#"{"type":"epoch","epoch":null,"train_loss":null}"#);
        assert_eq!(snapshot.status, ProgressStatus::Running);
        assert_eq!(snapshot.epoch, 0);
        assert_eq!(snapshot.train_loss, None);
    }

    #[test]
    fn float_counts_are_truncated() {
        let snapshot = parse(r#"{"type":"epoch","epoch":2.0,"epochs_total":5.7,"epoch_time_sec":4}"#);
        assert_eq!(snapshot.status, ProgressStatus::Running);
        assert_eq!(snapshot.epoch, 2);
        assert_eq!(snapshot.epochs_total, 5);
        assert_eq!(snapshot.eta_sec, Some(12.0));
    }

    #[test]
    fn mistyped_field_keeps_the_event() {
        let raw = [
            START,
            r#"{"type":"epoch","epoch":3,"train_loss":0.5,"val_loss":"n/a","epoch_time_sec":2}"#,
        ]
        .join("\n");
        let snapshot = parse(&raw);
        assert_eq!(snapshot.status, ProgressStatus::Running);
        assert_eq!(snapshot.epoch, 3);
        assert_eq!(snapshot.train_loss, Some(0.5));
        assert_eq!(snapshot.val_loss, None);
        assert_eq!(snapshot.eta_sec, Some(4.0));
    }

    #[test]
    fn negative_and_string_counts_read_as_missing() {
        let snapshot = parse(r#"{"type":"epoch","epoch":-1,"epochs_total":"10"}"#);
        assert_eq!(snapshot.status, ProgressStatus::Running);
        assert_eq!(snapshot.epoch, 0);
        assert_eq!(snapshot.epochs_total, 0);
    }

    #[test]
    fn non_string_done_status_is_error() {
        let raw = format!("{}\n{}\n{}", START, EPOCH_2, r#"{"type":"done","status":1}"#);
        assert_eq!(parse(&raw).status, ProgressStatus::Error);
        assert_eq!(
            parse(r#"{"type":"done","status":{"code":"OK"}}"#).status,
            ProgressStatus::Error
        );
    }

    #[test]
    fn eta_formatting() {
        let mut snapshot = ProgressSnapshot::default();
        assert_eq!(snapshot.format_eta(), "--");
        snapshot.eta_sec = Some(42.0);
        assert_eq!(snapshot.format_eta(), "42s");
        snapshot.eta_sec = Some(65.0);
        assert_eq!(snapshot.format_eta(), "1m 05s");
    }

    #[test]
    fn status_display() {
        assert_eq!(ProgressStatus::Running.to_string(), "RUNNING");
        assert_eq!(ProgressStatus::Idle.to_string(), "IDLE");
        assert!(ProgressStatus::Error.is_terminal());
    }

    #[test]
    fn fraction() {
        let snapshot = parse(&format!("{}\n{}", START, EPOCH_2));
        assert_eq!(snapshot.progress_fraction(), Some(0.4));
        assert_eq!(ProgressSnapshot::default().progress_fraction(), None);
    }
}
