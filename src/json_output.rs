//! JSON output for scripted runs
//!
//! When --json-progress flag is enabled, all progress and status information
//! is emitted as JSON lines to stdout, suppressing all other stdout output.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::card::{CardOutcome, CardResult, SkipReason};

/// Last progress emission timestamp (milliseconds since epoch)
/// Used for throttling progress updates to ~25 FPS (40ms between updates)
static LAST_PROGRESS_MS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Progress update
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    /// Card written (or rendered, in dry-run mode)
    CardCompleted {
        row: usize,
        name: String,
        output_path: String,
        has_profile: bool,
        face_found: bool,
        saved: bool,
        processing_time_ms: u64,
    },
    /// Row failed and was skipped
    CardFailed { row: usize, name: String, error: String },
    /// Row skipped on purpose
    CardSkipped {
        row: usize,
        name: String,
        output_path: String,
        reason: String,
    },
    /// Processing summary
    Summary {
        total_rows: usize,
        rendered: usize,
        failed: usize,
        skipped: usize,
        duration_secs: f64,
    },
}

impl JsonMessage {
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Some(json) = self.to_json() {
            println!("{}", json);
        }
    }

    /// Create and emit progress message (throttled to ~25 FPS)
    ///
    /// The final progress (current == total) is always emitted to ensure 100% completion.
    pub fn progress(current: usize, total: usize, message: impl Into<String>) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let last_ms = LAST_PROGRESS_MS.load(Ordering::Relaxed);

        if now_ms.saturating_sub(last_ms) >= 40 || current == total {
            LAST_PROGRESS_MS.store(now_ms, Ordering::Relaxed);
            Self::Progress {
                current,
                total,
                message: message.into(),
            }
            .emit();
        }
    }

    /// Message describing the outcome of one row
    pub fn from_result(result: &CardResult) -> Self {
        let output_path = result.output_path.display().to_string();
        match &result.outcome {
            Ok(CardOutcome::Rendered {
                has_profile,
                face_found,
                saved,
            }) => Self::CardCompleted {
                row: result.row,
                name: result.name.clone(),
                output_path,
                has_profile: *has_profile,
                face_found: *face_found,
                saved: *saved,
                processing_time_ms: result.duration.as_millis() as u64,
            },
            Ok(CardOutcome::Skipped(reason)) => Self::CardSkipped {
                row: result.row,
                name: result.name.clone(),
                output_path,
                reason: match reason {
                    SkipReason::OutputExists => "output_exists".to_string(),
                },
            },
            Err(e) => Self::CardFailed {
                row: result.row,
                name: result.name.clone(),
                error: format!("{:#}", e),
            },
        }
    }

    /// Create and emit summary message
    pub fn summary(total_rows: usize, rendered: usize, failed: usize, skipped: usize, duration_secs: f64) {
        Self::Summary {
            total_rows,
            rendered,
            failed,
            skipped,
            duration_secs,
        }
        .emit();
    }
}
