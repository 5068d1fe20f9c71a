//! Outcome model: what one worker run produced, and the record sent to the
//! scheduler.
//!
//! `WorkerOutcome` is never built field by field; it is derived from the
//! run result so that `exit_code == 0` holds exactly when `success` does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::RunnerError;
use super::ids::TaskId;

/// Exit code for a run whose handler completed.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for any failure (decoding, resolution, execution).
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    success: bool,
    message: String,
    exit_code: i32,
}

impl WorkerOutcome {
    pub fn from_result<T>(result: &Result<T, RunnerError>) -> Self {
        match result {
            Ok(_) => Self::succeeded(),
            Err(err) => Self::failed(err.to_string()),
        }
    }

    pub(crate) fn succeeded() -> Self {
        Self {
            success: true,
            message: String::new(),
            exit_code: EXIT_SUCCESS,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            exit_code: EXIT_FAILURE,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn into_report(self, id: TaskId, finished_at: DateTime<Utc>) -> ResultReport {
        ResultReport {
            id,
            success: self.success,
            message: self.message,
            finished_at,
        }
    }
}

/// The `(id, success, message)` triple delivered to the scheduler.
///
/// On the wire it is one JSON object per line:
/// `{"id":"t1","success":true,"message":"","finished_at":"..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    pub id: TaskId,
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub finished_at: DateTime<Utc>,
}
