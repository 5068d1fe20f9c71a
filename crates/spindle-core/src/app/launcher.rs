//! WorkerLauncher - scheduler 側からワーカープロセスを起動する
//!
//! 1 タスク = 1 プロセス。descriptor を引数に詰めて `spindle-worker` を起動し、
//! stdout に書かれた報告行と exit code を回収する。
//!
//! 報告が無いままプロセスが消えた場合（kill、クラッシュ、timeout）は
//! `LaunchOutcome::Lost` になる。どう扱うか（再実行するか等）は scheduler の判断。

use std::process::Stdio;

use tokio::process::Command;

use crate::config::LauncherConfig;
use crate::domain::{flags, LaunchError, ResultReport, TaskDescriptor, TaskId, EXIT_SUCCESS};

/// What the scheduler learned from one worker process.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchOutcome {
    /// The worker delivered its report. `exit_code` is `None` when the
    /// process was terminated by a signal after reporting.
    Reported {
        report: ResultReport,
        exit_code: Option<i32>,
    },
    /// The worker exited (or was killed) without a report.
    Lost { exit_code: Option<i32> },
}

impl LaunchOutcome {
    pub fn report(&self) -> Option<&ResultReport> {
        match self {
            LaunchOutcome::Reported { report, .. } => Some(report),
            LaunchOutcome::Lost { .. } => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            LaunchOutcome::Reported { exit_code, .. } | LaunchOutcome::Lost { exit_code } => {
                *exit_code
            }
        }
    }

    /// Reported success and exited 0.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            LaunchOutcome::Reported { report, exit_code: Some(EXIT_SUCCESS) } if report.success
        )
    }
}

#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    config: LauncherConfig,
}

impl WorkerLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Spawn one worker for `descriptor` and wait for it to finish.
    pub async fn launch(&self, descriptor: &TaskDescriptor) -> Result<LaunchOutcome, LaunchError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(descriptor.to_args()?)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(filter) = &self.config.log_filter {
            cmd.args([flags::LOG, filter.as_str()]);
        }

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;
        tracing::debug!(task_id = %descriptor.id(), pid = ?child.id(), "worker spawned");

        // dropping `wait` drops the child, and kill_on_drop kills it
        let wait = child.wait_with_output();
        let output = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(output) => output.map_err(LaunchError::Wait)?,
                Err(_) => {
                    tracing::warn!(task_id = %descriptor.id(), ?limit, "worker timed out, killed");
                    return Ok(LaunchOutcome::Lost { exit_code: None });
                }
            },
            None => wait.await.map_err(LaunchError::Wait)?,
        };

        let exit_code = output.status.code();
        let Some(report) = find_report(&output.stdout, descriptor.id()) else {
            tracing::warn!(task_id = %descriptor.id(), ?exit_code, "worker exited without reporting");
            return Ok(LaunchOutcome::Lost { exit_code });
        };

        if report.success != (exit_code == Some(EXIT_SUCCESS)) {
            tracing::warn!(
                task_id = %descriptor.id(),
                success = report.success,
                ?exit_code,
                "reported outcome disagrees with exit code"
            );
        }
        Ok(LaunchOutcome::Reported { report, exit_code })
    }
}

/// Last line on stdout that is a report for `id`.
fn find_report(stdout: &[u8], id: &TaskId) -> Option<ResultReport> {
    String::from_utf8_lossy(stdout)
        .lines()
        .rev()
        .filter_map(parse_report_line)
        .find(|report| &report.id == id)
}

/// A handler may leave an unterminated line on stdout, in which case the
/// report is glued onto its tail. Try every `{` as the start of the report.
fn parse_report_line(line: &str) -> Option<ResultReport> {
    let line = line.trim();
    line.match_indices('{')
        .find_map(|(at, _)| serde_json::from_str::<ResultReport>(&line[at..]).ok())
}
