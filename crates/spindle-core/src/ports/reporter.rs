//! ResultReporter port - 実行結果を scheduler に返す
//!
//! # 同期 API である理由
//! `ReportGuard` は `Drop` の中からも報告する。`Drop` では await できないので
//! `report` は同期呼び出しで、戻った時点で送信が終わっている必要がある。

use crate::domain::{ReportError, ResultReport};

/// Delivers one [`ResultReport`] to the scheduler.
///
/// Called at most once per worker run. Transport failures are returned,
/// never retried here.
pub trait ResultReporter: Send + Sync {
    fn report(&self, report: &ResultReport) -> Result<(), ReportError>;
}
