//! ReportGuard - 必ず 1 回だけ報告する
//!
//! runner はタスク開始時に guard を作り、結果が決まったら `complete` で報告する。
//! `complete` に辿り着かずに guard が drop された場合（future のキャンセル、
//! runner 内部の panic による unwind）は、`Drop` が失敗として報告する。
//! どの経路でも reporter が呼ばれるのは 1 回だけ。

use std::sync::Arc;

use crate::domain::{TaskId, WorkerOutcome};
use crate::ports::{Clock, ResultReporter};

/// Message reported when the run ends without producing an outcome.
pub const ABANDONED_MESSAGE: &str = "worker run ended before the task outcome was determined";

pub struct ReportGuard {
    id: TaskId,
    // `None` once the report has been sent.
    reporter: Option<Arc<dyn ResultReporter>>,
    clock: Arc<dyn Clock>,
}

impl ReportGuard {
    pub fn arm(id: TaskId, reporter: Arc<dyn ResultReporter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            id,
            reporter: Some(reporter),
            clock,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Report `outcome` and disarm.
    pub fn complete(mut self, outcome: WorkerOutcome) {
        self.send(outcome);
    }

    fn send(&mut self, outcome: WorkerOutcome) {
        let Some(reporter) = self.reporter.take() else {
            return;
        };
        let report = outcome.into_report(self.id.clone(), self.clock.now());
        match reporter.report(&report) {
            Ok(()) => tracing::debug!(task_id = %self.id, success = report.success, "result reported"),
            // best effort: the exit code still tells the scheduler what happened
            Err(err) => tracing::error!(task_id = %self.id, error = %err, "failed to report result"),
        }
    }
}

impl Drop for ReportGuard {
    fn drop(&mut self) {
        if self.reporter.is_some() {
            tracing::warn!(task_id = %self.id, "report guard dropped while armed");
            self.send(WorkerOutcome::failed(ABANDONED_MESSAGE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReportError, ResultReport};
    use crate::impls::MemoryReporter;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()))
    }

    #[test]
    fn complete_reports_once() {
        let reporter = Arc::new(MemoryReporter::new());
        let guard = ReportGuard::arm(TaskId::new("t1"), reporter.clone(), clock());
        guard.complete(WorkerOutcome::succeeded());

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].success);
        assert_eq!(reports[0].finished_at, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn dropping_an_armed_guard_reports_failure() {
        let reporter = Arc::new(MemoryReporter::new());
        drop(ReportGuard::arm(TaskId::new("t1"), reporter.clone(), clock()));

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].success);
        assert_eq!(reports[0].message, ABANDONED_MESSAGE);
    }

    #[test]
    fn unwinding_through_the_guard_reports_failure() {
        let reporter = Arc::new(MemoryReporter::new());
        let r = reporter.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = ReportGuard::arm(TaskId::new("t1"), r, clock());
            panic!("runner bug");
        }));

        assert!(result.is_err());
        assert_eq!(reporter.reports().len(), 1);
    }

    struct BrokenPipe;

    impl ResultReporter for BrokenPipe {
        fn report(&self, _report: &ResultReport) -> Result<(), ReportError> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into())
        }
    }

    #[test]
    fn transport_failure_does_not_panic() {
        let guard = ReportGuard::arm(TaskId::new("t1"), Arc::new(BrokenPipe), clock());
        guard.complete(WorkerOutcome::failed("boom"));
    }
}
