//! IsolatedTaskRunner - 1 プロセスで 1 タスクを実行する
//!
//! # フロー
//! 1. `ReportGuard` を arm（以降どの経路でも報告される）
//! 2. Decoding: `Invocation` → `TaskDescriptor`
//! 3. Resolving: registry から handler を解決
//! 4. Running: handler を別 tokio task で実行（ContextScope 付き、panic も捕捉）
//! 5. Reporting: `WorkerOutcome` を導出して報告
//! 6. エラーは報告の後で呼び出し元に返す（握りつぶさない）
//!
//! プロセスの終了（exit code）は呼び出し元（worker バイナリ）が最後に行う。
//! リトライはしない。scheduler が報告と exit code を見て決める。

use std::any::Any;
use std::sync::Arc;

use tracing::Instrument;

use super::report_guard::ReportGuard;
use crate::context::{ContextScope, ContextStore};
use crate::domain::{Invocation, RunStage, RunnerError, TaskDescriptor, WorkerOutcome};
use crate::impls::HandlerRegistry;
use crate::ports::{Clock, ResultReporter, SystemClock, TaskHandler};

/// Context key holding the running task's id.
pub const TASK_ID_KEY: &str = "task_id";

/// Context key holding the running task's handler key.
pub const HANDLER_KEY: &str = "handler";

pub struct IsolatedTaskRunner {
    registry: Arc<HandlerRegistry>,
    reporter: Arc<dyn ResultReporter>,
    clock: Arc<dyn Clock>,
    contexts: Arc<ContextStore>,
}

impl IsolatedTaskRunner {
    pub fn new(registry: Arc<HandlerRegistry>, reporter: Arc<dyn ResultReporter>) -> Self {
        Self {
            registry,
            reporter,
            clock: Arc::new(SystemClock),
            contexts: Arc::new(ContextStore::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share a store with handlers that were built around it.
    pub fn with_context_store(mut self, contexts: Arc<ContextStore>) -> Self {
        self.contexts = contexts;
        self
    }

    /// Run one invocation and report its outcome exactly once.
    ///
    /// The returned error is the same failure that was reported; callers
    /// are expected to surface it and exit with
    /// [`WorkerOutcome::exit_code`].
    pub async fn run(&self, invocation: &Invocation) -> Result<(), RunnerError> {
        let span = tracing::info_span!(
            "worker_run",
            task_id = %invocation.id,
            handler = %invocation.handler_key,
        );

        async move {
            let guard = ReportGuard::arm(
                invocation.task_id(),
                Arc::clone(&self.reporter),
                Arc::clone(&self.clock),
            );

            let result = self.execute(invocation).await;
            match &result {
                Ok(()) => tracing::info!("task completed"),
                Err(err) => tracing::warn!(stage = %err.stage(), error = %err, "task failed"),
            }

            tracing::debug!(stage = %RunStage::Reporting);
            guard.complete(WorkerOutcome::from_result(&result));
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(), RunnerError> {
        tracing::debug!(stage = %RunStage::Decoding);
        let descriptor = invocation.decode()?;

        tracing::debug!(stage = %RunStage::Resolving);
        let handler = self.registry.resolve(descriptor.handler_key())?;

        tracing::debug!(stage = %RunStage::Running);
        self.spawn_handler(handler, descriptor).await
    }

    /// Run the handler as its own tokio task so it gets its own execution
    /// unit (and context), and so a panic comes back as a `JoinError`
    /// instead of tearing down the runner.
    async fn spawn_handler(
        &self,
        handler: Arc<dyn TaskHandler>,
        descriptor: TaskDescriptor,
    ) -> Result<(), RunnerError> {
        let contexts = Arc::clone(&self.contexts);

        let join = tokio::spawn(
            async move {
                let scope = ContextScope::enter(&contexts)?;
                scope.set(TASK_ID_KEY, descriptor.id().as_str())?;
                scope.set(HANDLER_KEY, descriptor.handler_key().as_str())?;

                let (id, _, data) = descriptor.into_parts();
                handler.run(&id, data).await?;
                Ok::<(), RunnerError>(())
            }
            .in_current_span(),
        );

        match join.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(RunnerError::Panicked(panic_message(err.into_panic()))),
            Err(err) => Err(RunnerError::Aborted(err.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::report_guard::ABANDONED_MESSAGE;
    use crate::domain::{HandlerError, TaskId, UnitId, EXIT_FAILURE, EXIT_SUCCESS};
    use crate::impls::MemoryReporter;
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct Noop;

    #[async_trait]
    impl TaskHandler for Noop {
        async fn run(&self, _id: &TaskId, _data: Value) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct Boom;

    #[async_trait]
    impl TaskHandler for Boom {
        async fn run(&self, _id: &TaskId, _data: Value) -> Result<(), HandlerError> {
            Err(HandlerError::new("disk full"))
        }
    }

    struct Panics;

    #[async_trait]
    impl TaskHandler for Panics {
        async fn run(&self, _id: &TaskId, _data: Value) -> Result<(), HandlerError> {
            panic!("index out of bounds");
        }
    }

    /// Reads its own context while running.
    struct ContextProbe {
        contexts: Arc<ContextStore>,
        seen: Mutex<Option<(Value, Value)>>,
    }

    #[async_trait]
    impl TaskHandler for ContextProbe {
        async fn run(&self, _id: &TaskId, _data: Value) -> Result<(), HandlerError> {
            let me = UnitId::current().map_err(|e| HandlerError::with_source("no unit", e))?;
            let task_id = self.contexts.get(&me, TASK_ID_KEY, Value::Null).unwrap();
            let handler = self.contexts.get(&me, HANDLER_KEY, Value::Null).unwrap();
            *self.seen.lock().unwrap() = Some((task_id, handler));
            Ok(())
        }
    }

    /// Waits forever; used to cancel a run mid-flight.
    struct Hang;

    #[async_trait]
    impl TaskHandler for Hang {
        async fn run(&self, _id: &TaskId, _data: Value) -> Result<(), HandlerError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn registry() -> HandlerRegistry {
        let mut reg = HandlerRegistry::new();
        reg.register("Noop", Arc::new(Noop)).unwrap();
        reg.register("Boom", Arc::new(Boom)).unwrap();
        reg.register("Panics", Arc::new(Panics)).unwrap();
        reg.register("Hang", Arc::new(Hang)).unwrap();
        reg.register_factory("Broken", || Err("no credentials".to_string()))
            .unwrap();
        reg
    }

    fn build_runner(reg: HandlerRegistry) -> (IsolatedTaskRunner, Arc<MemoryReporter>) {
        let reporter = Arc::new(MemoryReporter::new());
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let runner = IsolatedTaskRunner::new(Arc::new(reg), reporter.clone())
            .with_clock(Arc::new(clock));
        (runner, reporter)
    }

    #[tokio::test]
    async fn successful_handler_reports_success() {
        let (runner, reporter) = build_runner(registry());
        let result = runner.run(&Invocation::new("t1", "Noop", "{}")).await;

        assert!(result.is_ok());
        let outcome = WorkerOutcome::from_result(&result);
        assert_eq!(outcome.exit_code(), EXIT_SUCCESS);

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, TaskId::new("t1"));
        assert!(reports[0].success);
        assert_eq!(reports[0].message, "");
    }

    #[tokio::test]
    async fn failing_handler_reports_then_returns_the_error() {
        let (runner, reporter) = build_runner(registry());
        let result = runner.run(&Invocation::new("t2", "Boom", "{}")).await;

        let err = result.as_ref().unwrap_err();
        assert!(matches!(err, RunnerError::Execution(_)));
        assert_eq!(WorkerOutcome::from_result(&result).exit_code(), EXIT_FAILURE);

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id.as_str(), "t2");
        assert!(!reports[0].success);
        assert_eq!(reports[0].message, "disk full");
    }

    #[tokio::test]
    async fn unknown_handler_is_reported_as_failure() {
        let (runner, reporter) = build_runner(registry());
        let result = runner.run(&Invocation::new("t3", "Unregistered", "{}")).await;

        assert!(matches!(result, Err(RunnerError::Resolution(_))));
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].success);
        assert_eq!(reports[0].message, "no handler registered for key 'Unregistered'");
    }

    #[tokio::test]
    async fn construction_failure_is_reported_as_failure() {
        let (runner, reporter) = build_runner(registry());
        let result = runner.run(&Invocation::new("t4", "Broken", "{}")).await;

        assert_eq!(result.unwrap_err().stage(), RunStage::Resolving);
        assert!(reporter.reports()[0].message.contains("no credentials"));
    }

    #[tokio::test]
    async fn bad_payload_is_reported_as_failure() {
        let (runner, reporter) = build_runner(registry());
        let result = runner.run(&Invocation::new("t5", "Noop", "{oops")).await;

        assert_eq!(result.unwrap_err().stage(), RunStage::Decoding);
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].message.starts_with("invalid task data"));
    }

    #[tokio::test]
    async fn panicking_handler_is_reported_as_failure() {
        let (runner, reporter) = build_runner(registry());
        let result = runner.run(&Invocation::new("t6", "Panics", "{}")).await;

        assert!(matches!(result, Err(RunnerError::Panicked(ref m)) if m == "index out of bounds"));
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].message, "handler panicked: index out of bounds");
    }

    #[tokio::test]
    async fn handler_sees_its_own_context_which_is_released_afterwards() {
        let contexts = Arc::new(ContextStore::new());
        let probe = Arc::new(ContextProbe {
            contexts: Arc::clone(&contexts),
            seen: Mutex::new(None),
        });

        let mut reg = HandlerRegistry::new();
        reg.register("probe", probe.clone()).unwrap();
        let (runner, _reporter) = build_runner(reg);
        let runner = runner.with_context_store(Arc::clone(&contexts));

        runner.run(&Invocation::new("t7", "probe", "null")).await.unwrap();

        let seen = probe.seen.lock().unwrap().clone();
        assert_eq!(seen, Some((json!("t7"), json!("probe"))));
        assert_eq!(contexts.active_units(), 0);
    }

    #[tokio::test]
    async fn cancelled_run_still_reports() {
        let (runner, reporter) = build_runner(registry());
        let inv = Invocation::new("t8", "Hang", "{}");

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            runner.run(&inv),
        )
        .await;

        assert!(timed_out.is_err());
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, TaskId::new("t8"));
        assert_eq!(reports[0].message, ABANDONED_MESSAGE);
    }

    #[tokio::test]
    async fn every_path_reports_exactly_once() {
        for key in ["Noop", "Boom", "Panics", "Broken", "Unregistered"] {
            let (runner, reporter) = build_runner(registry());
            let result = runner.run(&Invocation::new("t", key, "{}")).await;

            let reports = reporter.reports();
            assert_eq!(reports.len(), 1, "handler {key}");
            assert_eq!(reports[0].success, result.is_ok(), "handler {key}");
        }
    }
}
