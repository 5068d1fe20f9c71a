//! spindle-worker: runs exactly one scheduled task, reports its outcome,
//! and exits with `0` (success) or `1` (any failure).
//!
//! ```text
//! spindle-worker --id t1 --handler noop --data '{}'
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use spindle_core::app::{IsolatedTaskRunner, ReportGuard};
use spindle_core::domain::{Invocation, WorkerOutcome, EXIT_FAILURE};
use spindle_core::impls::{FileReporter, HandlerRegistry, JsonLinesReporter};
use spindle_core::observability::init_tracing;
use spindle_core::ports::{ResultReporter, SystemClock};
use tokio::runtime::Runtime;

mod handlers;

/// Isolated worker process for one scheduled task
#[derive(Parser, Debug)]
#[command(name = "spindle-worker")]
#[command(about = "Run one scheduled task and report its outcome", long_about = None)]
#[command(version)]
struct Cli {
    /// Task id assigned by the scheduler
    #[arg(long, env = "SPINDLE_TASK_ID")]
    id: String,

    /// Key of the registered handler to run
    #[arg(long, env = "SPINDLE_HANDLER")]
    handler: String,

    /// Task payload as JSON text
    #[arg(long, env = "SPINDLE_DATA", default_value = "null")]
    data: String,

    /// Append the report to this file instead of writing it to stdout
    #[arg(long, env = "SPINDLE_REPORT")]
    report: Option<PathBuf>,

    /// tracing filter (e.g. "info", "spindle_core=debug")
    #[arg(long, env = "SPINDLE_LOG")]
    log: Option<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help / --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(EXIT_FAILURE);
        }
    };
    init_tracing(cli.log.as_deref());

    let reporter = reporter_for(cli.report.as_deref());
    let invocation = Invocation::new(cli.id, cli.handler, cli.data);
    let code = run(&invocation, reporter, startup);
    // last action, whatever happened above
    std::process::exit(code);
}

fn reporter_for(path: Option<&Path>) -> Arc<dyn ResultReporter> {
    match path {
        Some(path) => Arc::new(FileReporter::new(path)),
        None => Arc::new(JsonLinesReporter::stdout()),
    }
}

fn startup() -> anyhow::Result<(HandlerRegistry, Runtime)> {
    let mut registry = HandlerRegistry::new();
    handlers::register_builtin(&mut registry).context("registering built-in handlers")?;

    // one task per process: a single thread is enough, handlers cooperate
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    Ok((registry, runtime))
}

/// Run `invocation` and return the exit code.
///
/// The id is known from here on, so every path ends in exactly one report:
/// a failed `startup` is reported here, everything later by the runner.
fn run<S>(invocation: &Invocation, reporter: Arc<dyn ResultReporter>, startup: S) -> i32
where
    S: FnOnce() -> anyhow::Result<(HandlerRegistry, Runtime)>,
{
    let (registry, runtime) = match startup() {
        Ok(started) => started,
        Err(err) => {
            tracing::error!(task_id = %invocation.id, error = ?err, "worker could not start");
            ReportGuard::arm(invocation.task_id(), reporter, Arc::new(SystemClock))
                .complete(WorkerOutcome::failed(format!("worker could not start: {err:#}")));
            return EXIT_FAILURE;
        }
    };

    let runner = IsolatedTaskRunner::new(Arc::new(registry), reporter);
    // handler panics are caught inside the runner; this catches the runner's
    // own, after its report guard has fired during the unwind
    let result = match panic::catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(runner.run(invocation))
    })) {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(task_id = %invocation.id, "worker runner panicked");
            runtime.shutdown_background();
            return EXIT_FAILURE;
        }
    };

    let outcome = WorkerOutcome::from_result(&result);
    if let Err(err) = result {
        // already reported; escalate to whoever supervises this process
        tracing::error!(
            task_id = %invocation.id,
            stage = %err.stage(),
            error = %err,
            exit_code = outcome.exit_code(),
            "task failed"
        );
    }

    // handlers may leave background tasks behind; don't wait for them
    runtime.shutdown_background();
    outcome.exit_code()
}
