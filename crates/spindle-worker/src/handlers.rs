//! Built-in handlers shipped with the worker binary.
//!
//! Real deployments register their own handlers next to these; the
//! built-ins exist for smoke tests and for checking a scheduler's wiring.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spindle_core::domain::{HandlerError, RegistryError, TaskId};
use spindle_core::impls::HandlerRegistry;
use spindle_core::ports::TaskHandler;
use spindle_core::typed::{Handler, Task};

/// Does nothing.
struct NoopHandler;

#[async_trait]
impl TaskHandler for NoopHandler {
    async fn run(&self, _id: &TaskId, _data: serde_json::Value) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Logs the payload.
struct EchoHandler;

#[async_trait]
impl TaskHandler for EchoHandler {
    async fn run(&self, id: &TaskId, data: serde_json::Value) -> Result<(), HandlerError> {
        tracing::info!(task_id = %id, %data, "echo");
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailTask {
    #[serde(default = "FailTask::default_message")]
    pub message: String,
}

impl FailTask {
    fn default_message() -> String {
        "intentional failure".to_string()
    }
}

impl Task for FailTask {
    const TYPE: &'static str = "fail";
}

/// Always fails with the payload's `message`.
struct FailHandler;

#[async_trait]
impl Handler<FailTask> for FailHandler {
    async fn handle(&self, _id: &TaskId, task: FailTask) -> Result<(), HandlerError> {
        Err(HandlerError::new(task.message))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SleepTask {
    pub millis: u64,
}

impl Task for SleepTask {
    const TYPE: &'static str = "sleep";
}

struct SleepHandler;

#[async_trait]
impl Handler<SleepTask> for SleepHandler {
    async fn handle(&self, id: &TaskId, task: SleepTask) -> Result<(), HandlerError> {
        tracing::debug!(task_id = %id, millis = task.millis, "sleeping");
        tokio::time::sleep(Duration::from_millis(task.millis)).await;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrintTask {
    pub text: String,
}

impl Task for PrintTask {
    const TYPE: &'static str = "print";
}

/// Writes `text` to stdout without a trailing newline.
struct PrintHandler;

#[async_trait]
impl Handler<PrintTask> for PrintHandler {
    async fn handle(&self, _id: &TaskId, task: PrintTask) -> Result<(), HandlerError> {
        let mut out = std::io::stdout();
        out.write_all(task.text.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| HandlerError::with_source("writing to stdout", e))
    }
}

/// Panics; the runner must still report.
struct PanicHandler;

#[async_trait]
impl TaskHandler for PanicHandler {
    async fn run(&self, _id: &TaskId, _data: serde_json::Value) -> Result<(), HandlerError> {
        panic!("panic handler invoked")
    }
}

pub fn register_builtin(registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
    registry.register("noop", Arc::new(NoopHandler))?;
    registry.register("echo", Arc::new(EchoHandler))?;
    registry.register("panic", Arc::new(PanicHandler))?;
    registry.register_typed::<FailTask, _>(FailHandler)?;
    registry.register_typed::<SleepTask, _>(SleepHandler)?;
    registry.register_typed::<PrintTask, _>(PrintHandler)?;
    Ok(())
}
