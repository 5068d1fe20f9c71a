//! Errors - エラー型と分類
//!
//! - ContextStore 系 (`ContextError`) はロジックの不具合なので即座に呼び出し元へ返す
//! - Runner 系 (`RunnerError`) は報告が終わるまでだけ捕まえ、その後は呼び出し元へ返す

use thiserror::Error;

use super::ids::{HandlerKey, UnitId};

/// Errors raised by the context store.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("cannot create a duplicate context for unit {0}")]
    Duplicate(UnitId),

    #[error("context not found for unit {0}")]
    NotFound(UnitId),

    #[error("not running inside a tokio task")]
    OutsideTask,
}

/// Errors raised while registering or resolving handlers.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no handler registered for key '{0}'")]
    NotFound(HandlerKey),

    #[error("handler for key '{0}' is already registered")]
    Duplicate(HandlerKey),

    #[error("handler '{key}' could not be constructed: {reason}")]
    Construction { key: HandlerKey, reason: String },
}

/// Errors raised while turning raw process arguments into a descriptor.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("task id must not be empty")]
    EmptyId,

    #[error("handler key must not be empty")]
    EmptyHandlerKey,

    #[error("invalid task data: {0}")]
    Data(#[from] serde_json::Error),
}

/// Failure raised by a handler while running a task.
///
/// Display は message のみ。報告される `message` がそのまま handler の言葉になる。
#[derive(Debug)]
pub struct HandlerError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Stage of a single worker run.
///
/// `Start → Decoding → Resolving → Running → Reporting → Exiting`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Decoding,
    Resolving,
    Running,
    Reporting,
    Exiting,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStage::Decoding => "decoding",
            RunStage::Resolving => "resolving",
            RunStage::Running => "running",
            RunStage::Reporting => "reporting",
            RunStage::Exiting => "exiting",
        };
        f.write_str(s)
    }
}

/// Why a worker run failed. Returned after the outcome has been reported.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resolution(#[from] RegistryError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Execution(#[from] HandlerError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler task was aborted: {0}")]
    Aborted(String),
}

impl RunnerError {
    pub fn stage(&self) -> RunStage {
        match self {
            RunnerError::Decode(_) => RunStage::Decoding,
            RunnerError::Resolution(_) => RunStage::Resolving,
            RunnerError::Context(_)
            | RunnerError::Execution(_)
            | RunnerError::Panicked(_)
            | RunnerError::Aborted(_) => RunStage::Running,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by the scheduler-side launcher.
///
/// A worker that ran but never reported is not an error here; it is
/// `LaunchOutcome::Lost`.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("encode task descriptor: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("spawn worker {}: {source}", .program.display())]
    Spawn {
        program: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("wait for worker: {0}")]
    Wait(#[source] std::io::Error),
}

/// Errors raised by a result reporter transport.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report encode: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("report write: {0}")]
    Io(#[from] std::io::Error),
}
