//! Domain model (ids, descriptors, outcomes, errors).

pub mod descriptor;
pub mod errors;
pub mod ids;
pub mod outcome;

pub use self::descriptor::{flags, Invocation, TaskDescriptor};
pub use self::errors::{
    ConfigError, ContextError, DecodeError, HandlerError, LaunchError, RegistryError, ReportError,
    RunStage, RunnerError,
};
pub use self::ids::{HandlerKey, TaskId, UnitId};
pub use self::outcome::{ResultReport, WorkerOutcome, EXIT_FAILURE, EXIT_SUCCESS};
