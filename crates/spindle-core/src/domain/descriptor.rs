//! Task descriptor and the raw process invocation it is decoded from.

use serde::{Deserialize, Serialize};

use super::errors::DecodeError;
use super::ids::{HandlerKey, TaskId};
use crate::typed::Task;

/// Command line flags shared by the worker binary and the launcher.
pub mod flags {
    pub const ID: &str = "--id";
    pub const HANDLER: &str = "--handler";
    pub const DATA: &str = "--data";
    pub const LOG: &str = "--log";
}

/// The three scalars a worker process is started with, still undecoded.
///
/// `data` is UTF-8 JSON text. It is decoded exactly once, by
/// [`Invocation::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub id: String,
    pub handler_key: String,
    pub data: String,
}

impl Invocation {
    pub fn new(
        id: impl Into<String>,
        handler_key: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            handler_key: handler_key.into(),
            data: data.into(),
        }
    }

    /// Task id as far as it is known before decoding.
    pub fn task_id(&self) -> TaskId {
        TaskId::new(self.id.clone())
    }

    pub fn decode(&self) -> Result<TaskDescriptor, DecodeError> {
        if self.id.is_empty() {
            return Err(DecodeError::EmptyId);
        }
        if self.handler_key.is_empty() {
            return Err(DecodeError::EmptyHandlerKey);
        }
        let data = serde_json::from_str(&self.data)?;
        Ok(TaskDescriptor {
            id: TaskId::new(self.id.clone()),
            handler_key: HandlerKey::new(self.handler_key.clone()),
            data,
        })
    }
}

/// One scheduled task: which handler to run, with what payload.
///
/// Immutable after construction; fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    id: TaskId,
    handler_key: HandlerKey,
    data: serde_json::Value,
}

impl TaskDescriptor {
    pub fn new(id: TaskId, handler_key: HandlerKey, data: serde_json::Value) -> Self {
        Self {
            id,
            handler_key,
            data,
        }
    }

    /// Build a descriptor for a typed task; the handler key is `T::TYPE`.
    pub fn for_task<T: Task>(id: TaskId, task: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            id,
            HandlerKey::new(T::TYPE),
            serde_json::to_value(task)?,
        ))
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn handler_key(&self) -> &HandlerKey {
        &self.handler_key
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn into_parts(self) -> (TaskId, HandlerKey, serde_json::Value) {
        (self.id, self.handler_key, self.data)
    }

    /// Encode back into the worker's invocation surface.
    pub fn to_invocation(&self) -> Result<Invocation, serde_json::Error> {
        Ok(Invocation::new(
            self.id.as_str(),
            self.handler_key.as_str(),
            serde_json::to_string(&self.data)?,
        ))
    }

    /// Argument list for `spindle-worker`.
    pub fn to_args(&self) -> Result<Vec<String>, serde_json::Error> {
        let inv = self.to_invocation()?;
        Ok(vec![
            flags::ID.to_string(),
            inv.id,
            flags::HANDLER.to_string(),
            inv.handler_key,
            flags::DATA.to_string(),
            inv.data,
        ])
    }
}
