//! Domain identifiers (strongly-typed IDs).
//!
//! - `TaskId`: scheduler が振るタスク ID（文字列でも数値でもよいので String で保持）
//! - `HandlerKey`: handler registry を引くための文字列キー
//! - `UnitId`: 1 つの実行単位（tokio task）を表す ID。ContextStore の分割キー
//!
//! String newtype にしているのは、3 つを取り違えないようにするためです。
//! `let _: TaskId = handler_key;` はコンパイルできません。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use super::errors::ContextError;

/// Identifier of one scheduled task invocation.
///
/// The scheduler owns the id space. It may be numeric (`"42"`) or opaque
/// (`"task-01J..."`); the worker never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Display で使うプレフィックス
    pub const PREFIX: &'static str = "task-";

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Generate a fresh `task-<ULID>` id.
    ///
    /// ULID なので生成順でソートできる。scheduler 側が自前の ID を
    /// 持っていない場合に使う。
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Ulid::new()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u64> for TaskId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// Key a handler is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerKey(String);

impl HandlerKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for HandlerKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for HandlerKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identity of one execution unit (a tokio task) inside this process.
///
/// Only unique among units that are alive at the same time. tokio reuses
/// nothing today, but callers that name units themselves (`"c1"`) may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The unit id of the tokio task currently being polled.
    ///
    /// Fails with [`ContextError::OutsideTask`] when called from plain
    /// synchronous code or from `block_on` outside any spawned task.
    pub fn current() -> Result<Self, ContextError> {
        tokio::task::try_id()
            .map(Self::from)
            .ok_or(ContextError::OutsideTask)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<tokio::task::Id> for UnitId {
    fn from(id: tokio::task::Id) -> Self {
        Self(format!("tokio-{id}"))
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
