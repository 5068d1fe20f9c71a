use std::sync::Arc;

use serde_json::Value;

use super::{ContextMap, ContextStore};
use crate::domain::{ContextError, UnitId};

/// Creates a context on entry and destroys it on drop.
///
/// Dropping the scope is the only teardown path, so a unit that is
/// cancelled mid-flight (its future dropped) still releases its entry.
#[derive(Debug)]
pub struct ContextScope {
    store: Arc<ContextStore>,
    unit: UnitId,
}

impl ContextScope {
    /// Enter a scope for the tokio task currently running.
    pub fn enter(store: &Arc<ContextStore>) -> Result<Self, ContextError> {
        Self::enter_as(store, UnitId::current()?)
    }

    /// Enter a scope for an explicitly named unit.
    pub fn enter_as(store: &Arc<ContextStore>, unit: UnitId) -> Result<Self, ContextError> {
        store.create(&unit)?;
        Ok(Self {
            store: Arc::clone(store),
            unit,
        })
    }

    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    pub fn get(&self, key: &str, default: Value) -> Result<Value, ContextError> {
        self.store.get(&self.unit, key, default)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), ContextError> {
        self.store.set(&self.unit, key, value)
    }

    pub fn snapshot(&self) -> Result<ContextMap, ContextError> {
        self.store.snapshot(&self.unit)
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        if let Err(err) = self.store.destroy(&self.unit) {
            // someone destroyed it by hand; nothing left to release
            tracing::warn!(unit = %self.unit, error = %err, "context already gone at scope exit");
        }
    }
}
