//! HandlerRegistry - handler key → factory
//!
//! # 設計
//! - 起動時に組み立てる（mutable）
//! - 実行時は読むだけ（immutable、`Arc<HandlerRegistry>` で共有）
//! - ロック不要
//!
//! 実行時リフレクションの代わりに、key ごとに factory 関数を登録する。
//! `resolve` のたびに factory を呼ぶので、handler の構築失敗も
//! 解決失敗として扱える。

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{HandlerKey, RegistryError};
use crate::ports::TaskHandler;
use crate::typed::{Handler, Task, TypedHandler};

/// Builds a handler instance. An `Err(reason)` becomes
/// [`RegistryError::Construction`].
pub type HandlerFactory =
    Arc<dyn Fn() -> Result<Arc<dyn TaskHandler>, String> + Send + Sync>;

#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<HandlerKey, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under `key`.
    pub fn register_factory<F>(
        &mut self,
        key: impl Into<HandlerKey>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<Arc<dyn TaskHandler>, String> + Send + Sync + 'static,
    {
        let key = key.into();
        if self.factories.contains_key(&key) {
            return Err(RegistryError::Duplicate(key));
        }
        self.factories.insert(key, Arc::new(factory));
        Ok(())
    }

    /// Register one shared instance; every resolve hands out the same one.
    pub fn register(
        &mut self,
        key: impl Into<HandlerKey>,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), RegistryError> {
        self.register_factory(key, move || Ok(Arc::clone(&handler)))
    }

    /// Register a typed handler under `T::TYPE`.
    pub fn register_typed<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.register(T::TYPE, Arc::new(TypedHandler::new(handler)))
    }

    pub fn resolve(&self, key: &HandlerKey) -> Result<Arc<dyn TaskHandler>, RegistryError> {
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| RegistryError::NotFound(key.clone()))?;
        factory().map_err(|reason| RegistryError::Construction {
            key: key.clone(),
            reason,
        })
    }

    pub fn contains(&self, key: &HandlerKey) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<HandlerKey> {
        let mut keys: Vec<_> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
