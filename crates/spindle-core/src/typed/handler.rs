//! Handler trait - 型付き Handler と `TaskHandler` への型消去
//!
//! - `Handler<T>`: payload を `T` として受け取る（型安全）
//! - `TypedHandler<T, H>`: JSON → `T` のデコードを挟んで `TaskHandler` にする

use std::marker::PhantomData;

use async_trait::async_trait;

use super::task::Task;
use crate::domain::{HandlerError, TaskId};
use crate::ports::TaskHandler;

/// Handler は型付き Task を処理する
///
/// `Handler<Greet>` は `Greet` しか受け取れない。
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, id: &TaskId, task: T) -> Result<(), HandlerError>;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> TaskHandler for TypedHandler<T, H> {
    async fn run(&self, id: &TaskId, data: serde_json::Value) -> Result<(), HandlerError> {
        let task: T = serde_json::from_value(data).map_err(|e| {
            HandlerError::with_source(format!("invalid payload for '{}': {e}", T::TYPE), e)
        })?;
        self.handler.handle(id, task).await
    }
}
