//! TaskHandler port - スケジュールされたタスクを実際に処理する側
//!
//! registry は `HandlerKey` → factory を持ち、`resolve` のたびに
//! `Arc<dyn TaskHandler>` を得る。runner はそれを別 tokio task で実行する。

use async_trait::async_trait;

use crate::domain::{HandlerError, TaskId};

/// A unit of scheduled work.
///
/// `data` is the decoded JSON payload of the task descriptor. Returning
/// `Err` marks the run as failed; the error's message is what the
/// scheduler sees.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, id: &TaskId, data: serde_json::Value) -> Result<(), HandlerError>;
}
