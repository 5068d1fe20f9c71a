//! App - アプリケーション層
//!
//! ports と impls を組み合わせて、1 タスク 1 プロセスの実行を組み立てます。
//!
//! # 主要コンポーネント
//! - **IsolatedTaskRunner**: ワーカープロセス内で 1 タスクを実行し、必ず報告する
//! - **ReportGuard**: 「必ず 1 回だけ報告」を Drop で保証する
//! - **WorkerLauncher**: scheduler 側からワーカープロセスを起動し、結果を回収する

pub mod launcher;
pub mod report_guard;
pub mod runner;

pub use self::launcher::{LaunchOutcome, WorkerLauncher};
pub use self::report_guard::ReportGuard;
pub use self::runner::{IsolatedTaskRunner, HANDLER_KEY, TASK_ID_KEY};
