//! spindle-core
//!
//! Core building blocks for running scheduled tasks in isolated worker
//! processes.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, descriptor, outcome, errors）
//! - **context**: 実行単位ごとの key/value 状態（ContextStore, ContextScope）
//! - **ports**: 抽象化レイヤー（TaskHandler, ResultReporter, Clock）
//! - **typed**: 型付き Task API（Task trait, Handler trait）
//! - **impls**: 実装（HandlerRegistry, reporters）
//! - **app**: IsolatedTaskRunner, WorkerLauncher
//! - **config**: launcher の設定
//! - **observability**: tracing の初期化

pub mod app;
pub mod config;
pub mod context;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;
