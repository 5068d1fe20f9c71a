//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **HandlerRegistry**: handler key → factory の解決
//! - **JsonLinesReporter / FileReporter**: 本番用の報告経路
//! - **MemoryReporter**: テスト用

pub mod registry;
pub mod reporters;

pub use self::registry::{HandlerFactory, HandlerRegistry};
pub use self::reporters::{FileReporter, JsonLinesReporter, MemoryReporter};
