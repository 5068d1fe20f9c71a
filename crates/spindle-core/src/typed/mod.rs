//! Typed - 型付き Task API
//!
//! handler key の typo を型で排除し、payload の型を静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait, `Handler<T>` trait - 型安全
//! - **内部（Dyn）**: `TaskHandler` trait - object-safe, registry に格納される

pub mod handler;
pub mod task;

pub use self::handler::{Handler, TypedHandler};
pub use self::task::Task;
