//! Ports - 抽象化レイヤー
//!
//! runner が外部とやり取りする境界を trait で定義します。
//!
//! - **TaskHandler**: 実際のタスク処理（registry 経由で解決）
//! - **ResultReporter**: scheduler への結果報告
//! - **Clock**: 報告時刻

pub mod clock;
pub mod handler;
pub mod reporter;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::handler::TaskHandler;
pub use self::reporter::ResultReporter;
