//! Task trait - 型付き Task の定義
//!
//! `TYPE` がそのまま handler key になる。文字列の typo を型で防ぐ。

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Task は handler key と payload 型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Cleanup {
///     older_than_days: u32,
/// }
///
/// impl Task for Cleanup {
///     const TYPE: &'static str = "maintenance.cleanup";
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: launcher 側で descriptor の data を作るため
/// - `DeserializeOwned`: worker 側で data から復元するため
/// - `Send + 'static`: spawn した handler task に move するため
pub trait Task: Serialize + DeserializeOwned + Send + 'static {
    const TYPE: &'static str;
}
