//! ContextStore - 実行単位ごとの key/value 状態
//!
//! 1 つの tokio task（実行単位）に紐づく状態を、明示的な create/destroy で
//! 区切って保持します。
//!
//! # ライフサイクル
//! - `create(unit)`: 空の Context を確保。二重作成は `ContextError::Duplicate`
//! - `set` / `get` / `snapshot`: Context が無ければ `ContextError::NotFound`
//! - `destroy(unit)`: 破棄。以降同じ unit id で `create` し直せる
//!
//! # 並行性
//! - 内部の map はプロセス全体で 1 つ。`std::sync::Mutex` で直列化する
//! - ロックは各操作の中で完結する（await を跨がない）
//! - 1 unit の Context はその unit だけが触る前提。分離は unit id による分割のみ

mod scope;

pub use self::scope::ContextScope;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::domain::{ContextError, UnitId};

/// The key/value state of one execution unit.
pub type ContextMap = BTreeMap<String, Value>;

/// Process-wide store of per-unit contexts.
///
/// Share it as `Arc<ContextStore>`; there is no global instance.
///
/// # 使用例
/// ```ignore
/// let store = ContextStore::new();
/// let unit = UnitId::from("c1");
/// store.create(&unit)?;
/// store.set(&unit, "role", "worker")?;
/// assert_eq!(store.get(&unit, "role", Value::Null)?, "worker");
/// store.destroy(&unit)?;
/// ```
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: Mutex<HashMap<UnitId, ContextMap>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an empty context for `unit`.
    pub fn create(&self, unit: &UnitId) -> Result<(), ContextError> {
        let mut contexts = self.lock();
        if contexts.contains_key(unit) {
            return Err(ContextError::Duplicate(unit.clone()));
        }
        contexts.insert(unit.clone(), ContextMap::new());
        tracing::trace!(%unit, "context created");
        Ok(())
    }

    /// Remove the context for `unit`.
    pub fn destroy(&self, unit: &UnitId) -> Result<(), ContextError> {
        match self.lock().remove(unit) {
            Some(_) => {
                tracing::trace!(%unit, "context destroyed");
                Ok(())
            }
            None => Err(ContextError::NotFound(unit.clone())),
        }
    }

    /// Value stored under `key`, or `default` when the key was never set.
    ///
    /// Never inserts `default` into the store.
    pub fn get(&self, unit: &UnitId, key: &str, default: Value) -> Result<Value, ContextError> {
        let contexts = self.lock();
        let ctx = contexts
            .get(unit)
            .ok_or_else(|| ContextError::NotFound(unit.clone()))?;
        Ok(ctx.get(key).cloned().unwrap_or(default))
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(
        &self,
        unit: &UnitId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), ContextError> {
        let mut contexts = self.lock();
        let ctx = contexts
            .get_mut(unit)
            .ok_or_else(|| ContextError::NotFound(unit.clone()))?;
        ctx.insert(key.into(), value.into());
        Ok(())
    }

    /// Copy of the whole context for `unit`.
    pub fn snapshot(&self, unit: &UnitId) -> Result<ContextMap, ContextError> {
        self.lock()
            .get(unit)
            .cloned()
            .ok_or_else(|| ContextError::NotFound(unit.clone()))
    }

    pub fn contains(&self, unit: &UnitId) -> bool {
        self.lock().contains_key(unit)
    }

    /// Number of live contexts. A number that only grows means some unit
    /// was cancelled without `destroy`.
    pub fn active_units(&self) -> usize {
        self.lock().len()
    }

    // A panic while holding the lock cannot leave a half-written map: every
    // mutation is a single insert/remove.
    fn lock(&self) -> MutexGuard<'_, HashMap<UnitId, ContextMap>> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    fn unit(s: &str) -> UnitId {
        UnitId::from(s)
    }

    #[test]
    fn values_are_partitioned_by_unit() {
        let store = ContextStore::new();
        store.create(&unit("c1")).unwrap();
        store.set(&unit("c1"), "role", "worker").unwrap();
        store.create(&unit("c2")).unwrap();

        assert_eq!(store.get(&unit("c1"), "role", Value::Null).unwrap(), json!("worker"));
        assert_eq!(store.get(&unit("c2"), "role", Value::Null).unwrap(), Value::Null);
    }

    #[rstest]
    #[case(Value::Null)]
    #[case(json!(0))]
    #[case(json!("fallback"))]
    #[case(json!({"nested": [1, 2]}))]
    fn missing_key_returns_default_without_storing_it(#[case] default: Value) {
        let store = ContextStore::new();
        store.create(&unit("u")).unwrap();

        assert_eq!(store.get(&unit("u"), "never-set", default.clone()).unwrap(), default);
        assert!(store.snapshot(&unit("u")).unwrap().is_empty());
    }

    #[test]
    fn set_overwrites() {
        let store = ContextStore::new();
        store.create(&unit("u")).unwrap();
        store.set(&unit("u"), "k", 1).unwrap();
        store.set(&unit("u"), "k", 2).unwrap();
        assert_eq!(store.get(&unit("u"), "k", Value::Null).unwrap(), json!(2));
    }

    #[rstest]
    #[case::get("get")]
    #[case::set("set")]
    #[case::destroy("destroy")]
    #[case::snapshot("snapshot")]
    fn accessors_fail_without_context(#[case] op: &str) {
        let store = ContextStore::new();
        let u = unit("ghost");
        let err = match op {
            "get" => store.get(&u, "k", Value::Null).map(|_| ()),
            "set" => store.set(&u, "k", 1),
            "destroy" => store.destroy(&u),
            "snapshot" => store.snapshot(&u).map(|_| ()),
            _ => unreachable!(),
        }
        .unwrap_err();
        assert!(matches!(err, ContextError::NotFound(ref id) if id == &u));
    }

    #[test]
    fn duplicate_create_fails() {
        let store = ContextStore::new();
        store.create(&unit("u")).unwrap();
        store.set(&unit("u"), "k", "v").unwrap();

        let err = store.create(&unit("u")).unwrap_err();
        assert!(matches!(err, ContextError::Duplicate(_)));
        // the existing context is untouched
        assert_eq!(store.get(&unit("u"), "k", Value::Null).unwrap(), json!("v"));
    }

    #[test]
    fn unit_can_be_reused_after_destroy() {
        let store = ContextStore::new();
        store.create(&unit("u")).unwrap();
        store.set(&unit("u"), "k", "old").unwrap();
        store.destroy(&unit("u")).unwrap();

        store.create(&unit("u")).unwrap();
        assert_eq!(store.get(&unit("u"), "k", Value::Null).unwrap(), Value::Null);
        assert_eq!(store.active_units(), 1);
    }

    #[test]
    fn snapshot_is_a_detached_copy() {
        let store = ContextStore::new();
        store.create(&unit("u")).unwrap();
        store.set(&unit("u"), "a", 1).unwrap();

        let snap = store.snapshot(&unit("u")).unwrap();
        store.set(&unit("u"), "b", 2).unwrap();

        assert_eq!(snap.len(), 1);
        assert_eq!(store.snapshot(&unit("u")).unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_units_stay_isolated() {
        let store = Arc::new(ContextStore::new());

        let mut joins = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            joins.push(tokio::spawn(async move {
                let me = UnitId::current().unwrap();
                store.create(&me).unwrap();
                store.set(&me, "n", i).unwrap();
                tokio::task::yield_now().await;
                let seen = store.get(&me, "n", Value::Null).unwrap();
                store.destroy(&me).unwrap();
                seen
            }));
        }

        for (i, join) in joins.into_iter().enumerate() {
            assert_eq!(join.await.unwrap(), json!(i));
        }
        assert_eq!(store.active_units(), 0);
    }
}
