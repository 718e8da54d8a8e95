//! # FlowGraph Context
//!
//! The data that travels through a flow run: the caller-owned [`SharedStore`],
//! the per-run [`Params`] scope and the [`NodeContext`] handed to every
//! lifecycle phase of a node.

mod params;

pub use params::Params;

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Mutable key-value store shared by every node of a run.
///
/// Cloning the handle is cheap and every clone sees the same data. Each
/// method holds the internal lock only for its own duration, so two calls
/// made by concurrently running nodes are not atomic as a pair: keep the
/// writes of parallel batch items on disjoint keys.
#[derive(Clone)]
pub struct SharedStore {
    trace_id: Arc<str>,
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStore")
            .field("trace_id", &self.trace_id)
            .field("keys", &self.len())
            .finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for SharedStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let store = Self::new();
        store.write(|values| {
            values.extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())))
        });
        store
    }
}

impl SharedStore {
    /// Creates an empty store with a fresh trace id.
    pub fn new() -> Self {
        Self::with_trace_id(Uuid::new_v4().to_string())
    }

    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: Arc::from(trace_id.into()),
            values: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Correlation id attached to every log line of runs over this store.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read(|values| values.get(key).cloned())
    }

    /// Returns the value under `key` if it is a JSON string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.read(|values| {
            values.get(key).and_then(Value::as_str).map(str::to_owned)
        })
    }

    /// Inserts a value, returning the one it replaced.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        let key = key.into();
        tracing::trace!(trace_id = %self.trace_id, key = %key, "set shared value");
        self.write(|values| values.insert(key, value.into()))
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write(|values| values.remove(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.read(|values| values.contains_key(key))
    }

    /// Mutates the value under `key` in place, inserting `null` first when
    /// the key is absent.
    pub fn update<F>(&self, key: impl Into<String>, f: F)
    where
        F: FnOnce(&mut Value),
    {
        self.write(|values| f(values.entry(key.into()).or_insert(Value::Null)))
    }

    /// Runs `f` with shared access to the whole map.
    pub fn read<R>(&self, f: impl FnOnce(&HashMap<String, Value>) -> R) -> R {
        let guard = self.values.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Runs `f` with exclusive access to the whole map.
    pub fn write<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Value>) -> R,
    ) -> R {
        let mut guard =
            self.values.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Copies the current contents out of the store.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.read(HashMap::clone)
    }

    pub fn len(&self) -> usize {
        self.read(HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(HashMap::is_empty)
    }
}

/// Run-scoped state of a single node lifecycle.
///
/// Built fresh every time a node runs and re-derived for each execute
/// attempt, so nothing here outlives the lifecycle it belongs to.
#[derive(Debug, Clone)]
pub struct NodeContext {
    node: Arc<str>,
    trace_id: Arc<str>,
    params: Arc<Params>,
    attempt: usize,
    max_attempts: usize,
}

impl NodeContext {
    pub fn new(
        node: &str,
        trace_id: &str,
        params: Params,
        max_attempts: usize,
    ) -> Self {
        Self {
            node: Arc::from(node),
            trace_id: Arc::from(trace_id),
            params: Arc::new(params),
            attempt: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Same context, positioned at the given zero-based attempt.
    pub fn for_attempt(&self, attempt: usize) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Effective parameters of this run.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Zero-based index of the current execute attempt.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn is_last_attempt(&self) -> bool {
        self.attempt + 1 >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_clones_share_data() {
        let store = SharedStore::new();
        let other = store.clone();

        other.set("data", "abc");
        assert_eq!(store.get_str("data").as_deref(), Some("abc"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.trace_id(), other.trace_id());
    }

    #[test]
    fn test_store_update_inserts_missing_key() {
        let store = SharedStore::with_trace_id("trace-1");
        store.update("results", |value| {
            if value.is_null() {
                *value = json!({});
            }
            value["1"] = json!("done");
        });

        assert_eq!(store.get("results"), Some(json!({ "1": "done" })));
        assert_eq!(store.trace_id(), "trace-1");
    }

    #[test]
    fn test_store_from_iter_and_remove() {
        let store: SharedStore =
            [("a", json!(1)), ("b", json!(2))].into_iter().collect();

        assert!(store.contains_key("a"));
        assert_eq!(store.remove("a"), Some(json!(1)));
        assert!(!store.contains_key("a"));
        assert_eq!(store.snapshot().len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_node_context_attempts() {
        let ctx = NodeContext::new(
            "summarize",
            "trace",
            Params::from([("id", json!(7))]),
            3,
        );
        assert_eq!(ctx.attempt(), 0);
        assert!(!ctx.is_last_attempt());

        let last = ctx.for_attempt(2);
        assert_eq!(last.attempt(), 2);
        assert!(last.is_last_attempt());
        assert_eq!(last.param("id"), Some(&json!(7)));
        assert_eq!(last.node(), "summarize");
    }

    #[test]
    fn test_node_context_clamps_max_attempts() {
        let ctx = NodeContext::new("n", "t", Params::new(), 0);
        assert_eq!(ctx.max_attempts(), 1);
        assert!(ctx.is_last_attempt());
    }
}
