//! Memo table for one kind of analysis.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// Results keyed by declaration id (plus context). An entry is computed at
/// most once and never evicted; `pending` holds keys whose computation is
/// on the stack, so a self-referential declaration is caught instead of
/// recursing forever.
#[derive(Debug)]
pub struct AnalysisCache<K, V> {
    name: &'static str,
    entries: HashMap<K, Rc<V>>,
    pending: HashSet<K>,
    computations: usize,
}

impl<K, V> AnalysisCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
            pending: HashSet::new(),
            computations: 0,
        }
    }

    pub fn get(&self, key: &K) -> Option<Rc<V>> {
        let hit = self.entries.get(key).cloned();
        if hit.is_some() {
            tracing::trace!(cache = self.name, ?key, "hit");
        }
        hit
    }

    /// Mark `key` as being computed. Returns false if it already is.
    pub fn begin(&mut self, key: K) -> bool {
        tracing::trace!(cache = self.name, ?key, "miss");
        self.pending.insert(key)
    }

    pub fn finish(&mut self, key: K, value: V) -> Rc<V> {
        self.pending.remove(&key);
        self.computations += 1;
        let value = Rc::new(value);
        self.entries.insert(key, Rc::clone(&value));
        value
    }

    /// Drop the pending mark after a failed computation
    pub fn abandon(&mut self, key: &K) {
        self.pending.remove(key);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of constructor runs so far
    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
