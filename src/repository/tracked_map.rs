use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a sweep callback did with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    Keep,
    Changed,
    Remove,
}

/// Map of records keyed by a string with a dirty flag for the snapshot writer.
/// Every write goes through a closure over one entry, so updates of the same
/// key are serialized and never observe a half applied change.
pub struct TrackedMap<V> {
    entries: DashMap<String, V>,
    dirty: AtomicBool,
}

impl<V: Clone> Default for TrackedMap<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            dirty: AtomicBool::new(false),
        }
    }
}

impl<V: Clone> TrackedMap<V> {
    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Reads one entry without cloning it.
    pub fn read<R>(&self, key: &str, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.entries.get(key).map(|entry| f(entry.value()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Runs `f` on the entry for `key`, creating it with `init` first if missing.
    pub fn update<R>(&self, key: &str, init: impl FnOnce() -> V, f: impl FnOnce(&mut V) -> R) -> R {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(init);
        let result = f(entry.value_mut());
        drop(entry);
        self.mark_dirty();
        result
    }

    /// Runs `f` on an existing entry only.
    pub fn update_existing<R>(&self, key: &str, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let result = self.entries.get_mut(key).map(|mut entry| f(entry.value_mut()));
        if result.is_some() {
            self.mark_dirty();
        }
        result
    }

    pub fn insert(&self, key: &str, value: V) -> Option<V> {
        let old = self.entries.insert(key.to_string(), value);
        self.mark_dirty();
        old
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        let removed = self.entries.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.mark_dirty();
        }
        removed
    }

    /// Removes the entry only while `predicate` holds, checked under the entry lock.
    pub fn remove_if(&self, key: &str, predicate: impl FnOnce(&V) -> bool) -> Option<V> {
        let removed = self.entries.remove_if(key, |_, v| predicate(v)).map(|(_, v)| v);
        if removed.is_some() {
            self.mark_dirty();
        }
        removed
    }

    /// Inserts `value` unless the key is taken. Returns true if inserted.
    pub fn insert_if_absent(&self, key: &str, value: V) -> bool {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                self.mark_dirty();
                true
            }
        }
    }

    /// Keeps entries for which `f` returns true. Returns the number of removed entries.
    pub fn retain(&self, mut f: impl FnMut(&str, &V) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, value| f(key, value));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    /// Like [`Self::retain`], but `f` may also modify the entries it keeps.
    /// The map only turns dirty if an entry was changed or removed.
    pub fn retain_mut(&self, mut f: impl FnMut(&str, &mut V) -> SweepAction) -> usize {
        let mut changed = false;
        let mut removed = 0;
        self.entries.retain(|key, value| match f(key, value) {
            SweepAction::Keep => true,
            SweepAction::Changed => {
                changed = true;
                true
            }
            SweepAction::Remove => {
                removed += 1;
                false
            }
        });
        if changed || removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    pub fn values(&self) -> Vec<V> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears the dirty flag and returns a copy of all values, or `None` if
    /// nothing changed since the last call. Writes racing with the copy set the
    /// flag again and are picked up by the next snapshot.
    pub fn take_snapshot(&self) -> Option<Vec<V>> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            Some(self.values())
        } else {
            None
        }
    }

    /// Marks the map dirty again after a failed write.
    pub fn restore_dirty(&self) {
        self.mark_dirty();
    }

    /// Replaces the content with loaded entries, leaving the map clean.
    pub fn load(&self, entries: impl IntoIterator<Item=(String, V)>) {
        self.entries.clear();
        for (key, value) in entries {
            self.entries.insert(key, value);
        }
        self.dirty.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::{SweepAction, TrackedMap};
    use std::sync::Arc;

    #[test]
    fn test_update_marks_dirty() {
        let map: TrackedMap<u32> = TrackedMap::default();
        assert!(!map.is_dirty());
        let value = map.update("a", || 0, |v| { *v += 1; *v });
        assert_eq!(value, 1);
        assert!(map.is_dirty());
        assert_eq!(map.take_snapshot(), Some(vec![1]));
        assert!(!map.is_dirty());
        assert_eq!(map.take_snapshot(), None);
        assert!(map.update_existing("missing", |v| *v += 1).is_none());
        assert!(!map.is_dirty());
    }

    #[test]
    fn test_retain_counts_removed() {
        let map: TrackedMap<u32> = TrackedMap::default();
        for (idx, key) in ["a", "b", "c"].iter().enumerate() {
            map.insert(key, u32::try_from(idx).unwrap());
        }
        let removed = map.retain(|_, v| *v != 1);
        assert_eq!(removed, 1);
        assert_eq!(map.len(), 2);
        assert!(!map.insert_if_absent("a", 7));
        assert_eq!(map.get("a"), Some(0));
        assert!(map.remove_if("a", |v| *v == 5).is_none());
        assert_eq!(map.remove_if("a", |v| *v == 0), Some(0));
    }

    #[test]
    fn test_retain_mut_only_dirty_on_change() {
        let map: TrackedMap<u32> = TrackedMap::default();
        map.insert("a", 1);
        map.insert("b", 2);
        assert!(map.take_snapshot().is_some());

        assert_eq!(map.retain_mut(|_, _| SweepAction::Keep), 0);
        assert!(!map.is_dirty());

        assert_eq!(map.retain_mut(|key, v| if key == "a" { *v = 5; SweepAction::Changed } else { SweepAction::Keep }), 0);
        assert!(map.is_dirty());
        assert!(map.take_snapshot().is_some());

        assert_eq!(map.retain_mut(|_, v| if *v == 2 { SweepAction::Remove } else { SweepAction::Keep }), 1);
        assert!(map.is_dirty());
        assert_eq!(map.get("a"), Some(5));
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let map: Arc<TrackedMap<u64>> = Arc::new(TrackedMap::default());
        let handles: Vec<_> = (0..8).map(|_| {
            let map = Arc::clone(&map);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    map.update("counter", || 0, |v| *v += 1);
                }
            })
        }).collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(map.get("counter"), Some(8_000));
    }
}
