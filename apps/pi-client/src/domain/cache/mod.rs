//! Identity-Preserving Entity Cache
//!
//! A keyed store of cached records. The first `add` for a key builds the
//! entity and stores it behind a shared slot; every later `add` for the same
//! key patches that slot in place, so every holder of an [`Entity`] handle
//! observes the update.
//!
//! # Design
//!
//! - One `parking_lot::Mutex` guards the key map of a cache. `add` holds it
//!   across lookup, patch and insert, which keeps "one instance per key"
//!   true under concurrent writers.
//! - Each entity lives in its own `Arc<RwLock<V>>` slot. Readers take the
//!   slot lock only, never the map lock.
//! - Entries are never evicted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

// =============================================================================
// Types
// =============================================================================

/// Identity key of a cached record.
pub type CacheKey = String;

/// Outcome of patching an existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch {
    /// Fields were updated from the raw payload.
    Applied,
    /// The entity does not support in-place updates; it was left untouched.
    Unsupported,
}

/// A record that can be held in an [`EntityCache`].
pub trait CachedEntity: Send + Sync + 'static {
    /// Raw payload the entity is built from.
    type Raw: Send;

    /// Derive the identity key from a raw payload.
    fn cache_key(raw: &Self::Raw) -> CacheKey;

    /// Build a new entity from a raw payload.
    fn build(raw: Self::Raw) -> Self;

    /// Update this entity's fields from a freshly fetched payload.
    fn patch(&mut self, raw: Self::Raw) -> Patch {
        drop(raw);
        Patch::Unsupported
    }
}

/// Result of an [`EntityCache::add`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new entity was built and stored.
    Inserted,
    /// A new entity was built but not stored.
    Detached,
    /// The existing entity was patched in place.
    Patched,
    /// The existing entity was returned unchanged.
    Unchanged,
}

// =============================================================================
// Entity Handle
// =============================================================================

/// Shared handle to a cached entity.
///
/// Cloning the handle never copies the entity; all clones point at the same
/// slot.
pub struct Entity<V> {
    slot: Arc<RwLock<V>>,
}

impl<V> Entity<V> {
    /// Wrap a value in a fresh slot.
    #[must_use]
    pub fn new(value: V) -> Self {
        Self {
            slot: Arc::new(RwLock::new(value)),
        }
    }

    /// Borrow the current value.
    pub fn read(&self) -> RwLockReadGuard<'_, V> {
        self.slot.read()
    }

    /// Run a closure against the current value.
    pub fn with<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.slot.read())
    }

    /// Check whether two handles point at the same cached instance.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    fn apply(&self, raw: V::Raw) -> Patch
    where
        V: CachedEntity,
    {
        self.slot.write().patch(raw)
    }
}

impl<V: Clone> Entity<V> {
    /// Copy the current value out of the slot.
    #[must_use]
    pub fn snapshot(&self) -> V {
        self.slot.read().clone()
    }
}

impl<V> Clone for Entity<V> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Entity<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entity").field(&*self.slot.read()).finish()
    }
}

// =============================================================================
// Entity Cache
// =============================================================================

/// Keyed store of cached entities.
pub struct EntityCache<V> {
    entries: Mutex<HashMap<CacheKey, Entity<V>>>,
}

impl<V: CachedEntity> EntityCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or patch the entity identified by `raw`.
    ///
    /// With `cache` set, an existing entity is patched in place and a new one
    /// is stored. Without it, an existing entity is returned untouched and a
    /// new one is built but not stored.
    pub fn add(&self, raw: V::Raw, cache: bool) -> Entity<V> {
        self.add_with_outcome(raw, cache).0
    }

    /// Same as [`EntityCache::add`], also reporting what happened.
    pub fn add_with_outcome(&self, raw: V::Raw, cache: bool) -> (Entity<V>, AddOutcome) {
        let key = V::cache_key(&raw);
        let mut entries = self.entries.lock();

        if let Some(existing) = entries.get(&key) {
            let outcome = if cache && existing.apply(raw) == Patch::Applied {
                AddOutcome::Patched
            } else {
                AddOutcome::Unchanged
            };
            return (existing.clone(), outcome);
        }

        let entity = Entity::new(V::build(raw));
        if cache {
            entries.insert(key, entity.clone());
            (entity, AddOutcome::Inserted)
        } else {
            (entity, AddOutcome::Detached)
        }
    }

    /// Look up a cached entity without touching the network.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<Entity<V>> {
        self.entries.lock().get(key).cloned()
    }

    /// Check whether a key is cached.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of cached entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Keys of all cached entities.
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl<V: CachedEntity> Default for EntityCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for EntityCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        id: String,
        value: u32,
    }

    impl CachedEntity for Counter {
        type Raw = (String, u32);

        fn cache_key(raw: &Self::Raw) -> CacheKey {
            raw.0.clone()
        }

        fn build(raw: Self::Raw) -> Self {
            Self {
                id: raw.0,
                value: raw.1,
            }
        }

        fn patch(&mut self, raw: Self::Raw) -> Patch {
            self.value = raw.1;
            Patch::Applied
        }
    }

    #[derive(Debug)]
    struct Frozen(u32);

    impl CachedEntity for Frozen {
        type Raw = u32;

        fn cache_key(raw: &Self::Raw) -> CacheKey {
            (raw % 10).to_string()
        }

        fn build(raw: Self::Raw) -> Self {
            Self(raw)
        }
    }

    fn raw(id: &str, value: u32) -> (String, u32) {
        (id.to_string(), value)
    }

    #[test]
    fn add_inserts_new_entity() {
        let cache = EntityCache::<Counter>::new();
        let (entity, outcome) = cache.add_with_outcome(raw("a", 1), true);

        assert_eq!(outcome, AddOutcome::Inserted);
        assert_eq!(entity.read().value, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn add_patches_and_preserves_identity() {
        let cache = EntityCache::<Counter>::new();
        let first = cache.add(raw("a", 1), true);
        let (second, outcome) = cache.add_with_outcome(raw("a", 7), true);

        assert_eq!(outcome, AddOutcome::Patched);
        assert!(first.same_as(&second));
        assert_eq!(first.read().value, 7);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn repeated_adds_return_one_instance() {
        let cache = EntityCache::<Counter>::new();
        let first = cache.add(raw("a", 0), true);

        for value in 1..50 {
            let next = cache.add(raw("a", value), true);
            assert!(first.same_as(&next));
            assert_eq!(first.read().value, value);
        }
    }

    #[test]
    fn add_without_cache_leaves_existing_untouched() {
        let cache = EntityCache::<Counter>::new();
        let first = cache.add(raw("a", 1), true);
        let (second, outcome) = cache.add_with_outcome(raw("a", 9), false);

        assert_eq!(outcome, AddOutcome::Unchanged);
        assert!(first.same_as(&second));
        assert_eq!(first.read().value, 1);
    }

    #[test]
    fn add_without_cache_does_not_store() {
        let cache = EntityCache::<Counter>::new();
        let (entity, outcome) = cache.add_with_outcome(raw("a", 1), false);

        assert_eq!(outcome, AddOutcome::Detached);
        assert_eq!(entity.read().value, 1);
        assert!(cache.is_empty());
        assert!(cache.resolve("a").is_none());
    }

    #[test]
    fn unpatchable_entity_is_returned_unchanged() {
        let cache = EntityCache::<Frozen>::new();
        let first = cache.add(3, true);
        let (second, outcome) = cache.add_with_outcome(13, true);

        assert_eq!(outcome, AddOutcome::Unchanged);
        assert!(first.same_as(&second));
        assert_eq!(second.read().0, 3);
    }

    #[test]
    fn resolve_is_read_only() {
        let cache = EntityCache::<Counter>::new();
        assert!(cache.resolve("missing").is_none());
        assert!(cache.is_empty());

        let stored = cache.add(raw("a", 1), true);
        let resolved = cache.resolve("a").unwrap();
        assert!(stored.same_as(&resolved));
        assert!(cache.contains("a"));
    }

    #[test]
    fn snapshot_copies_current_value() {
        let cache = EntityCache::<Counter>::new();
        let entity = cache.add(raw("a", 1), true);
        let before = entity.snapshot();
        cache.add(raw("a", 2), true);

        assert_eq!(before.value, 1);
        assert_eq!(entity.snapshot().value, 2);
        assert_eq!(entity.with(|c| c.id.clone()), "a");
    }

    #[test]
    fn concurrent_adds_share_one_instance() {
        let cache = Arc::new(EntityCache::<Counter>::new());
        let first = cache.add(raw("shared", 0), true);

        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.add(raw("shared", i), true))
            })
            .collect();

        for handle in handles {
            let entity = handle.join().unwrap();
            assert!(first.same_as(&entity));
        }

        assert_eq!(cache.len(), 1);
        assert!((1..=8).contains(&first.read().value));
    }

    #[test]
    fn concurrent_inserts_of_distinct_keys() {
        let cache = Arc::new(EntityCache::<Counter>::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for j in 0..25 {
                        cache.add(raw(&format!("{i}-{j}"), j), true);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 200);
        assert_eq!(cache.keys().len(), 200);
    }
}
