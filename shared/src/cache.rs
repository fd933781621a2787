use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    UnknownKey,
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::UnknownKey => write!(f, "unknown cache key"),
        }
    }
}

impl std::error::Error for CacheError {}

#[derive(Debug)]
pub enum Slot<T> {
    Pending,
    Ready(Rc<T>),
    Failed(String),
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        match self {
            Slot::Pending => Slot::Pending,
            Slot::Ready(v) => Slot::Ready(Rc::clone(v)),
            Slot::Failed(e) => Slot::Failed(e.clone()),
        }
    }
}

/// What a new holder of a key has to do.
#[derive(Debug)]
pub enum Acquire<T> {
    /// Nobody is fetching this resource yet; the caller must start the fetch.
    Fetch,
    /// Another holder already started the fetch.
    Pending,
    Ready(Rc<T>),
}

#[derive(Debug)]
struct Entry<T> {
    slot: Slot<T>,
    holders: u32,
}

/// Shared assets keyed by resource path, reference-counted by holder.
///
/// Each panel or layer acquires the paths it needs and releases them when it
/// no longer shows them; the last release evicts the entry. Entries live in a
/// `BTreeMap` for stable iteration order.
#[derive(Debug)]
pub struct ResourceCache<T> {
    entries: BTreeMap<String, Entry<T>>,
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a holder. A failed entry is reset so the new holder retries.
    pub fn acquire(&mut self, key: &str) -> Acquire<T> {
        let Some(entry) = self.entries.get_mut(key) else {
            self.entries.insert(
                key.to_string(),
                Entry {
                    slot: Slot::Pending,
                    holders: 1,
                },
            );
            return Acquire::Fetch;
        };
        entry.holders += 1;
        match &entry.slot {
            Slot::Ready(v) => Acquire::Ready(Rc::clone(v)),
            Slot::Pending => Acquire::Pending,
            Slot::Failed(_) => {
                entry.slot = Slot::Pending;
                Acquire::Fetch
            }
        }
    }

    pub fn complete(&mut self, key: &str, value: T) -> Result<Rc<T>, CacheError> {
        let entry = self.entries.get_mut(key).ok_or(CacheError::UnknownKey)?;
        let value = Rc::new(value);
        entry.slot = Slot::Ready(Rc::clone(&value));
        Ok(value)
    }

    pub fn fail(&mut self, key: &str, error: impl Into<String>) -> Result<(), CacheError> {
        let entry = self.entries.get_mut(key).ok_or(CacheError::UnknownKey)?;
        entry.slot = Slot::Failed(error.into());
        Ok(())
    }

    /// Drop one holder. Returns `true` when that evicted the entry.
    pub fn release(&mut self, key: &str) -> Result<bool, CacheError> {
        let entry = self.entries.get_mut(key).ok_or(CacheError::UnknownKey)?;
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders == 0 {
            self.entries.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    pub fn get(&self, key: &str) -> Option<Rc<T>> {
        match &self.entries.get(key)?.slot {
            Slot::Ready(v) => Some(Rc::clone(v)),
            _ => None,
        }
    }

    pub fn slot(&self, key: &str) -> Option<Slot<T>> {
        self.entries.get(key).map(|e| e.slot.clone())
    }

    pub fn holders(&self, key: &str) -> u32 {
        self.entries.get(key).map_or(0, |e| e.holders)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Holds one extra reference to each of the last `capacity` keys touched, so
/// switching back to a recently shown asset is a cache hit. The oldest key is
/// released when a new one pushes it out.
#[derive(Debug)]
pub struct RecentKeys {
    capacity: usize,
    keys: VecDeque<String>,
}

impl RecentKeys {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            keys: VecDeque::with_capacity(capacity),
        }
    }

    /// Mark `key` as most recently used. The caller must already hold `key`.
    pub fn touch<T>(&mut self, cache: &mut ResourceCache<T>, key: &str) {
        if let Some(pos) = self.keys.iter().position(|k| k == key) {
            if let Some(k) = self.keys.remove(pos) {
                self.keys.push_back(k);
            }
            return;
        }
        if self.capacity == 0 || cache.holders(key) == 0 {
            return;
        }
        let _ = cache.acquire(key);
        self.keys.push_back(key.to_string());
        while self.keys.len() > self.capacity {
            if let Some(oldest) = self.keys.pop_front() {
                let _ = cache.release(&oldest);
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_holder_fetches_later_holders_share() {
        let mut cache: ResourceCache<String> = ResourceCache::new();
        assert!(matches!(cache.acquire("/a.json"), Acquire::Fetch));
        assert!(matches!(cache.acquire("/a.json"), Acquire::Pending));
        assert!(cache.get("/a.json").is_none());

        let v = cache.complete("/a.json", "payload".to_string()).unwrap();
        match cache.acquire("/a.json") {
            Acquire::Ready(shared) => assert!(Rc::ptr_eq(&shared, &v)),
            other => panic!("expected ready, got {other:?}"),
        }
        assert_eq!(cache.holders("/a.json"), 3);
    }

    #[test]
    fn last_release_evicts() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        cache.acquire("k");
        cache.acquire("k");
        cache.complete("k", 7).unwrap();
        assert_eq!(cache.release("k"), Ok(false));
        assert_eq!(cache.get("k").as_deref(), Some(&7));
        assert_eq!(cache.release("k"), Ok(true));
        assert!(cache.is_empty());
        assert_eq!(cache.release("k"), Err(CacheError::UnknownKey));
    }

    #[test]
    fn failure_is_retried_by_next_holder() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        cache.acquire("k");
        cache.fail("k", "HTTP 404").unwrap();
        assert!(matches!(cache.slot("k"), Some(Slot::Failed(e)) if e == "HTTP 404"));
        assert!(matches!(cache.acquire("k"), Acquire::Fetch));
        assert!(matches!(cache.slot("k"), Some(Slot::Pending)));
    }

    #[test]
    fn unknown_keys_are_errors() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        assert_eq!(cache.complete("nope", 1).unwrap_err(), CacheError::UnknownKey);
        assert_eq!(cache.fail("nope", "x"), Err(CacheError::UnknownKey));
    }

    #[test]
    fn recent_keys_survive_their_holder_switching_away() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        let mut recent = RecentKeys::new(2);

        cache.acquire("京都府");
        recent.touch(&mut cache, "京都府");
        cache.complete("京都府", 1).unwrap();
        assert_eq!(cache.release("京都府"), Ok(false));

        cache.acquire("大阪府");
        recent.touch(&mut cache, "大阪府");
        cache.release("大阪府").unwrap();

        assert!(matches!(cache.acquire("京都府"), Acquire::Ready(v) if *v == 1));
        recent.touch(&mut cache, "京都府");
        assert_eq!(recent.len(), 2);
        assert_eq!(cache.holders("京都府"), 2);
    }

    #[test]
    fn oldest_recent_key_is_released_on_overflow() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        let mut recent = RecentKeys::new(2);
        for key in ["a", "b", "c"] {
            cache.acquire(key);
            recent.touch(&mut cache, key);
            cache.release(key).unwrap();
        }
        assert!(!recent.contains("a"));
        assert_eq!(cache.holders("a"), 0);
        assert!(cache.slot("a").is_none());
        assert_eq!(cache.holders("b"), 1);
        assert_eq!(cache.holders("c"), 1);
    }

    #[test]
    fn keys_nobody_holds_are_not_retained() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        let mut recent = RecentKeys::new(4);
        recent.touch(&mut cache, "k");
        assert!(recent.is_empty());
        assert!(cache.is_empty());
    }
}
