// ---------------------------------------------------------------------------
// Result Cache: TTL and size bounded ranked lists
// ---------------------------------------------------------------------------
//
// Keeps previously computed ranked lists keyed by subject id. An entry is a
// hit only while its list is non-empty and younger than the TTL; expired
// entries are detected lazily, never swept. When the entry count exceeds the
// capacity, the entry with the oldest write is evicted, one at a time, until
// the cache is back at capacity. Equal write times evict the earlier write.
//
// Every key carries a generation that `invalidate` bumps, and `clear` moves
// the whole cache to a new epoch. A writer that read the generation before
// computing a list stores it with `put_if_current`, which refuses the write
// once the generation has moved.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::time::Duration;

use crate::current_timestamp_secs;
use crate::types::ScoredItem;

#[derive(Debug, Clone)]
struct CacheRecord {
	items: Vec<ScoredItem>,
	/// Seconds since the Unix epoch.
	written_at: u64,
	/// Monotonic write counter, breaks ties between equal `written_at`.
	seq: u64,
}

/// Snapshot of a key's invalidation state, taken before a list is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
	epoch: u64,
	count: u64,
}

// ---------------------------------------------------------------------------
// ResultCache
// ---------------------------------------------------------------------------

pub struct ResultCache {
	capacity: usize,
	ttl_secs: u64,
	entries: HashMap<String, CacheRecord>,
	next_seq: u64,
	/// Invalidation counts, kept apart from `entries` so eviction and
	/// invalidation of absent keys still advance them.
	generations: HashMap<String, u64>,
	epoch: u64,
}

impl ResultCache {
	pub fn new(capacity: usize, ttl: Duration) -> Self {
		Self {
			capacity,
			ttl_secs: ttl.as_secs(),
			entries: HashMap::new(),
			next_seq: 0,
			generations: HashMap::new(),
			epoch: 0,
		}
	}

	pub fn get(&self, key: &str) -> Option<&[ScoredItem]> {
		self.get_at(key, current_timestamp_secs())
	}

	/// Cached list for `key` if it is non-empty and still fresh at `now`.
	pub fn get_at(&self, key: &str, now: u64) -> Option<&[ScoredItem]> {
		let record = self.entries.get(key)?;
		if record.items.is_empty() {
			return None;
		}
		if now.saturating_sub(record.written_at) >= self.ttl_secs {
			return None;
		}
		Some(&record.items)
	}

	pub fn put(&mut self, key: &str, items: Vec<ScoredItem>) -> Vec<String> {
		self.put_at(key, items, current_timestamp_secs())
	}

	/// Store or overwrite `key` as written at `now`, then trim. Returns the
	/// evicted keys, oldest first.
	pub fn put_at(&mut self, key: &str, items: Vec<ScoredItem>, now: u64) -> Vec<String> {
		let seq = self.next_seq;
		self.next_seq += 1;
		self.entries.insert(
			key.to_string(),
			CacheRecord {
				items,
				written_at: now,
				seq,
			},
		);
		self.trim()
	}

	/// Current generation of `key`.
	pub fn generation(&self, key: &str) -> Generation {
		Generation {
			epoch: self.epoch,
			count: self.generations.get(key).copied().unwrap_or(0),
		}
	}

	pub fn put_if_current(&mut self, key: &str, items: Vec<ScoredItem>, seen: Generation) -> Option<Vec<String>> {
		self.put_at_if_current(key, items, seen, current_timestamp_secs())
	}

	/// `put_at`, unless `key` was invalidated or the cache cleared since
	/// `seen` was read. Returns `None` when the write is refused.
	pub fn put_at_if_current(
		&mut self,
		key: &str,
		items: Vec<ScoredItem>,
		seen: Generation,
		now: u64,
	) -> Option<Vec<String>> {
		if self.generation(key) != seen {
			return None;
		}
		Some(self.put_at(key, items, now))
	}

	/// Empty the cached list for `key` while keeping the entry, and bump its
	/// generation. Returns false if there was no entry.
	pub fn invalidate(&mut self, key: &str) -> bool {
		*self.generations.entry(key.to_string()).or_insert(0) += 1;
		match self.entries.get_mut(key) {
			Some(record) => {
				record.items.clear();
				true
			}
			None => false,
		}
	}

	/// Evict oldest entries until the count is within capacity.
	pub fn trim(&mut self) -> Vec<String> {
		let mut evicted = Vec::new();
		while self.entries.len() > self.capacity {
			match self.evict_oldest() {
				Some(key) => evicted.push(key),
				None => break,
			}
		}
		evicted
	}

	fn evict_oldest(&mut self) -> Option<String> {
		let oldest = self
			.entries
			.iter()
			.min_by_key(|(_, record)| (record.written_at, record.seq))
			.map(|(key, _)| key.clone())?;
		self.entries.remove(&oldest);
		tracing::debug!(key = %oldest, "Evicted oldest cache entry");
		Some(oldest)
	}

	pub fn clear(&mut self) {
		self.entries.clear();
		self.generations.clear();
		self.epoch += 1;
	}

	/// Number of entries, including invalidated and expired ones.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn ttl_secs(&self) -> u64 {
		self.ttl_secs
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	const TTL: u64 = 24 * 60 * 60;
	const T: u64 = 1_700_000_000;

	fn new_cache(capacity: usize) -> ResultCache {
		ResultCache::new(capacity, Duration::from_secs(TTL))
	}

	fn list(ids: &[&str]) -> Vec<ScoredItem> {
		ids.iter()
			.enumerate()
			.map(|(i, id)| ScoredItem::new(*id, 1.0 - i as f64 * 0.1))
			.collect()
	}

	// -- validity tests -------------------------------------------------------

	#[test]
	fn put_and_get() {
		let mut cache = new_cache(10);
		cache.put_at("u1", list(&["a", "b"]), T);
		let hit = cache.get_at("u1", T).unwrap();
		assert_eq!(hit.len(), 2);
		assert_eq!(hit[0].item_id, "a");
	}

	#[test]
	fn get_miss_returns_none() {
		let cache = new_cache(10);
		assert!(cache.get_at("missing", T).is_none());
	}

	#[test]
	fn fresh_until_ttl_then_miss() {
		let mut cache = new_cache(10);
		cache.put_at("u1", list(&["a"]), T);
		assert!(cache.get_at("u1", T + TTL - 1).is_some());
		assert!(cache.get_at("u1", T + TTL).is_none());
		assert!(cache.get_at("u1", T + TTL + 1).is_none());
		// Expiry is lazy: the entry still occupies a slot.
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn empty_list_is_a_miss() {
		let mut cache = new_cache(10);
		cache.put_at("u1", Vec::new(), T);
		assert!(cache.get_at("u1", T).is_none());
	}

	#[test]
	fn overwrite_refreshes_timestamp() {
		let mut cache = new_cache(10);
		cache.put_at("u1", list(&["a"]), T);
		cache.put_at("u1", list(&["b"]), T + TTL);
		let hit = cache.get_at("u1", T + TTL + 10).unwrap();
		assert_eq!(hit[0].item_id, "b");
		assert_eq!(cache.len(), 1);
	}

	// -- invalidation tests ---------------------------------------------------

	#[test]
	fn invalidate_clears_list_but_keeps_entry() {
		let mut cache = new_cache(10);
		cache.put_at("u1", list(&["a"]), T);
		assert!(cache.invalidate("u1"));
		assert!(cache.get_at("u1", T).is_none());
		assert_eq!(cache.len(), 1);
		assert!(!cache.invalidate("u2"));
	}

	#[test]
	fn invalidate_refuses_write_from_older_generation() {
		let mut cache = new_cache(10);
		let seen = cache.generation("u1");
		cache.invalidate("u1");
		assert!(cache.put_at_if_current("u1", list(&["a"]), seen, T).is_none());
		assert!(cache.get_at("u1", T).is_none());
		assert!(cache.is_empty());

		let seen = cache.generation("u1");
		assert!(cache.put_at_if_current("u1", list(&["a"]), seen, T).is_some());
		assert!(cache.get_at("u1", T).is_some());
	}

	#[test]
	fn invalidating_other_key_keeps_generation() {
		let mut cache = new_cache(10);
		let seen = cache.generation("u1");
		cache.invalidate("u2");
		assert_eq!(cache.generation("u1"), seen);
		assert!(cache.put_at_if_current("u1", list(&["a"]), seen, T).is_some());
	}

	#[test]
	fn clear_refuses_write_from_before_clear() {
		let mut cache = new_cache(10);
		let seen = cache.generation("u1");
		cache.clear();
		assert!(cache.put_at_if_current("u1", list(&["a"]), seen, T).is_none());
		assert!(cache.is_empty());
	}

	// -- eviction tests -------------------------------------------------------

	#[test]
	fn evicts_oldest_timestamp() {
		let mut cache = new_cache(3);
		cache.put_at("b", list(&["x"]), T + 2);
		cache.put_at("a", list(&["x"]), T);
		cache.put_at("c", list(&["x"]), T + 3);
		let evicted = cache.put_at("d", list(&["x"]), T + 4);
		assert_eq!(evicted, vec!["a".to_string()]);
		assert_eq!(cache.len(), 3);
		assert!(cache.get_at("a", T + 4).is_none());
		assert!(cache.get_at("b", T + 4).is_some());
	}

	#[test]
	fn equal_timestamps_evict_earlier_write() {
		let mut cache = new_cache(2);
		cache.put_at("z", list(&["x"]), T);
		cache.put_at("y", list(&["x"]), T);
		let evicted = cache.put_at("x", list(&["x"]), T);
		assert_eq!(evicted, vec!["z".to_string()]);
	}

	#[test]
	fn invalidated_entries_count_toward_capacity() {
		let mut cache = new_cache(2);
		cache.put_at("a", list(&["x"]), T);
		cache.put_at("b", list(&["x"]), T + 1);
		cache.invalidate("a");
		let evicted = cache.put_at("c", list(&["x"]), T + 2);
		assert_eq!(evicted, vec!["a".to_string()]);
	}

	#[test]
	fn trim_is_noop_within_capacity() {
		let mut cache = new_cache(2);
		cache.put_at("a", list(&["x"]), T);
		assert!(cache.trim().is_empty());
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn clear_empties_cache() {
		let mut cache = new_cache(2);
		cache.put_at("a", list(&["x"]), T);
		cache.clear();
		assert!(cache.is_empty());
	}
}
