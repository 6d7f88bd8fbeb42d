// ---------------------------------------------------------------------------
// Recommender: facade over profiles, candidates, scoring, and cache
// ---------------------------------------------------------------------------
//
// Profile Store and Result Cache are independently locked. A read checks the
// cache under a shared lock; on a miss, candidates are selected under the
// profile read lock, both locks are released while the ranking backend runs,
// and the cache write lock is taken only to store the result. Concurrent
// misses for one key may both call the backend; the last write wins. A
// result computed before an interaction invalidated the user's entry is
// returned to its caller but never stored.
//
// Backend errors, timeouts, and panics all collapse to an empty list and
// leave the cache untouched.
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::FutureExt;

use crate::backend::RankingBackend;
use crate::bloom::BloomFilter;
use crate::cache::ResultCache;
use crate::candidates;
use crate::config::RecommenderConfig;
use crate::current_timestamp_secs;
use crate::error::{RecommenderError, Result};
use crate::profile::ProfileStore;
use crate::similarity::{rank_top_n, score, weighted_score};
use crate::types::{NewItem, RecommenderStats, ScoredItem};

pub struct Recommender {
	config: RecommenderConfig,
	profiles: RwLock<ProfileStore>,
	cache: RwLock<ResultCache>,
	backend: Arc<dyn RankingBackend>,
}

impl Recommender {
	pub fn new(config: RecommenderConfig, backend: Arc<dyn RankingBackend>) -> Result<Self> {
		config.validate()?;
		let dims = config.filter_dimensions()?;
		Ok(Self {
			profiles: RwLock::new(ProfileStore::new(dims, config.interaction_window_secs)),
			cache: RwLock::new(ResultCache::new(config.cache_capacity, config.cache_ttl())),
			backend,
			config,
		})
	}

	pub fn config(&self) -> &RecommenderConfig {
		&self.config
	}

	// Poisoning is ignored: no write path panics midway through a map update.
	fn profiles_read(&self) -> RwLockReadGuard<'_, ProfileStore> {
		self.profiles.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn profiles_write(&self) -> RwLockWriteGuard<'_, ProfileStore> {
		self.profiles.write().unwrap_or_else(PoisonError::into_inner)
	}

	fn cache_read(&self) -> RwLockReadGuard<'_, ResultCache> {
		self.cache.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn cache_write(&self) -> RwLockWriteGuard<'_, ResultCache> {
		self.cache.write().unwrap_or_else(PoisonError::into_inner)
	}

	// -- writes ---------------------------------------------------------------

	/// Add or replace a catalog item. Cached lists are not invalidated; only
	/// the size bound is re-applied.
	pub fn add_item(&self, item: NewItem) {
		let id = item.id.clone();
		self.profiles_write().record_item(item);
		let evicted = self.cache_write().trim();
		tracing::debug!(item = %id, evicted = evicted.len(), "Item recorded");
	}

	/// Record an interaction and drop the user's cached list so the next
	/// read recomputes it.
	pub fn add_user_interaction(
		&self,
		user_id: &str,
		item_id: &str,
		interaction_type: &str,
		timestamp: u64,
	) {
		self.profiles_write()
			.record_interaction(user_id, item_id, interaction_type, timestamp);

		let mut cache = self.cache_write();
		cache.invalidate(user_id);
		cache.trim();
		tracing::debug!(user = %user_id, item = %item_id, kind = %interaction_type, "Interaction recorded");
	}

	pub fn clear(&self) {
		self.profiles_write().clear();
		self.cache_write().clear();
		tracing::info!("Recommender state cleared");
	}

	// -- reads ----------------------------------------------------------------

	/// Context-driven recommendations ranked by the external backend.
	///
	/// Cold-start users get an empty list without a backend call. Backend
	/// output is limited to the offered candidates, without duplicates, so
	/// items the user has already seen never come back.
	pub async fn recommend(&self, user_id: &str, context: &str, n: usize) -> Vec<ScoredItem> {
		let (cached, generation) = {
			let cache = self.cache_read();
			let hit = cache
				.get(user_id)
				.map(|hit| hit.iter().take(n).cloned().collect::<Vec<_>>());
			(hit, cache.generation(user_id))
		};
		if let Some(hit) = cached {
			tracing::debug!(user = %user_id, returned = hit.len(), "Cache hit");
			return hit;
		}

		let candidates = {
			let profiles = self.profiles_read();
			let Some(filter) = profiles.user_filter(user_id) else {
				tracing::debug!(user = %user_id, "Unknown user, no recommendations");
				return Vec::new();
			};
			candidates::for_user(&profiles, filter, context)
		};
		tracing::debug!(user = %user_id, candidates = candidates.len(), "Cache miss");

		if candidates.is_empty() {
			return Vec::new();
		}

		// Each offered id may appear once, at its first position.
		let mut offered: HashSet<&str> = candidates.iter().map(String::as_str).collect();
		let ranked: Vec<ScoredItem> = self
			.rank_with_backend(context, &candidates, n)
			.await
			.into_iter()
			.filter(|item| offered.remove(item.item_id.as_str()))
			.take(n)
			.collect();

		if ranked.is_empty() {
			return ranked;
		}

		match self.cache_write().put_if_current(user_id, ranked.clone(), generation) {
			Some(evicted) if !evicted.is_empty() => {
				tracing::debug!(evicted = ?evicted, "Cache trimmed");
			}
			Some(_) => {}
			None => {
				tracing::debug!(user = %user_id, "Entry invalidated during ranking, result not cached");
			}
		}
		ranked
	}

	/// `recommend` for several users with a shared context.
	pub async fn recommend_batch<I, S>(&self, user_ids: I, context: &str, n: usize) -> BTreeMap<String, Vec<ScoredItem>>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut results = BTreeMap::new();
		for user_id in user_ids {
			let user_id = user_id.as_ref();
			let ranked = self.recommend(user_id, context, n).await;
			results.insert(user_id.to_string(), ranked);
		}
		results
	}

	/// Items whose feature/category filters overlap most with `item_id`'s,
	/// scored locally with temporal weighting.
	pub fn similar_items(&self, item_id: &str, n: usize) -> Vec<ScoredItem> {
		let profiles = self.profiles_read();
		let Some(item) = profiles.item(item_id) else {
			return Vec::new();
		};
		let candidates = candidates::for_item(&profiles, item_id);
		score_candidates(&profiles, &item.filter, candidates, n, current_timestamp_secs())
	}

	/// Backend-free recommendations: every unseen item scored by overlap
	/// with the user's filter, with temporal weighting.
	pub fn recommend_by_profile(&self, user_id: &str, n: usize) -> Vec<ScoredItem> {
		let now = current_timestamp_secs();
		let profiles = self.profiles_read();
		let Some(filter) = profiles.user_filter(user_id) else {
			return Vec::new();
		};
		let history = profiles.history_at(user_id, now);
		let candidates = candidates::unseen(&profiles, &history);
		score_candidates(&profiles, filter, candidates, n, now)
	}

	pub fn stats(&self) -> RecommenderStats {
		let (users, items, retained_interactions) = {
			let profiles = self.profiles_read();
			(profiles.user_count(), profiles.item_count(), profiles.interaction_count())
		};
		RecommenderStats {
			users,
			items,
			cached_entries: self.cache_read().len(),
			retained_interactions,
		}
	}

	// -- backend --------------------------------------------------------------

	async fn rank_with_backend(&self, context: &str, candidates: &[String], n: usize) -> Vec<ScoredItem> {
		let timeout = self.config.backend_timeout();
		let call = AssertUnwindSafe(self.backend.generate(context, candidates, n)).catch_unwind();

		let outcome = match tokio::time::timeout(timeout, call).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(RecommenderError::Backend("ranking backend panicked".into())),
			Err(_) => Err(RecommenderError::BackendTimeout(timeout)),
		};
		outcome.unwrap_or_else(|e| {
			tracing::warn!(code = e.code(), error = %e, "Ranking backend failed, returning no results");
			Vec::new()
		})
	}
}

fn score_candidates(
	profiles: &ProfileStore,
	subject: &BloomFilter,
	candidates: Vec<String>,
	n: usize,
	now: u64,
) -> Vec<ScoredItem> {
	let window = profiles.window_secs();
	let scored = candidates
		.into_iter()
		.filter_map(|id| {
			let other = profiles.item(&id)?;
			let raw = match score(subject, &other.filter) {
				Ok(raw) => raw,
				Err(e) => {
					tracing::warn!(item = %id, error = %e, "Skipping incomparable item");
					return None;
				}
			};
			let weighted = weighted_score(raw, profiles.latest_interaction(&id, now), now, window);
			Some(ScoredItem::new(id, weighted))
		})
		.collect();
	rank_top_n(scored, n)
}
