// ---------------------------------------------------------------------------
// Profile Store: long-lived user and item filters
// ---------------------------------------------------------------------------
//
// Users get a filter over the item ids they touched. Items get a filter over
// their features and categories. Raw interactions are kept only inside a
// trailing window (30 days by default) and purged on every write. Profiles
// live until `clear()`; nothing here expires them.
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::bloom::{BloomFilter, FilterDimensions};
use crate::current_timestamp_secs;
use crate::types::{Interaction, ItemProfile, NewItem};

pub struct ProfileStore {
	dims: FilterDimensions,
	window_secs: u64,
	users: HashMap<String, BloomFilter>,
	/// Ordered by id so catalog scans are reproducible.
	items: BTreeMap<String, ItemProfile>,
	/// Oldest first.
	interactions: Vec<Interaction>,
}

impl ProfileStore {
	pub fn new(dims: FilterDimensions, window_secs: u64) -> Self {
		Self {
			dims,
			window_secs,
			users: HashMap::new(),
			items: BTreeMap::new(),
			interactions: Vec::new(),
		}
	}

	pub fn dimensions(&self) -> FilterDimensions {
		self.dims
	}

	pub fn window_secs(&self) -> u64 {
		self.window_secs
	}

	// -- writes ---------------------------------------------------------------

	pub fn record_interaction(
		&mut self,
		user_id: &str,
		item_id: &str,
		interaction_type: &str,
		timestamp: u64,
	) -> usize {
		self.record_interaction_at(
			user_id,
			item_id,
			interaction_type,
			timestamp,
			current_timestamp_secs(),
		)
	}

	/// Record an interaction, then purge anything older than the window as
	/// seen from `now`. Returns the number of purged interactions.
	pub fn record_interaction_at(
		&mut self,
		user_id: &str,
		item_id: &str,
		interaction_type: &str,
		timestamp: u64,
		now: u64,
	) -> usize {
		let dims = self.dims;
		self.users
			.entry(user_id.to_string())
			.or_insert_with(|| BloomFilter::with_dimensions(dims))
			.add(item_id);

		self.interactions.push(Interaction {
			user_id: user_id.to_string(),
			item_id: item_id.to_string(),
			interaction_type: interaction_type.to_string(),
			timestamp,
		});

		let before = self.interactions.len();
		let window = self.window_secs;
		self.interactions
			.retain(|i| now.saturating_sub(i.timestamp) <= window);
		let purged = before - self.interactions.len();
		if purged > 0 {
			tracing::debug!(purged, retained = self.interactions.len(), "Purged expired interactions");
		}
		purged
	}

	/// Create or replace an item. The filter is fully rebuilt from the new
	/// features and categories.
	pub fn record_item(&mut self, item: NewItem) {
		let dims = self.dims;
		let profile = self
			.items
			.entry(item.id.clone())
			.or_insert_with(|| ItemProfile {
				id: item.id.clone(),
				title: String::new(),
				description: String::new(),
				categories: Vec::new(),
				features: Vec::new(),
				filter: BloomFilter::with_dimensions(dims),
			});

		profile.title = item.title;
		profile.description = item.description;
		profile.categories = item.categories;
		profile.features = item.features;

		profile.filter.clear();
		for term in profile.features.iter().chain(&profile.categories) {
			profile.filter.add(term);
		}
	}

	// -- reads ----------------------------------------------------------------

	pub fn history(&self, user_id: &str) -> HashSet<String> {
		self.history_at(user_id, current_timestamp_secs())
	}

	/// Item ids the user interacted with inside the window ending at `now`.
	pub fn history_at(&self, user_id: &str, now: u64) -> HashSet<String> {
		self.interactions
			.iter()
			.filter(|i| i.user_id == user_id && self.in_window(i.timestamp, now))
			.map(|i| i.item_id.clone())
			.collect()
	}

	/// Timestamp of the most recently recorded in-window interaction with
	/// `item_id`, by any user.
	pub fn latest_interaction(&self, item_id: &str, now: u64) -> Option<u64> {
		self.interactions
			.iter()
			.rev()
			.find(|i| i.item_id == item_id && self.in_window(i.timestamp, now))
			.map(|i| i.timestamp)
	}

	fn in_window(&self, timestamp: u64, now: u64) -> bool {
		now.saturating_sub(timestamp) <= self.window_secs
	}

	pub fn user_filter(&self, user_id: &str) -> Option<&BloomFilter> {
		self.users.get(user_id)
	}

	pub fn item(&self, item_id: &str) -> Option<&ItemProfile> {
		self.items.get(item_id)
	}

	/// All items in ascending id order.
	pub fn items(&self) -> impl Iterator<Item = &ItemProfile> {
		self.items.values()
	}

	pub fn user_count(&self) -> usize {
		self.users.len()
	}

	pub fn item_count(&self) -> usize {
		self.items.len()
	}

	pub fn interaction_count(&self) -> usize {
		self.interactions.len()
	}

	pub fn clear(&mut self) {
		self.users.clear();
		self.items.clear();
		self.interactions.clear();
	}
}
