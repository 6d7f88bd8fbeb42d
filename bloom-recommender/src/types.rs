use serde::{Deserialize, Serialize};

use crate::bloom::BloomFilter;

/// One ranked result: an item id and its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
	#[serde(rename = "itemId")]
	pub item_id: String,
	pub score: f64,
}

impl ScoredItem {
	pub fn new(item_id: impl Into<String>, score: f64) -> Self {
		Self {
			item_id: item_id.into(),
			score,
		}
	}
}

/// A user/item interaction retained inside the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
	#[serde(rename = "userId")]
	pub user_id: String,
	#[serde(rename = "itemId")]
	pub item_id: String,
	#[serde(rename = "interactionType")]
	pub interaction_type: String,
	/// Seconds since the Unix epoch.
	pub timestamp: u64,
}

/// Catalog entry plus the filter built over its features and categories.
#[derive(Debug, Clone)]
pub struct ItemProfile {
	pub id: String,
	pub title: String,
	pub description: String,
	pub categories: Vec<String>,
	pub features: Vec<String>,
	pub filter: BloomFilter,
}

impl ItemProfile {
	/// Features followed by categories, in insertion order.
	pub fn terms(&self) -> impl Iterator<Item = &str> {
		self.features
			.iter()
			.chain(&self.categories)
			.map(String::as_str)
	}
}

/// Input for `Recommender::add_item`, also the fixture format for the demo binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItem {
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub categories: Vec<String>,
	#[serde(default)]
	pub features: Vec<String>,
}

impl NewItem {
	pub fn new<C, F>(
		id: impl Into<String>,
		title: impl Into<String>,
		description: impl Into<String>,
		categories: C,
		features: F,
	) -> Self
	where
		C: IntoIterator,
		C::Item: Into<String>,
		F: IntoIterator,
		F::Item: Into<String>,
	{
		Self {
			id: id.into(),
			title: title.into(),
			description: description.into(),
			categories: categories.into_iter().map(Into::into).collect(),
			features: features.into_iter().map(Into::into).collect(),
		}
	}
}

/// Point-in-time counters for the profile store and result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommenderStats {
	pub users: usize,
	pub items: usize,
	#[serde(rename = "cachedEntries")]
	pub cached_entries: usize,
	#[serde(rename = "retainedInteractions")]
	pub retained_interactions: usize,
}
