// ---------------------------------------------------------------------------
// Candidate Selector: narrows the catalog before ranking
// ---------------------------------------------------------------------------
//
// A pre-filter, not a ranking. User mode drops anything the user's filter
// probably contains (false positives may hide an unseen item; history items
// are never let back in) and keeps items whose features or categories occur
// verbatim in the request context. Matching is case-sensitive substring
// containment, so an empty term matches every context.
// ---------------------------------------------------------------------------

use std::collections::HashSet;

use crate::bloom::BloomFilter;
use crate::profile::ProfileStore;
use crate::types::ItemProfile;

/// True if any feature or category occurs in `context`.
pub fn matches_context(item: &ItemProfile, context: &str) -> bool {
	item.terms().any(|term| context.contains(term))
}

/// Candidates for a user request, in ascending id order.
pub fn for_user(store: &ProfileStore, user_filter: &BloomFilter, context: &str) -> Vec<String> {
	store
		.items()
		.filter(|item| !user_filter.probably_contains(&item.id))
		.filter(|item| matches_context(item, context))
		.map(|item| item.id.clone())
		.collect()
}

/// Every catalog item except `item_id`.
pub fn for_item(store: &ProfileStore, item_id: &str) -> Vec<String> {
	store
		.items()
		.filter(|item| item.id != item_id)
		.map(|item| item.id.clone())
		.collect()
}

/// Every catalog item outside an exact history set.
pub fn unseen(store: &ProfileStore, history: &HashSet<String>) -> Vec<String> {
	store
		.items()
		.filter(|item| !history.contains(&item.id))
		.map(|item| item.id.clone())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bloom::FilterDimensions;
	use crate::types::NewItem;

	const NOW: u64 = 1_700_000_000;

	fn catalog() -> ProfileStore {
		let mut store = ProfileStore::new(FilterDimensions::optimal(100, 0.01).unwrap(), 30 * 86_400);
		for (id, categories, features) in [
			("i1", vec!["car"], vec!["red", "fast"]),
			("i2", vec!["bike"], vec!["blue", "slow"]),
			("i3", vec!["car"], vec!["Blue"]),
		] {
			store.record_item(NewItem::new(id, "", "", categories, features));
		}
		store
	}

	#[test]
	fn user_mode_excludes_history_and_requires_context_match() {
		let mut store = catalog();
		store.record_interaction_at("u1", "i1", "view", NOW, NOW);
		let filter = store.user_filter("u1").unwrap().clone();

		let candidates = for_user(&store, &filter, "a red fast car");
		// i1 matches the context but is in history; i3 matches via "car".
		assert_eq!(candidates, vec!["i3".to_string()]);
	}

	#[test]
	fn user_mode_is_case_sensitive() {
		let store = catalog();
		let filter = BloomFilter::with_dimensions(store.dimensions());
		assert_eq!(for_user(&store, &filter, "blue"), vec!["i2".to_string()]);
		assert_eq!(for_user(&store, &filter, "Blue"), vec!["i3".to_string()]);
	}

	#[test]
	fn empty_feature_matches_any_context_unless_seen() {
		let mut store = catalog();
		store.record_item(NewItem::new("i4", "", "", Vec::<String>::new(), [""]));
		let filter = BloomFilter::with_dimensions(store.dimensions());
		assert_eq!(for_user(&store, &filter, "nothing relevant"), vec!["i4".to_string()]);
		assert_eq!(for_user(&store, &filter, ""), vec!["i4".to_string()]);

		store.record_interaction_at("u1", "i4", "view", NOW, NOW);
		let filter = store.user_filter("u1").unwrap().clone();
		assert!(for_user(&store, &filter, "nothing relevant").is_empty());
	}

	#[test]
	fn item_mode_excludes_only_self() {
		let store = catalog();
		assert_eq!(for_item(&store, "i2"), vec!["i1".to_string(), "i3".to_string()]);
		assert_eq!(for_item(&store, "missing").len(), 3);
	}

	#[test]
	fn unseen_uses_exact_history() {
		let store = catalog();
		let history: HashSet<String> = ["i2".to_string()].into_iter().collect();
		assert_eq!(unseen(&store, &history), vec!["i1".to_string(), "i3".to_string()]);
	}
}
