// ---------------------------------------------------------------------------
// Similarity Engine: scoring functions for filter-based ranking
// ---------------------------------------------------------------------------
//
// Pure functions combining Jaccard similarity between filters with an
// exponential recency weight. No side effects.
//
// Only items with an interaction still inside the window get a temporal
// weight. Items without one keep their raw score, so an item nobody touched
// recently can outrank one with the same overlap that was touched weeks ago.
// ---------------------------------------------------------------------------

use std::cmp::Ordering;

use crate::bloom::BloomFilter;
use crate::error::Result;
use crate::types::ScoredItem;

/// Raw similarity between two filters (Jaccard over set bits).
pub fn score(a: &BloomFilter, b: &BloomFilter) -> Result<f64> {
	a.similarity(b)
}

/// `exp(-(now - t) / window)`. Future timestamps count as age zero.
pub fn temporal_weight(timestamp: u64, now: u64, window_secs: u64) -> f64 {
	let age = now.saturating_sub(timestamp) as f64;
	(-age / window_secs as f64).exp()
}

/// Apply the temporal weight when the item has a tracked interaction.
pub fn weighted_score(raw: f64, latest_interaction: Option<u64>, now: u64, window_secs: u64) -> f64 {
	match latest_interaction {
		Some(t) => raw * temporal_weight(t, now, window_secs),
		None => raw,
	}
}

/// Descending score, then ascending item id.
pub fn compare_ranked(a: &ScoredItem, b: &ScoredItem) -> Ordering {
	b.score
		.total_cmp(&a.score)
		.then_with(|| a.item_id.cmp(&b.item_id))
}

/// Keep the top `n` entries in rank order.
pub fn rank_top_n(mut scored: Vec<ScoredItem>, n: usize) -> Vec<ScoredItem> {
	scored.sort_by(compare_ranked);
	scored.truncate(n);
	scored
}

#[cfg(test)]
mod tests {
	use super::*;

	const WINDOW: u64 = 30 * 24 * 60 * 60;

	// -- temporal_weight tests ------------------------------------------------

	#[test]
	fn weight_at_now_is_one() {
		assert!((temporal_weight(1000, 1000, WINDOW) - 1.0).abs() < 1e-12);
	}

	#[test]
	fn weight_after_one_window_is_inverse_e() {
		let w = temporal_weight(0, WINDOW, WINDOW);
		assert!((w - (-1.0f64).exp()).abs() < 1e-12);
	}

	#[test]
	fn weight_future_timestamp_is_one() {
		assert!((temporal_weight(2000, 1000, WINDOW) - 1.0).abs() < 1e-12);
	}

	#[test]
	fn weight_decays_with_age() {
		let now = 10 * WINDOW;
		assert!(temporal_weight(now - 60, now, WINDOW) > temporal_weight(now - WINDOW / 2, now, WINDOW));
	}

	// -- weighted_score tests -------------------------------------------------

	#[test]
	fn untracked_items_keep_raw_score() {
		assert_eq!(weighted_score(0.4, None, 5000, WINDOW), 0.4);
	}

	#[test]
	fn tracked_items_are_discounted() {
		let now = 2 * WINDOW;
		let weighted = weighted_score(0.4, Some(now - WINDOW / 2), now, WINDOW);
		assert!(weighted < 0.4);
		assert!((weighted - 0.4 * (-0.5f64).exp()).abs() < 1e-12);
	}

	// -- ranking tests --------------------------------------------------------

	#[test]
	fn rank_orders_by_score_then_id() {
		let ranked = rank_top_n(
			vec![
				ScoredItem::new("b", 0.5),
				ScoredItem::new("c", 0.9),
				ScoredItem::new("a", 0.5),
				ScoredItem::new("d", 0.1),
			],
			3,
		);
		let ids: Vec<&str> = ranked.iter().map(|s| s.item_id.as_str()).collect();
		assert_eq!(ids, vec!["c", "a", "b"]);
	}

	#[test]
	fn rank_with_large_n_keeps_all() {
		let ranked = rank_top_n(vec![ScoredItem::new("x", 0.2)], 10);
		assert_eq!(ranked.len(), 1);
	}

	#[test]
	fn rank_zero_is_empty() {
		assert!(rank_top_n(vec![ScoredItem::new("x", 0.2)], 0).is_empty());
	}

	#[test]
	fn score_delegates_to_jaccard() {
		let mut a = BloomFilter::new(10, 0.01).unwrap();
		a.add("red");
		let b = a.clone();
		assert!((score(&a, &b).unwrap() - 1.0).abs() < 1e-12);
	}
}
