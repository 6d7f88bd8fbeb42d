use std::fmt::Write as _;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ScoredItem;

// ── Traits ────────────────────────────────────────────────────────────────

/// External ranking capability, typically a language model.
///
/// Receives the request context and the pre-selected candidate ids and
/// returns up to `n` `(id, score)` pairs, best first. Scores are expected in
/// `[0, 1]` but are passed through unchecked.
#[async_trait]
pub trait RankingBackend: Send + Sync {
	async fn generate(&self, context: &str, candidates: &[String], n: usize) -> Result<Vec<ScoredItem>>;
}

// ── Prompt rendering ──────────────────────────────────────────────────────

/// Render the relevance prompt a text-generation backend sends to its model.
pub fn build_prompt(context: &str, candidates: &[String]) -> String {
	let mut prompt = String::new();
	let _ = writeln!(prompt, "Based on the following user context:");
	let _ = writeln!(prompt, "{context}");
	let _ = writeln!(prompt);
	let _ = writeln!(prompt, "Please recommend items from this list:");
	for id in candidates {
		let _ = writeln!(prompt, "- {id}");
	}
	prompt.push_str("\nProvide recommendations in order of relevance, with scores between 0 and 1.");
	prompt
}
