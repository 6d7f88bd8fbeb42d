use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use serde::Deserialize;
use serde_json::json;

use bloom_recommender::config::CliArgs;
use bloom_recommender::{current_timestamp_secs, NewItem, RankingBackend, Recommender, ScoredItem};

#[derive(Debug, Deserialize)]
struct Fixture {
	items: Vec<NewItem>,
	#[serde(default)]
	interactions: Vec<FixtureInteraction>,
	#[serde(default)]
	queries: Vec<FixtureQuery>,
}

#[derive(Debug, Deserialize)]
struct FixtureInteraction {
	#[serde(rename = "userId")]
	user_id: String,
	#[serde(rename = "itemId")]
	item_id: String,
	#[serde(rename = "interactionType", default = "default_interaction_type")]
	interaction_type: String,
	/// How long ago the interaction happened, in seconds.
	#[serde(rename = "ageSecs", default)]
	age_secs: u64,
}

fn default_interaction_type() -> String {
	"view".to_string()
}

#[derive(Debug, Deserialize)]
struct FixtureQuery {
	#[serde(rename = "userId")]
	user_id: String,
	#[serde(default)]
	context: String,
}

/// Stand-in for a model backend: keeps candidate order, scores 1.0 down.
struct InOrderBackend;

#[async_trait]
impl RankingBackend for InOrderBackend {
	async fn generate(
		&self,
		_context: &str,
		candidates: &[String],
		n: usize,
	) -> bloom_recommender::Result<Vec<ScoredItem>> {
		let step = 1.0 / candidates.len().max(1) as f64;
		Ok(candidates
			.iter()
			.take(n)
			.enumerate()
			.map(|(i, id)| ScoredItem::new(id.clone(), 1.0 - i as f64 * step))
			.collect())
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = CliArgs::parse();

	// Logs go to stderr; stdout carries the JSON report.
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let config = args.resolve_config()?;
	let raw = std::fs::read_to_string(&args.fixture)
		.with_context(|| format!("reading fixture {}", args.fixture.display()))?;
	let fixture: Fixture = serde_json::from_str(&raw).context("parsing fixture")?;

	let recommender = Recommender::new(config, Arc::new(InOrderBackend))?;
	let now = current_timestamp_secs();

	let item_ids: Vec<String> = fixture.items.iter().map(|i| i.id.clone()).collect();
	for item in fixture.items {
		recommender.add_item(item);
	}
	for i in &fixture.interactions {
		recommender.add_user_interaction(
			&i.user_id,
			&i.item_id,
			&i.interaction_type,
			now.saturating_sub(i.age_secs),
		);
	}
	tracing::info!(stats = ?recommender.stats(), "Fixture loaded");

	let mut recommendations = Vec::new();
	for q in &fixture.queries {
		let ranked = recommender.recommend(&q.user_id, &q.context, args.limit).await;
		let by_profile = recommender.recommend_by_profile(&q.user_id, args.limit);
		recommendations.push(json!({
			"userId": q.user_id,
			"context": q.context,
			"recommend": ranked,
			"byProfile": by_profile,
		}));
	}

	let similar: Vec<_> = item_ids
		.iter()
		.map(|id| json!({ "itemId": id, "similar": recommender.similar_items(id, args.limit) }))
		.collect();

	let report = json!({
		"recommendations": recommendations,
		"similarItems": similar,
		"stats": recommender.stats(),
	});
	println!("{}", serde_json::to_string_pretty(&report)?);
	Ok(())
}
