use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::bloom::FilterDimensions;
use crate::error::{RecommenderError, Result};

pub const DEFAULT_EXPECTED_ITEMS: usize = 1000;
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
/// 24 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
/// 30 days.
pub const DEFAULT_INTERACTION_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 30_000;

// ---------------------------------------------------------------------------
// RecommenderConfig
// ---------------------------------------------------------------------------

/// Construction parameters for a `Recommender`.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
	/// Expected distinct entries per user or item filter.
	pub expected_items_per_subject: usize,
	/// Target false-positive rate for every filter.
	pub false_positive_rate: f64,
	/// Maximum number of cached result lists.
	pub cache_capacity: usize,
	pub cache_ttl_secs: u64,
	/// Trailing window for retained interactions and temporal decay.
	pub interaction_window_secs: u64,
	pub backend_timeout_ms: u64,
}

impl Default for RecommenderConfig {
	fn default() -> Self {
		Self {
			expected_items_per_subject: DEFAULT_EXPECTED_ITEMS,
			false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
			cache_capacity: DEFAULT_CACHE_CAPACITY,
			cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
			interaction_window_secs: DEFAULT_INTERACTION_WINDOW_SECS,
			backend_timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
		}
	}
}

impl RecommenderConfig {
	pub fn new(
		expected_items_per_subject: usize,
		false_positive_rate: f64,
		cache_capacity: usize,
	) -> Self {
		Self {
			expected_items_per_subject,
			false_positive_rate,
			cache_capacity,
			..Self::default()
		}
	}

	pub fn from_json_str(json: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_json_str(&raw)
	}

	pub fn validate(&self) -> Result<()> {
		self.filter_dimensions()?;
		if self.cache_capacity == 0 {
			return Err(RecommenderError::InvalidConfig(
				"cache_capacity must be positive".into(),
			));
		}
		if self.cache_ttl_secs == 0 {
			return Err(RecommenderError::InvalidConfig(
				"cache_ttl_secs must be positive".into(),
			));
		}
		if self.interaction_window_secs == 0 {
			return Err(RecommenderError::InvalidConfig(
				"interaction_window_secs must be positive".into(),
			));
		}
		Ok(())
	}

	/// Dimensions shared by every user and item filter.
	pub fn filter_dimensions(&self) -> Result<FilterDimensions> {
		FilterDimensions::optimal(self.expected_items_per_subject, self.false_positive_rate)
	}

	pub fn cache_ttl(&self) -> Duration {
		Duration::from_secs(self.cache_ttl_secs)
	}

	pub fn backend_timeout(&self) -> Duration {
		Duration::from_millis(self.backend_timeout_ms)
	}
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
	name = "bloom-recommender",
	about = "Run the Bloom-filter recommender over a JSON catalog fixture"
)]
pub struct CliArgs {
	/// JSON fixture with `items` and `interactions`
	#[arg(long, env = "BLOOM_REC_FIXTURE")]
	pub fixture: PathBuf,

	/// JSON config file; when set, the sizing flags below are ignored
	#[arg(long, env = "BLOOM_REC_CONFIG")]
	pub config: Option<PathBuf>,

	/// Expected entries per user/item filter
	#[arg(long, default_value_t = DEFAULT_EXPECTED_ITEMS, env = "BLOOM_REC_EXPECTED_ITEMS")]
	pub expected_items: usize,

	/// Target false-positive rate
	#[arg(long, default_value_t = DEFAULT_FALSE_POSITIVE_RATE, env = "BLOOM_REC_FP_RATE")]
	pub false_positive_rate: f64,

	/// Maximum cached result lists
	#[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY, env = "BLOOM_REC_CACHE_CAPACITY")]
	pub cache_capacity: usize,

	/// Number of results per query
	#[arg(long, short = 'n', default_value = "10")]
	pub limit: usize,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "BLOOM_REC_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	/// Resolve the effective config: the file when given, otherwise the flags.
	pub fn resolve_config(&self) -> Result<RecommenderConfig> {
		match &self.config {
			Some(path) => RecommenderConfig::from_path(path),
			None => {
				let config = RecommenderConfig::new(
					self.expected_items,
					self.false_positive_rate,
					self.cache_capacity,
				);
				config.validate()?;
				Ok(config)
			}
		}
	}
}
