pub mod backend;
pub mod bloom;
pub mod cache;
pub mod candidates;
pub mod config;
pub mod error;
pub mod profile;
pub mod recommender;
pub mod similarity;
pub mod types;

use std::time::{SystemTime, UNIX_EPOCH};

pub use backend::RankingBackend;
pub use bloom::BloomFilter;
pub use config::RecommenderConfig;
pub use error::{RecommenderError, Result};
pub use recommender::Recommender;
pub use types::{NewItem, ScoredItem};

/// Seconds since the Unix epoch.
pub fn current_timestamp_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
