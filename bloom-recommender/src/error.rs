use std::time::Duration;

use thiserror::Error;

/// Typed error variants for the recommender core.
#[derive(Debug, Error)]
pub enum RecommenderError {
	#[error("Incompatible filter sizes: {left} bits vs {right} bits")]
	IncompatibleSize { left: usize, right: usize },
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("Ranking backend error: {0}")]
	Backend(String),
	#[error("Ranking backend timed out after {0:?}")]
	BackendTimeout(Duration),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl RecommenderError {
	/// Return a machine-readable error code string for this error variant.
	pub fn code(&self) -> &str {
		match self {
			Self::IncompatibleSize { .. } => "RECOMMENDER_INCOMPATIBLE_SIZE",
			Self::InvalidConfig(_) => "RECOMMENDER_INVALID_CONFIG",
			Self::Backend(_) => "RECOMMENDER_BACKEND",
			Self::BackendTimeout(_) => "RECOMMENDER_BACKEND_TIMEOUT",
			Self::Io(_) => "RECOMMENDER_IO",
			Self::Json(_) => "RECOMMENDER_JSON",
		}
	}

	pub fn to_json(&self) -> serde_json::Value {
		serde_json::json!({
			"code": self.code(),
			"message": self.to_string(),
		})
	}
}

pub type Result<T> = std::result::Result<T, RecommenderError>;
