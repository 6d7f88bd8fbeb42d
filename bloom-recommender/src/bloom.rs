// ---------------------------------------------------------------------------
// Bloom Filter: fixed-size probabilistic set
// ---------------------------------------------------------------------------
//
// Insertion-only membership filter with no false negatives. Dimensions are
// derived once from an expected item count `n` and a target false-positive
// rate `p`:
//
//   m = ceil(-n * ln(p) / ln(2)^2)
//   k = max(1, round((m / n) * ln(2)))
//
// Inserting more than `n` items never fails; the realized false-positive
// rate simply climbs above `p`.
//
// Slots come from double hashing over two xxh64 digests. The first digest
// uses seed 0 and the second is seeded with the first, so slot positions are
// identical across runs and platforms.
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

use crate::error::{RecommenderError, Result};

/// Seed for the first digest. The second digest is seeded with the first.
pub const FILTER_SEED: u64 = 0;

const WORD_BITS: usize = 64;

// ---------------------------------------------------------------------------
// FilterDimensions
// ---------------------------------------------------------------------------

/// Bit-array length and hash-function count shared by compatible filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDimensions {
	pub bit_len: usize,
	pub hash_count: usize,
}

impl FilterDimensions {
	/// Compute optimal dimensions for `expected_items` at `false_positive_rate`.
	pub fn optimal(expected_items: usize, false_positive_rate: f64) -> Result<Self> {
		if expected_items == 0 {
			return Err(RecommenderError::InvalidConfig(
				"expected item count must be positive".into(),
			));
		}
		if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
			return Err(RecommenderError::InvalidConfig(format!(
				"false-positive rate must lie in (0, 1), got {false_positive_rate}"
			)));
		}

		let n = expected_items as f64;
		let ln2 = std::f64::consts::LN_2;
		let bit_len = (-n * false_positive_rate.ln() / (ln2 * ln2)).ceil() as usize;
		let bit_len = bit_len.max(1);
		let hash_count = ((bit_len as f64 / n) * ln2).round() as usize;

		Ok(Self {
			bit_len,
			hash_count: hash_count.max(1),
		})
	}
}

// ---------------------------------------------------------------------------
// BloomFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
	words: Vec<u64>,
	dims: FilterDimensions,
	items: usize,
}

impl BloomFilter {
	/// Create a filter sized for `expected_items` at `false_positive_rate`.
	pub fn new(expected_items: usize, false_positive_rate: f64) -> Result<Self> {
		FilterDimensions::optimal(expected_items, false_positive_rate).map(Self::with_dimensions)
	}

	/// Create an empty filter with precomputed dimensions.
	pub fn with_dimensions(dims: FilterDimensions) -> Self {
		Self {
			words: vec![0; dims.bit_len.div_ceil(WORD_BITS)],
			dims,
			items: 0,
		}
	}

	pub fn dimensions(&self) -> FilterDimensions {
		self.dims
	}

	pub fn bit_len(&self) -> usize {
		self.dims.bit_len
	}

	pub fn hash_count(&self) -> usize {
		self.dims.hash_count
	}

	/// Number of `add` calls since construction or the last `clear`.
	pub fn len(&self) -> usize {
		self.items
	}

	pub fn is_empty(&self) -> bool {
		self.items == 0
	}

	/// Number of bits currently set.
	pub fn set_bits(&self) -> usize {
		self.words.iter().map(|w| w.count_ones() as usize).sum()
	}

	fn slots(dims: FilterDimensions, key: &str) -> impl Iterator<Item = usize> {
		let h1 = xxh64(key.as_bytes(), FILTER_SEED);
		let h2 = xxh64(key.as_bytes(), h1);
		let m = dims.bit_len as u64;
		(0..dims.hash_count as u64)
			.map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
	}

	pub fn add(&mut self, key: &str) {
		for slot in Self::slots(self.dims, key) {
			self.words[slot / WORD_BITS] |= 1u64 << (slot % WORD_BITS);
		}
		self.items += 1;
	}

	/// True if every slot for `key` is set. Never false for an added key.
	pub fn probably_contains(&self, key: &str) -> bool {
		Self::slots(self.dims, key)
			.all(|slot| self.words[slot / WORD_BITS] & (1u64 << (slot % WORD_BITS)) != 0)
	}

	/// Jaccard index over set bits. Zero when neither filter has a bit set.
	pub fn similarity(&self, other: &BloomFilter) -> Result<f64> {
		if self.dims.bit_len != other.dims.bit_len {
			return Err(RecommenderError::IncompatibleSize {
				left: self.dims.bit_len,
				right: other.dims.bit_len,
			});
		}

		let mut intersection = 0usize;
		let mut union = 0usize;
		for (a, b) in self.words.iter().zip(&other.words) {
			intersection += (a & b).count_ones() as usize;
			union += (a | b).count_ones() as usize;
		}

		if union == 0 {
			return Ok(0.0);
		}
		Ok(intersection as f64 / union as f64)
	}

	/// Expected false-positive rate given the current insertion count:
	/// `(1 - e^(-k * items / m))^k`.
	pub fn estimated_false_positive_rate(&self) -> f64 {
		let k = self.dims.hash_count as f64;
		let m = self.dims.bit_len as f64;
		(1.0 - (-k * self.items as f64 / m).exp()).powf(k)
	}

	pub fn clear(&mut self) {
		self.words.iter_mut().for_each(|w| *w = 0);
		self.items = 0;
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
