use std::{cmp::Ordering, collections::HashMap};

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct VectorEntry {
	pub record_id: String,
	pub vector: Vec<f32>,
	/// The text that was embedded.
	pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredId {
	pub record_id: String,
	pub score: f32,
}

/// In-memory vector arena. Entries keep their first insertion position, which breaks score ties.
#[derive(Clone, Debug)]
pub struct VectorIndex {
	dimensions: usize,
	entries: Vec<VectorEntry>,
	positions: HashMap<String, usize>,
}
impl VectorIndex {
	pub fn new(dimensions: usize) -> Self {
		Self { dimensions, entries: Vec::new(), positions: HashMap::new() }
	}

	pub fn dimensions(&self) -> usize {
		self.dimensions
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, record_id: &str) -> Option<&VectorEntry> {
		self.positions.get(record_id).map(|position| &self.entries[*position])
	}

	/// Checks a whole batch before any of it is stored.
	pub fn check_batch(&self, entries: &[VectorEntry]) -> Result<()> {
		for entry in entries {
			self.check_vector(&entry.vector)?;
		}

		Ok(())
	}

	/// Replaces the vector of a known id in place; new ids are appended.
	pub fn upsert(&mut self, entry: VectorEntry) -> Result<()> {
		self.check_vector(&entry.vector)?;

		match self.positions.get(&entry.record_id) {
			Some(position) => self.entries[*position] = entry,
			None => {
				self.positions.insert(entry.record_id.clone(), self.entries.len());
				self.entries.push(entry);
			},
		}

		Ok(())
	}

	/// Highest cosine similarity first. `top_k` larger than the index returns every entry.
	pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredId>> {
		self.check_vector(vector)?;

		let mut scored: Vec<(usize, f32)> = self
			.entries
			.iter()
			.enumerate()
			.map(|(position, entry)| (position, cosine_similarity(vector, &entry.vector)))
			.collect();

		scored.sort_by(|(left_pos, left), (right_pos, right)| {
			right.partial_cmp(left).unwrap_or(Ordering::Equal).then(left_pos.cmp(right_pos))
		});
		scored.truncate(top_k.min(self.entries.len()));

		Ok(scored
			.into_iter()
			.map(|(position, score)| ScoredId {
				record_id: self.entries[position].record_id.clone(),
				score,
			})
			.collect())
	}

	fn check_vector(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.dimensions {
			return Err(Error::DimensionMismatch {
				expected: self.dimensions,
				actual: vector.len(),
			});
		}
		if vector.iter().any(|value| !value.is_finite()) {
			return Err(Error::InvalidArgument("Vector values must be finite.".to_string()));
		}

		Ok(())
	}
}

/// Cosine similarity in [-1, 1]; zero when either vector has no magnitude.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
	let mut dot = 0.0_f32;
	let mut left_norm = 0.0_f32;
	let mut right_norm = 0.0_f32;

	for (l, r) in left.iter().zip(right) {
		dot += l * r;
		left_norm += l * l;
		right_norm += r * r;
	}

	if left_norm == 0.0 || right_norm == 0.0 {
		return 0.0;
	}

	(dot / (left_norm.sqrt() * right_norm.sqrt())).clamp(-1.0, 1.0)
}
