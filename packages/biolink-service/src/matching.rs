use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BioLinkService, EmbeddingProvider, Error, Result, SemanticIndex};
use biolink_config::{EmbeddingProviderConfig, Matching};
use biolink_domain::{
	PatientQuery, Record, Verdicts, eligibility,
	text::{self, Sentence},
};
use biolink_storage::cosine_similarity;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
	Matched,
	NoEligibleRecords,
	NoCandidates,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
	pub record_id: String,
	pub title: String,
	/// In [0, 1].
	pub score: f32,
	pub snippet: String,
	pub verdicts: Verdicts,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
	pub session_id: Uuid,
	pub status: MatchStatus,
	/// Distinct records considered.
	pub candidates: usize,
	/// Records that passed every hard constraint.
	pub eligible: usize,
	pub results: Vec<MatchResult>,
}

/// Filters, indexes, and scores one batch of records against one patient.
pub struct MatchRanker<'a> {
	provider: &'a dyn EmbeddingProvider,
	embedding: &'a EmbeddingProviderConfig,
	matching: &'a Matching,
}
impl<'a> MatchRanker<'a> {
	pub fn new(
		provider: &'a dyn EmbeddingProvider,
		embedding: &'a EmbeddingProviderConfig,
		matching: &'a Matching,
	) -> Self {
		Self { provider, embedding, matching }
	}

	pub async fn rank(
		&self,
		records: &[Record],
		patient: &PatientQuery,
		top_k: usize,
	) -> Result<MatchReport> {
		if top_k == 0 {
			return Err(Error::Validation {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		let profile = patient.profile()?;
		let session_id = Uuid::new_v4();

		if records.is_empty() {
			return Ok(MatchReport {
				session_id,
				status: MatchStatus::NoCandidates,
				candidates: 0,
				eligible: 0,
				results: Vec::new(),
			});
		}

		let outcome = eligibility::filter(records, &profile);
		let candidates = outcome.verdicts.len();

		tracing::info!(
			%session_id,
			candidates,
			eligible = outcome.passing.len(),
			duplicates = outcome.duplicates,
			dropped = ?outcome.dropped,
			"Eligibility filter applied."
		);

		if outcome.passing.is_empty() {
			return Ok(MatchReport {
				session_id,
				status: MatchStatus::NoEligibleRecords,
				candidates,
				eligible: 0,
				results: Vec::new(),
			});
		}

		let survivors = first_occurrences(records, &outcome.passing);
		let mut index = SemanticIndex::new(session_id, self.provider, self.embedding);

		index.embed_and_add(&survivors).await?;

		let query_text = patient.query_text();
		let Some(query_vector) = index.embed(&[query_text]).await?.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no query vector.".to_string(),
			});
		};
		let similarity: HashMap<String, f32> = index
			.query_vector(&query_vector, index.len())?
			.into_iter()
			.map(|scored| (scored.record_id, scored.score))
			.collect();
		let snippets = self.snippets(&index, &survivors, &query_vector).await?;
		let mut results: Vec<MatchResult> = survivors
			.iter()
			.zip(snippets)
			.map(|(record, snippet)| {
				let verdicts = outcome.verdicts.get(&record.id).copied().unwrap_or_default();
				let cosine = similarity.get(&record.id).copied().unwrap_or(0.0);

				MatchResult {
					record_id: record.id.clone(),
					title: record.title.clone(),
					score: score(cosine, verdicts.unknown_count(), self.matching.unknown_penalty),
					snippet,
					verdicts,
				}
			})
			.collect();

		// Stable sort, so equal scores keep fetch order.
		results.sort_by(|left, right| right.score.total_cmp(&left.score));
		results.truncate(top_k);

		tracing::info!(%session_id, returned = results.len(), "Match ranking complete.");

		Ok(MatchReport {
			session_id,
			status: MatchStatus::Matched,
			candidates,
			eligible: survivors.len(),
			results,
		})
	}

	/// Best sentence per record by similarity to the query, in record order.
	async fn snippets(
		&self,
		index: &SemanticIndex<'_>,
		records: &[Record],
		query_vector: &[f32],
	) -> Result<Vec<String>> {
		let per_record: Vec<Vec<Sentence<'_>>> = records
			.iter()
			.map(|record| {
				let sentences = text::split_sentences(&record.body);

				if sentences.is_empty() { text::split_sentences(&record.title) } else { sentences }
			})
			.collect();
		let flat: Vec<String> =
			per_record.iter().flatten().map(|sentence| sentence.text.to_string()).collect();
		let vectors = index.embed(&flat).await?;
		let mut vectors = vectors.into_iter();
		let mut snippets = Vec::with_capacity(records.len());

		for sentences in &per_record {
			let mut best: Option<(&str, f32)> = None;

			for sentence in sentences {
				let Some(vector) = vectors.next() else {
					break;
				};
				let similarity = cosine_similarity(query_vector, &vector);

				if best.is_none_or(|(_, best_score)| similarity > best_score) {
					best = Some((sentence.text, similarity));
				}
			}

			let snippet = best.map(|(text, _)| text).unwrap_or_default();

			snippets.push(text::truncate_chars(snippet, self.matching.snippet_max_chars));
		}

		Ok(snippets)
	}
}

impl BioLinkService {
	/// Fetches recruiting trials for the patient's condition and ranks them.
	pub async fn match_trials(
		&self,
		patient: &PatientQuery,
		top_k: Option<u32>,
	) -> Result<MatchReport> {
		let top_k = top_k.unwrap_or(self.cfg.matching.default_top_k);

		if top_k == 0 {
			return Err(Error::Validation {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		patient.profile()?;

		let search = match patient.condition.trim() {
			"" => patient.note.trim(),
			condition => condition,
		};
		let records = self
			.providers
			.records
			.fetch_trials(&self.cfg.registries.trials, search, self.cfg.matching.candidate_limit)
			.await?;

		self.match_trials_with_records(patient, &records, top_k).await
	}

	/// Ranks caller-supplied records without touching a registry.
	pub async fn match_trials_with_records(
		&self,
		patient: &PatientQuery,
		records: &[Record],
		top_k: u32,
	) -> Result<MatchReport> {
		MatchRanker::new(
			self.providers.embedding.as_ref(),
			&self.cfg.providers.embedding,
			&self.cfg.matching,
		)
		.rank(records, patient, top_k as usize)
		.await
	}
}

fn first_occurrences(records: &[Record], passing: &[String]) -> Vec<Record> {
	let passing: HashSet<&str> = passing.iter().map(String::as_str).collect();
	let mut seen = HashSet::new();

	records
		.iter()
		.filter(|record| passing.contains(record.id.as_str()) && seen.insert(record.id.as_str()))
		.cloned()
		.collect()
}

fn score(cosine: f32, unknown: usize, penalty: f32) -> f32 {
	if cosine.is_nan() {
		return 0.0;
	}

	(cosine.clamp(0.0, 1.0) - penalty * unknown as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn penalty_applies_per_unknown_dimension() {
		assert_eq!(score(0.9, 0, 0.1), 0.9);
		assert!((score(0.9, 2, 0.1) - 0.7).abs() < 1e-6);
		assert_eq!(score(0.1, 3, 0.2), 0.0);
		assert_eq!(score(-0.4, 0, 0.0), 0.0);
		assert_eq!(score(f32::NAN, 0, 0.0), 0.0);
	}

	#[test]
	fn duplicate_ids_keep_first_record() {
		let records = vec![
			Record::new("a", biolink_domain::Source::Trial, "first", ""),
			Record::new("b", biolink_domain::Source::Trial, "second", ""),
			Record::new("a", biolink_domain::Source::Trial, "repeat", ""),
		];
		let survivors = first_occurrences(&records, &["a".to_string(), "b".to_string()]);

		assert_eq!(survivors.len(), 2);
		assert_eq!(survivors[0].title, "first");
	}
}
