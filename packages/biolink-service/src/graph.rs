use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{BioLinkService, Error, Result};
use biolink_domain::{EntityExtractor, EntityKey, Record, RelationKind, text};
use biolink_storage::{GraphBuilder, GraphDelta, GraphSnapshot};

pub const MAX_FACTS_PER_KEYWORD: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphBuildOverrides {
	pub max_papers: Option<u32>,
	pub max_trials: Option<u32>,
	pub include_trials: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBuildStatus {
	Built,
	NoEntities,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphBuildReport {
	pub topic: String,
	pub status: GraphBuildStatus,
	pub papers: usize,
	pub trials: usize,
	pub delta: GraphDelta,
	pub node_count: usize,
	pub edge_count: usize,
	pub fingerprint: String,
	pub snapshot: GraphSnapshot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphFact {
	pub source: EntityKey,
	pub relation: RelationKind,
	pub target: EntityKey,
	pub provenance: BTreeSet<String>,
	pub low_confidence: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphQueryResponse {
	pub topic: String,
	pub keywords: Vec<String>,
	pub facts: Vec<GraphFact>,
}

impl BioLinkService {
	/// Fetches papers (and optionally trials) for a topic and merges their entities into its graph.
	pub async fn build_graph(
		&self,
		topic: &str,
		overrides: &GraphBuildOverrides,
	) -> Result<GraphBuildReport> {
		let key = topic_key(topic)?;
		let max_papers = overrides.max_papers.unwrap_or(self.cfg.graph.max_papers);
		let max_trials = overrides.max_trials.unwrap_or(self.cfg.graph.max_trials);
		let include_trials = overrides.include_trials.unwrap_or(self.cfg.graph.include_trials);
		let papers = if max_papers > 0 {
			self.providers
				.records
				.fetch_papers(&self.cfg.registries.pubmed, topic.trim(), max_papers)
				.await?
		} else {
			Vec::new()
		};
		let trials = if include_trials && max_trials > 0 {
			self.providers
				.records
				.fetch_trials(&self.cfg.registries.trials, topic.trim(), max_trials)
				.await?
		} else {
			Vec::new()
		};

		self.build_graph_from_records(&key, &papers, &trials).await
	}

	/// Merges already-fetched records into the graph of `topic` under the topic's lock.
	pub async fn build_graph_from_records(
		&self,
		topic: &str,
		papers: &[Record],
		trials: &[Record],
	) -> Result<GraphBuildReport> {
		let key = topic_key(topic)?;
		let lock = self.topic_lock(&key);
		let _guard = lock.lock().await;
		let extractor = EntityExtractor::new(self.cfg.graph.proximity_window);
		let mut builder = GraphBuilder::from_snapshot(self.graph_store.read(&key)?)?
			.with_low_confidence(self.cfg.graph.accept_low_confidence);
		let mut delta = GraphDelta::default();
		let mut found_entities = false;

		for record in papers.iter().chain(trials) {
			let extraction = extractor.extract_record(record);

			found_entities |=
				extraction.entities.iter().any(|entity| !entity.key.entity_type.is_record());

			delta.absorb(builder.upsert(&extraction.entities, &extraction.relations)?);
		}

		let status =
			if found_entities { GraphBuildStatus::Built } else { GraphBuildStatus::NoEntities };
		// Nothing is written without entities, so the discarded extraction counts for nothing.
		let (snapshot, delta) = match status {
			GraphBuildStatus::Built => {
				let mut snapshot = builder.snapshot();

				snapshot.updated_at = Some(OffsetDateTime::now_utc());

				self.graph_store.write(&key, &snapshot)?;

				(snapshot, delta)
			},
			GraphBuildStatus::NoEntities => (self.graph_store.read(&key)?, GraphDelta::default()),
		};
		let fingerprint = snapshot.fingerprint()?;

		tracing::info!(
			topic = %key,
			papers = papers.len(),
			trials = trials.len(),
			new_nodes = delta.new_nodes,
			new_edges = delta.new_edges,
			status = ?status,
			"Graph build finished."
		);

		Ok(GraphBuildReport {
			topic: key,
			status,
			papers: papers.len(),
			trials: trials.len(),
			delta,
			node_count: snapshot.nodes.len(),
			edge_count: snapshot.edges.len(),
			fingerprint,
			snapshot,
		})
	}

	pub async fn graph_snapshot(&self, topic: &str) -> Result<GraphSnapshot> {
		let key = topic_key(topic)?;

		Ok(self.graph_store.read(&key)?)
	}

	/// Facts touching nodes whose name or alias contains a keyword of `query`.
	pub async fn query_graph(&self, topic: &str, query: &str) -> Result<GraphQueryResponse> {
		let key = topic_key(topic)?;
		let extractor = EntityExtractor::new(self.cfg.graph.proximity_window);
		let keywords = query_keywords(&extractor, query);

		if keywords.is_empty() {
			return Err(Error::Validation { message: "query must be non-empty.".to_string() });
		}

		let snapshot = self.graph_store.read(&key)?;
		let mut seen = HashSet::new();
		let mut facts = Vec::new();

		for keyword in &keywords {
			let matching: HashSet<&EntityKey> = snapshot
				.nodes
				.iter()
				.filter(|node| {
					node.key.name.contains(keyword.as_str())
						|| node
							.aliases
							.iter()
							.any(|alias| text::normalize_text(alias).contains(keyword.as_str()))
				})
				.map(|node| &node.key)
				.collect();
			let hits = snapshot
				.edges
				.iter()
				.filter(|edge| matching.contains(&edge.source) || matching.contains(&edge.target))
				.take(MAX_FACTS_PER_KEYWORD);

			for edge in hits {
				if seen.insert((&edge.source, edge.relation, &edge.target)) {
					facts.push(GraphFact {
						source: edge.source.clone(),
						relation: edge.relation,
						target: edge.target.clone(),
						provenance: edge.provenance.clone(),
						low_confidence: edge.low_confidence,
					});
				}
			}
		}

		Ok(GraphQueryResponse { topic: key, keywords, facts })
	}
}

/// Normalized store key of a topic.
pub fn topic_key(topic: &str) -> Result<String> {
	let key = text::normalize_text(topic);

	if key.is_empty() {
		return Err(Error::Validation { message: "topic must be non-empty.".to_string() });
	}

	Ok(key)
}

fn query_keywords(extractor: &EntityExtractor, query: &str) -> Vec<String> {
	let mut keywords: Vec<String> = Vec::new();

	for entity in extractor.extract(query).entities {
		if !keywords.contains(&entity.key.name) {
			keywords.push(entity.key.name);
		}
	}

	if keywords.is_empty() {
		let normalized = text::normalize_text(query);

		if !normalized.is_empty() {
			keywords.push(normalized);
		}
	}

	keywords
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn topic_keys_are_normalized() {
		assert_eq!(
			topic_key("  EGFR / Lung-Cancer ").expect("Topic must be valid."),
			"egfr lung cancer"
		);
		assert!(matches!(topic_key(" ?! "), Err(Error::Validation { .. })));
	}

	#[test]
	fn query_keywords_prefer_canonical_entities() {
		let extractor = EntityExtractor::default();

		assert_eq!(query_keywords(&extractor, "What does Tagrisso treat?"), vec!["osimertinib"]);
		assert_eq!(query_keywords(&extractor, "Unrelated Words"), vec!["unrelated words"]);
	}
}
