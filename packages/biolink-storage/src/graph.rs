use std::{
	collections::{BTreeSet, HashMap, HashSet},
	str::FromStr,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result};
use biolink_domain::{EntityKey, ExtractedEntity, ExtractedRelation, RelationKind};

/// Evidence sentences kept per edge; provenance ids are never capped.
pub const MAX_EVIDENCE_PER_EDGE: usize = 16;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	#[serde(flatten)]
	pub key: EntityKey,
	pub aliases: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
	pub source: EntityKey,
	pub relation: RelationKind,
	pub target: EntityKey,
	/// Ids of the records that contributed this edge.
	pub provenance: BTreeSet<String>,
	pub evidence: BTreeSet<String>,
	pub confidence: f32,
	pub low_confidence: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
	pub topic: String,
	pub nodes: Vec<GraphNode>,
	pub edges: Vec<GraphEdge>,
	#[serde(default, with = "crate::time_serde::option")]
	pub updated_at: Option<OffsetDateTime>,
}
impl GraphSnapshot {
	pub fn empty(topic: impl Into<String>) -> Self {
		Self { topic: topic.into(), ..Default::default() }
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Content hash over nodes and edges. Equal graphs hash equally regardless of write time.
	pub fn fingerprint(&self) -> Result<String> {
		let bytes = serde_json::to_vec(&(&self.nodes, &self.edges))?;

		Ok(blake3::hash(&bytes).to_hex().to_string())
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDelta {
	pub new_nodes: usize,
	pub merged_nodes: usize,
	pub new_edges: usize,
	pub merged_edges: usize,
	/// Low-confidence relations left out because the builder rejects them.
	pub skipped_edges: usize,
}
impl GraphDelta {
	pub fn absorb(&mut self, other: GraphDelta) {
		self.new_nodes += other.new_nodes;
		self.merged_nodes += other.merged_nodes;
		self.new_edges += other.new_edges;
		self.merged_edges += other.merged_edges;
		self.skipped_edges += other.skipped_edges;
	}
}

/// Arena of nodes and edges addressed by their merge keys.
#[derive(Clone, Debug)]
pub struct GraphBuilder {
	topic: String,
	nodes: Vec<GraphNode>,
	node_index: HashMap<EntityKey, usize>,
	edges: Vec<GraphEdge>,
	edge_index: HashMap<(usize, RelationKind, usize), usize>,
	accept_low_confidence: bool,
}
impl GraphBuilder {
	pub fn new(topic: impl Into<String>) -> Self {
		Self {
			topic: topic.into(),
			nodes: Vec::new(),
			node_index: HashMap::new(),
			edges: Vec::new(),
			edge_index: HashMap::new(),
			accept_low_confidence: true,
		}
	}

	pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
		let mut builder = Self::new(snapshot.topic);

		for node in snapshot.nodes {
			if builder.node_index.contains_key(&node.key) {
				return Err(Error::InvalidArgument(format!(
					"Graph snapshot repeats node {}.",
					node.key
				)));
			}

			builder.node_index.insert(node.key.clone(), builder.nodes.len());
			builder.nodes.push(node);
		}
		for edge in snapshot.edges {
			let (Some(source), Some(target)) =
				(builder.node_index.get(&edge.source), builder.node_index.get(&edge.target))
			else {
				return Err(Error::InvalidArgument(format!(
					"Graph snapshot edge {} {} {} references a missing node.",
					edge.source, edge.relation, edge.target
				)));
			};

			builder.edge_index.insert((*source, edge.relation, *target), builder.edges.len());
			builder.edges.push(edge);
		}

		Ok(builder)
	}

	pub fn with_low_confidence(mut self, accept: bool) -> Self {
		self.accept_low_confidence = accept;

		self
	}

	pub fn topic(&self) -> &str {
		&self.topic
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	pub fn node(&self, key: &EntityKey) -> Option<&GraphNode> {
		self.node_index.get(key).map(|idx| &self.nodes[*idx])
	}

	pub fn edge(
		&self,
		source: &EntityKey,
		relation: RelationKind,
		target: &EntityKey,
	) -> Option<&GraphEdge> {
		let source = *self.node_index.get(source)?;
		let target = *self.node_index.get(target)?;

		self.edge_index.get(&(source, relation, target)).map(|idx| &self.edges[*idx])
	}

	/// Applies a batch atomically: it is validated in full before anything is merged.
	pub fn upsert(
		&mut self,
		entities: &[ExtractedEntity],
		relations: &[ExtractedRelation],
	) -> Result<GraphDelta> {
		let kinds = self.validate(entities, relations)?;
		let mut delta = GraphDelta::default();

		for entity in entities {
			match self.node_index.get(&entity.key) {
				Some(idx) => {
					delta.merged_nodes += 1;

					insert_alias(&mut self.nodes[*idx].aliases, &entity.alias);
				},
				None => {
					delta.new_nodes += 1;

					let mut aliases = BTreeSet::new();

					insert_alias(&mut aliases, &entity.alias);

					self.node_index.insert(entity.key.clone(), self.nodes.len());
					self.nodes.push(GraphNode { key: entity.key.clone(), aliases });
				},
			}
		}

		for (relation, kind) in relations.iter().zip(kinds) {
			if relation.low_confidence && !self.accept_low_confidence {
				delta.skipped_edges += 1;

				continue;
			}

			let (Some(source), Some(target)) =
				(self.node_index.get(&relation.source), self.node_index.get(&relation.target))
			else {
				continue;
			};
			let slot = (*source, kind, *target);

			match self.edge_index.get(&slot) {
				Some(idx) => {
					delta.merged_edges += 1;

					merge_edge(&mut self.edges[*idx], relation);
				},
				None => {
					delta.new_edges += 1;

					let mut edge = GraphEdge {
						source: relation.source.clone(),
						relation: kind,
						target: relation.target.clone(),
						provenance: BTreeSet::new(),
						evidence: BTreeSet::new(),
						confidence: relation.confidence,
						low_confidence: relation.low_confidence,
					};

					merge_edge(&mut edge, relation);

					self.edge_index.insert(slot, self.edges.len());
					self.edges.push(edge);
				},
			}
		}

		tracing::debug!(
			topic = %self.topic,
			new_nodes = delta.new_nodes,
			merged_nodes = delta.merged_nodes,
			new_edges = delta.new_edges,
			merged_edges = delta.merged_edges,
			skipped_edges = delta.skipped_edges,
			"Graph batch applied."
		);

		Ok(delta)
	}

	pub fn snapshot(&self) -> GraphSnapshot {
		GraphSnapshot {
			topic: self.topic.clone(),
			nodes: self.nodes.clone(),
			edges: self.edges.clone(),
			updated_at: None,
		}
	}

	fn validate(
		&self,
		entities: &[ExtractedEntity],
		relations: &[ExtractedRelation],
	) -> Result<Vec<RelationKind>> {
		let mut batch_keys = HashSet::new();

		for (entity_idx, entity) in entities.iter().enumerate() {
			if entity.key.name.trim().is_empty() {
				return Err(Error::InvalidArgument(format!(
					"entities[{entity_idx}].name must be non-empty."
				)));
			}

			batch_keys.insert(&entity.key);
		}

		let known =
			|key: &EntityKey| self.node_index.contains_key(key) || batch_keys.contains(key);
		let mut kinds = Vec::with_capacity(relations.len());

		for (relation_idx, relation) in relations.iter().enumerate() {
			let relation_path = format!("relations[{relation_idx}]");
			let kind = RelationKind::from_str(&relation.relation).map_err(|_| {
				Error::InvalidArgument(format!(
					"{relation_path}.relation {:?} is not in the relation vocabulary.",
					relation.relation
				))
			})?;

			if !known(&relation.source) {
				return Err(Error::InvalidArgument(format!(
					"{relation_path}.source {} is not a known entity.",
					relation.source
				)));
			}
			if !known(&relation.target) {
				return Err(Error::InvalidArgument(format!(
					"{relation_path}.target {} is not a known entity.",
					relation.target
				)));
			}
			if relation.source == relation.target {
				return Err(Error::InvalidArgument(format!(
					"{relation_path} must connect two distinct entities."
				)));
			}
			if !relation.confidence.is_finite() {
				return Err(Error::InvalidArgument(format!(
					"{relation_path}.confidence must be a finite number."
				)));
			}

			kinds.push(kind);
		}

		Ok(kinds)
	}
}

fn insert_alias(aliases: &mut BTreeSet<String>, alias: &str) {
	let alias = alias.trim();

	if !alias.is_empty() {
		aliases.insert(alias.to_string());
	}
}

fn merge_edge(edge: &mut GraphEdge, relation: &ExtractedRelation) {
	if let Some(record_id) = relation.evidence.record_id.as_deref() {
		edge.provenance.insert(record_id.to_string());
	}

	let sentence = relation.evidence.sentence.trim();

	if !sentence.is_empty() && edge.evidence.len() < MAX_EVIDENCE_PER_EDGE {
		edge.evidence.insert(sentence.to_string());
	}

	edge.confidence = edge.confidence.max(relation.confidence);
	edge.low_confidence = edge.low_confidence && relation.low_confidence;
}
