use uuid::Uuid;

use crate::{EmbeddingProvider, Error, Result};
use biolink_config::EmbeddingProviderConfig;
use biolink_domain::Record;
use biolink_storage::{ScoredId, VectorEntry, VectorIndex};

/// Per-session vector index over records. Dropped with the session that created it.
pub struct SemanticIndex<'a> {
	session_id: Uuid,
	provider: &'a dyn EmbeddingProvider,
	cfg: &'a EmbeddingProviderConfig,
	vectors: VectorIndex,
}
impl<'a> SemanticIndex<'a> {
	pub fn new(
		session_id: Uuid,
		provider: &'a dyn EmbeddingProvider,
		cfg: &'a EmbeddingProviderConfig,
	) -> Self {
		Self { session_id, provider, cfg, vectors: VectorIndex::new(cfg.dimensions as usize) }
	}

	pub fn session_id(&self) -> Uuid {
		self.session_id
	}

	pub fn len(&self) -> usize {
		self.vectors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vectors.is_empty()
	}

	pub fn vector(&self, record_id: &str) -> Option<&[f32]> {
		self.vectors.get(record_id).map(|entry| entry.vector.as_slice())
	}

	/// Embeds `title + "\n" + body` of each record.
	///
	/// A bad vector anywhere in the batch adds nothing.
	pub async fn embed_and_add(&mut self, records: &[Record]) -> Result<()> {
		if records.is_empty() {
			return Ok(());
		}

		let texts: Vec<String> = records.iter().map(Record::embedding_text).collect();
		let vectors = self.embed(&texts).await?;
		let entries: Vec<VectorEntry> = records
			.iter()
			.zip(texts)
			.zip(vectors)
			.map(|((record, text), vector)| VectorEntry {
				record_id: record.id.clone(),
				vector,
				text,
			})
			.collect();

		self.vectors.check_batch(&entries)?;

		for entry in entries {
			self.vectors.upsert(entry)?;
		}

		tracing::debug!(
			session_id = %self.session_id,
			indexed = self.vectors.len(),
			"Records indexed."
		);

		Ok(())
	}

	pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredId>> {
		let vectors = self.embed(&[text.to_string()]).await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		self.query_vector(&vector, top_k)
	}

	pub fn query_vector(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredId>> {
		Ok(self.vectors.query(vector, top_k)?)
	}

	/// Calls the provider and checks count and dimension of every returned vector.
	pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let vectors = self.provider.embed(self.cfg, texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} texts.",
					vectors.len(),
					texts.len()
				),
			});
		}

		let dimensions = self.vectors.dimensions();

		if let Some(bad) = vectors.iter().find(|vector| vector.len() != dimensions) {
			return Err(Error::Provider {
				message: format!(
					"Embedding vector has {} dimensions, expected {dimensions}.",
					bad.len()
				),
			});
		}

		if vectors.iter().flatten().any(|value| !value.is_finite()) {
			return Err(Error::Provider {
				message: "Embedding vector contains non-finite values.".to_string(),
			});
		}

		Ok(vectors)
	}
}
