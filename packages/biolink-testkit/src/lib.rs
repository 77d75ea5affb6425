mod error;

pub use error::{Error, Result};

use std::{
	env, fs,
	path::{Path, PathBuf},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};

use serde_json::{Map, Value};
use uuid::Uuid;

use biolink_config::{
	Config, EmbeddingProviderConfig, Graph, LlmProviderConfig, Matching, PubmedRegistry,
	TrialsRegistry,
};
use biolink_domain::{Record, Source, fields, text};
use biolink_service::{
	BioLinkService, BoxFuture, ClassifierProvider, EmbeddingProvider, Providers, RecordSource,
};
use biolink_storage::MemoryGraphStore;

pub const TEST_DIMENSIONS: u32 = 64;

/// Scratch directory removed on drop.
pub struct TestDir {
	path: PathBuf,
	cleaned: bool,
}
impl TestDir {
	pub fn new(prefix: &str) -> Result<Self> {
		let path = env::temp_dir().join(format!("{prefix}_{}", Uuid::new_v4().simple()));

		fs::create_dir_all(&path)?;

		Ok(Self { path, cleaned: false })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner()
	}

	fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		fs::remove_dir_all(&self.path)?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDir {
	fn drop(&mut self) {
		if let Err(err) = self.cleanup_inner() {
			eprintln!("Test directory cleanup failed: {err}.");
		}
	}
}

/// Deterministic bag-of-words embedding: each normalized word lands in a blake3-chosen bucket.
pub struct HashEmbedding {
	pub dimensions: u32,
	pub calls: Arc<AtomicUsize>,
}
impl HashEmbedding {
	pub fn new(dimensions: u32) -> Self {
		Self { dimensions, calls: Arc::new(AtomicUsize::new(0)) }
	}

	pub fn vector(&self, input: &str) -> Vec<f32> {
		let dimensions = self.dimensions.max(1) as usize;
		let mut vector = vec![0.0_f32; dimensions];

		for word in text::normalize_text(input).split(' ').filter(|word| !word.is_empty()) {
			let hash = blake3::hash(word.as_bytes());
			let bytes = hash.as_bytes();
			let bucket = u64::from_le_bytes([
				bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
			]) % dimensions as u64;

			vector[bucket as usize] += 1.0;
		}

		let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();

		if norm > 0.0 {
			for value in &mut vector {
				*value /= norm;
			}
		}

		vector
	}
}

impl EmbeddingProvider for HashEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vectors = texts.iter().map(|text| self.vector(text)).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

/// Returns vectors one element short of the configured dimension.
pub struct ShortEmbedding;

impl EmbeddingProvider for ShortEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Vec<f32>>>> {
		let len = (cfg.dimensions as usize).saturating_sub(1);
		let vectors = texts.iter().map(|_| vec![0.5; len]).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

/// Replies with the same JSON document for every question.
pub struct StaticClassifier {
	pub reply: Value,
	pub calls: Arc<AtomicUsize>,
}
impl StaticClassifier {
	pub fn new(reply: Value) -> Self {
		Self { reply, calls: Arc::new(AtomicUsize::new(0)) }
	}

	pub fn actions(actions: &[&str]) -> Self {
		Self::new(serde_json::json!({ "actions": actions }))
	}
}

impl ClassifierProvider for StaticClassifier {
	fn classify<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, biolink_providers::Result<Value>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let reply = self.reply.clone();

		Box::pin(async move { Ok(reply) })
	}
}

pub struct FailingClassifier {
	pub calls: Arc<AtomicUsize>,
}
impl FailingClassifier {
	pub fn new() -> Self {
		Self { calls: Arc::new(AtomicUsize::new(0)) }
	}
}

impl Default for FailingClassifier {
	fn default() -> Self {
		Self::new()
	}
}

impl ClassifierProvider for FailingClassifier {
	fn classify<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, biolink_providers::Result<Value>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			Err(biolink_providers::Error::InvalidResponse {
				message: "Classifier is unavailable.".to_string(),
			})
		})
	}
}

/// Serves fixed trials and papers, truncated to the requested count.
#[derive(Default)]
pub struct StaticRecordSource {
	pub trials: Vec<Record>,
	pub papers: Vec<Record>,
	pub fail_papers: bool,
	pub trial_calls: Arc<AtomicUsize>,
	pub paper_calls: Arc<AtomicUsize>,
}
impl StaticRecordSource {
	pub fn new(trials: Vec<Record>, papers: Vec<Record>) -> Self {
		Self { trials, papers, ..Default::default() }
	}

	pub fn with_paper_failure(mut self) -> Self {
		self.fail_papers = true;

		self
	}
}

impl RecordSource for StaticRecordSource {
	fn fetch_trials<'a>(
		&'a self,
		_cfg: &'a TrialsRegistry,
		_condition: &'a str,
		limit: u32,
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Record>>> {
		self.trial_calls.fetch_add(1, Ordering::SeqCst);

		let records = self.trials.iter().take(limit as usize).cloned().collect();

		Box::pin(async move { Ok(records) })
	}

	fn fetch_papers<'a>(
		&'a self,
		_cfg: &'a PubmedRegistry,
		_topic: &'a str,
		max_results: u32,
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Record>>> {
		self.paper_calls.fetch_add(1, Ordering::SeqCst);

		if self.fail_papers {
			return Box::pin(async move {
				Err(biolink_providers::Error::InvalidResponse {
					message: "PubMed is unavailable.".to_string(),
				})
			});
		}

		let records = self.papers.iter().take(max_results as usize).cloned().collect();

		Box::pin(async move { Ok(records) })
	}
}

pub fn test_config() -> Config {
	Config {
		service: biolink_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			mcp_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		providers: biolink_config::Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: String::new(),
				path: "/embeddings".to_string(),
				model: "hash".to_string(),
				dimensions: TEST_DIMENSIONS,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			router: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: String::new(),
				path: "/chat/completions".to_string(),
				model: "static".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		registries: biolink_config::Registries {
			trials: TrialsRegistry {
				api_base: "http://127.0.0.1:1".to_string(),
				timeout_ms: 1_000,
				max_page_size: 100,
			},
			pubmed: PubmedRegistry {
				api_base: "http://127.0.0.1:1".to_string(),
				email: None,
				tool: "biolink-test".to_string(),
				timeout_ms: 1_000,
			},
		},
		matching: Matching::default(),
		graph: Graph::default(),
		mcp: None,
	}
}

pub fn providers(
	classifier: Arc<dyn ClassifierProvider>,
	records: Arc<dyn RecordSource>,
) -> Providers {
	Providers::new(Arc::new(HashEmbedding::new(TEST_DIMENSIONS)), classifier, records)
}

/// Service over the given providers and an in-memory graph store.
pub fn service(cfg: Config, providers: Providers) -> BioLinkService {
	BioLinkService::with_providers(cfg, providers, Arc::new(MemoryGraphStore::new()))
}

/// Two lung cancer trials differing only in their upper age bound.
pub fn lung_cancer_trials() -> Vec<Record> {
	vec![
		Record::new(
			"NCT00000001",
			Source::Trial,
			"Osimertinib for early lung cancer",
			"Inclusion Criteria:\nAdults aged 18 to 65 with lung cancer.\nECOG performance status 0-1.",
		)
		.with_field(fields::AGE_MIN, "18 Years")
		.with_field(fields::AGE_MAX, "65 Years")
		.with_field(fields::SEX, "ALL")
		.with_field(fields::COUNTRIES, vec!["United States".to_string()]),
		Record::new(
			"NCT00000002",
			Source::Trial,
			"Immunotherapy for advanced lung cancer",
			"Inclusion Criteria:\nHistologically confirmed lung cancer.\nAge 18 to 80 years.",
		)
		.with_field(fields::AGE_MIN, "18 Years")
		.with_field(fields::AGE_MAX, "80 Years")
		.with_field(fields::SEX, "ALL")
		.with_field(fields::COUNTRIES, vec!["United States".to_string(), "Canada".to_string()]),
	]
}

/// Independent passages that both tie osimertinib to EGFR.
pub fn egfr_papers() -> Vec<Record> {
	vec![
		Record::new(
			"PMID-1001",
			Source::Paper,
			"Third-generation EGFR inhibitors",
			"Osimertinib irreversibly inhibits EGFR with the T790M mutation.",
		)
		.with_field(fields::JOURNAL, "Lung Cancer Research")
		.with_field(fields::YEAR, 2021.0),
		Record::new(
			"PMID-1002",
			Source::Paper,
			"Resistance mechanisms",
			"Acquired resistance limits how long osimertinib keeps EGFR signaling suppressed.",
		)
		.with_field(fields::JOURNAL, "Thoracic Oncology")
		.with_field(fields::YEAR, 2022.0),
	]
}
