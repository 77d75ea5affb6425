pub mod answer;
pub mod execute;
pub mod graph;
pub mod index;
pub mod matching;
pub mod router;

mod error;

pub use answer::FinalAnswer;
pub use error::{Error, Result};
pub use execute::{ActionOutcome, ExecutedAction, ExecutionReport};
pub use graph::{
	GraphBuildOverrides, GraphBuildReport, GraphBuildStatus, GraphFact, GraphQueryResponse,
};
pub use index::SemanticIndex;
pub use matching::{MatchRanker, MatchReport, MatchResult, MatchStatus};
pub use router::{ACTION_MENU, Action, ActionKind, RoutingDecision, ToolRouter};

use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex},
};

use serde_json::Value;

use biolink_config::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, PubmedRegistry, TrialsRegistry,
};
use biolink_domain::Record;
use biolink_providers::{classifier, embedding, pubmed, trials};
use biolink_storage::{FileGraphStore, GraphStore, MemoryGraphStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Vec<f32>>>>;
}

pub trait ClassifierProvider
where
	Self: Send + Sync,
{
	fn classify<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, biolink_providers::Result<Value>>;
}

/// Registry access. Implementations return normalized records.
pub trait RecordSource
where
	Self: Send + Sync,
{
	fn fetch_trials<'a>(
		&'a self,
		cfg: &'a TrialsRegistry,
		condition: &'a str,
		limit: u32,
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Record>>>;

	fn fetch_papers<'a>(
		&'a self,
		cfg: &'a PubmedRegistry,
		topic: &'a str,
		max_results: u32,
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Record>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub classifier: Arc<dyn ClassifierProvider>,
	pub records: Arc<dyn RecordSource>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		classifier: Arc<dyn ClassifierProvider>,
		records: Arc<dyn RecordSource>,
	) -> Self {
		Self { embedding, classifier, records }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), classifier: provider.clone(), records: provider }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl ClassifierProvider for DefaultProviders {
	fn classify<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, biolink_providers::Result<Value>> {
		Box::pin(classifier::classify(cfg, messages))
	}
}

impl RecordSource for DefaultProviders {
	fn fetch_trials<'a>(
		&'a self,
		cfg: &'a TrialsRegistry,
		condition: &'a str,
		limit: u32,
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Record>>> {
		Box::pin(trials::search(cfg, condition, limit))
	}

	fn fetch_papers<'a>(
		&'a self,
		cfg: &'a PubmedRegistry,
		topic: &'a str,
		max_results: u32,
	) -> BoxFuture<'a, biolink_providers::Result<Vec<Record>>> {
		Box::pin(pubmed::search(cfg, topic, max_results))
	}
}

pub struct BioLinkService {
	pub cfg: Config,
	pub providers: Providers,
	pub graph_store: Arc<dyn GraphStore>,
	topic_locks: TopicLocks,
}
impl BioLinkService {
	/// Uses the HTTP providers and the graph store named by `graph.store`.
	pub fn new(cfg: Config) -> Self {
		let graph_store = graph_store_for(&cfg);

		Self::with_providers(cfg, Providers::default(), graph_store)
	}

	pub fn with_providers(
		cfg: Config,
		providers: Providers,
		graph_store: Arc<dyn GraphStore>,
	) -> Self {
		Self { cfg, providers, graph_store, topic_locks: TopicLocks::default() }
	}

	/// Lock serializing every read-modify-write of one topic's graph.
	pub(crate) fn topic_lock(&self, topic: &str) -> Arc<tokio::sync::Mutex<()>> {
		self.topic_locks.acquire(topic)
	}
}

/// Per-topic async locks. Entries nobody holds are dropped on the next acquire.
#[derive(Default)]
struct TopicLocks {
	locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}
impl TopicLocks {
	fn acquire(&self, topic: &str) -> Arc<tokio::sync::Mutex<()>> {
		let mut locks = self.locks.lock().unwrap_or_else(|err| err.into_inner());

		// Only the map holds an idle entry.
		locks.retain(|key, lock| key == topic || Arc::strong_count(lock) > 1);

		locks.entry(topic.to_string()).or_default().clone()
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.locks.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}

pub fn graph_store_for(cfg: &Config) -> Arc<dyn GraphStore> {
	match cfg.graph.store.as_str() {
		"file" => Arc::new(FileGraphStore::new(&cfg.graph.storage_dir)),
		_ => Arc::new(MemoryGraphStore::new()),
	}
}
