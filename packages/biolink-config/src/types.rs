use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	pub registries: Registries,
	#[serde(default)]
	pub matching: Matching,
	#[serde(default)]
	pub graph: Graph,
	pub mcp: Option<McpContext>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub mcp_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct McpContext {
	/// Base URL of the HTTP API the MCP adapter forwards to. Defaults to `service.http_bind`.
	pub api_base: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub router: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// May be empty for local providers; no authorization header is sent then.
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Registries {
	pub trials: TrialsRegistry,
	pub pubmed: PubmedRegistry,
}

#[derive(Debug, Deserialize)]
pub struct TrialsRegistry {
	#[serde(default = "default_trials_api_base")]
	pub api_base: String,
	pub timeout_ms: u64,
	#[serde(default = "default_max_page_size")]
	pub max_page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct PubmedRegistry {
	#[serde(default = "default_pubmed_api_base")]
	pub api_base: String,
	/// Contact address NCBI asks E-utilities clients to send.
	pub email: Option<String>,
	#[serde(default = "default_pubmed_tool")]
	pub tool: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Matching {
	/// Number of trials fetched from the registry before filtering.
	pub candidate_limit: u32,
	pub default_top_k: u32,
	pub snippet_max_chars: usize,
	/// Score subtracted per eligibility dimension the record could not answer.
	pub unknown_penalty: f32,
}
impl Default for Matching {
	fn default() -> Self {
		Self { candidate_limit: 50, default_top_k: 5, snippet_max_chars: 300, unknown_penalty: 0.0 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Graph {
	/// Either "memory" or "file".
	pub store: String,
	pub storage_dir: String,
	pub max_papers: u32,
	pub max_trials: u32,
	pub include_trials: bool,
	/// Maximum word distance between two entity spans before a relation is low confidence.
	pub proximity_window: usize,
	pub accept_low_confidence: bool,
}
impl Default for Graph {
	fn default() -> Self {
		Self {
			store: "memory".to_string(),
			storage_dir: "data/graphs".to_string(),
			max_papers: 10,
			max_trials: 10,
			include_trials: true,
			proximity_window: 12,
			accept_low_confidence: true,
		}
	}
}

fn default_trials_api_base() -> String {
	"https://clinicaltrials.gov/api/v2".to_string()
}

fn default_max_page_size() -> u32 {
	100
}

fn default_pubmed_api_base() -> String {
	"https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

fn default_pubmed_tool() -> String {
	"biolink".to_string()
}
