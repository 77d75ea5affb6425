use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use biolink_config::Config;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root.as_table_mut().expect("Template config must be a table.");
	let section = table
		.get_mut(section)
		.and_then(Value::as_table_mut)
		.expect("Template config must include the requested section.");

	section.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("biolink_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_normalizes() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = biolink_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected sample config to load.");

	assert_eq!(cfg.providers.embedding.api_base, "https://api.openai.com/v1");
	assert_eq!(cfg.registries.pubmed.email, None);
	assert_eq!(cfg.registries.pubmed.tool, "biolink");
	assert_eq!(cfg.registries.trials.max_page_size, 100);
	assert_eq!(cfg.graph.store, "file");
	assert!(cfg.graph.accept_low_confidence);
}

#[test]
fn missing_matching_and_graph_sections_use_defaults() {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root.as_table_mut().expect("Template config must be a table.");

	table.remove("matching");
	table.remove("graph");

	let cfg: Config = root.try_into().expect("Failed to deserialize config.");

	assert_eq!(cfg.matching.default_top_k, 5);
	assert_eq!(cfg.matching.snippet_max_chars, 300);
	assert_eq!(cfg.graph.max_papers, 10);
	assert_eq!(cfg.graph.max_trials, 10);
	assert_eq!(cfg.graph.store, "memory");
	assert!(biolink_config::validate(&cfg).is_ok());
}

#[test]
fn embedding_dimensions_must_be_positive() {
	let mut cfg = base_config();

	cfg.providers.embedding.dimensions = 0;

	let err = biolink_config::validate(&cfg).expect_err("Expected dimensions validation error.");

	assert!(
		err.to_string().contains("providers.embedding.dimensions must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn top_k_must_not_exceed_candidate_limit() {
	let payload = sample_toml_with("matching", "default_top_k", Value::Integer(80));
	let path = write_temp_config(payload);
	let result = biolink_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected top_k validation error.");

	assert!(
		err.to_string()
			.contains("matching.default_top_k must not exceed matching.candidate_limit."),
		"Unexpected error: {err}"
	);
}

#[test]
fn unknown_penalty_must_be_in_range() {
	let mut cfg = base_config();

	cfg.matching.unknown_penalty = 1.5;

	let err = biolink_config::validate(&cfg).expect_err("Expected penalty validation error.");

	assert!(
		err.to_string().contains("matching.unknown_penalty must be in the range 0.0-1.0."),
		"Unexpected error: {err}"
	);
}

#[test]
fn graph_store_must_be_known() {
	let payload = sample_toml_with("graph", "store", Value::String("postgres".to_string()));
	let path = write_temp_config(payload);
	let result = biolink_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected graph store validation error.");

	assert!(
		err.to_string().contains("graph.store must be one of memory or file."),
		"Unexpected error: {err}"
	);
}

#[test]
fn registry_api_base_requires_http_scheme() {
	let mut cfg = base_config();

	cfg.registries.trials.api_base = "clinicaltrials.gov/api/v2".to_string();

	let err = biolink_config::validate(&cfg).expect_err("Expected api_base validation error.");

	assert!(
		err.to_string().contains("registries.trials.api_base must start with http:// or https://."),
		"Unexpected error: {err}"
	);
}

#[test]
fn router_temperature_must_be_in_range() {
	let mut cfg = base_config();

	cfg.providers.router.temperature = 3.0;

	let err = biolink_config::validate(&cfg).expect_err("Expected temperature validation error.");

	assert!(
		err.to_string().contains("providers.router.temperature must be in the range 0.0-2.0."),
		"Unexpected error: {err}"
	);
}

#[test]
fn non_string_default_headers_are_rejected() {
	let mut cfg = base_config();

	cfg.providers.embedding.default_headers.insert("X-Retries".to_string(), serde_json::json!(3));

	let err = biolink_config::validate(&cfg).expect_err("Expected header validation error.");

	assert!(
		err.to_string().contains("providers.embedding.default_headers values must be strings."),
		"Unexpected error: {err}"
	);
}

#[test]
fn missing_file_reports_read_error() {
	let mut path = env::temp_dir();

	path.push("biolink_config_test_missing.toml");

	let err = biolink_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, biolink_config::Error::ReadConfig { .. }), "Unexpected error: {err}");
}
