mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Graph, LlmProviderConfig, Matching, McpContext, Providers,
	PubmedRegistry, Registries, Service, TrialsRegistry,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.mcp_bind", &cfg.service.mcp_bind),
		("service.log_level", &cfg.service.log_level),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.router.timeout_ms", cfg.providers.router.timeout_ms),
		("registries.trials.timeout_ms", cfg.registries.trials.timeout_ms),
		("registries.pubmed.timeout_ms", cfg.registries.pubmed.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	let temperature = cfg.providers.router.temperature;

	if !temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.router.temperature must be a finite number.".to_string(),
		});
	}
	if !(0.0..=2.0).contains(&temperature) {
		return Err(Error::Validation {
			message: "providers.router.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}

	for (label, api_base) in [
		("providers.embedding.api_base", &cfg.providers.embedding.api_base),
		("providers.router.api_base", &cfg.providers.router.api_base),
		("registries.trials.api_base", &cfg.registries.trials.api_base),
		("registries.pubmed.api_base", &cfg.registries.pubmed.api_base),
	] {
		if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
			return Err(Error::Validation {
				message: format!("{label} must start with http:// or https://."),
			});
		}
	}

	for (label, headers) in [
		("providers.embedding.default_headers", &cfg.providers.embedding.default_headers),
		("providers.router.default_headers", &cfg.providers.router.default_headers),
	] {
		if headers.values().any(|value| !value.is_string()) {
			return Err(Error::Validation {
				message: format!("{label} values must be strings."),
			});
		}
	}

	if cfg.registries.trials.max_page_size == 0 {
		return Err(Error::Validation {
			message: "registries.trials.max_page_size must be greater than zero.".to_string(),
		});
	}

	validate_matching(&cfg.matching)?;
	validate_graph(&cfg.graph)?;

	if let Some(mcp) = cfg.mcp.as_ref()
		&& let Some(api_base) = mcp.api_base.as_deref()
		&& api_base.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "mcp.api_base must be non-empty when set.".to_string(),
		});
	}

	Ok(())
}

fn validate_matching(matching: &Matching) -> Result<()> {
	if matching.candidate_limit == 0 {
		return Err(Error::Validation {
			message: "matching.candidate_limit must be greater than zero.".to_string(),
		});
	}
	if matching.default_top_k == 0 {
		return Err(Error::Validation {
			message: "matching.default_top_k must be greater than zero.".to_string(),
		});
	}
	if matching.default_top_k > matching.candidate_limit {
		return Err(Error::Validation {
			message: "matching.default_top_k must not exceed matching.candidate_limit.".to_string(),
		});
	}
	if matching.snippet_max_chars < 16 {
		return Err(Error::Validation {
			message: "matching.snippet_max_chars must be at least 16.".to_string(),
		});
	}
	if !matching.unknown_penalty.is_finite() {
		return Err(Error::Validation {
			message: "matching.unknown_penalty must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&matching.unknown_penalty) {
		return Err(Error::Validation {
			message: "matching.unknown_penalty must be in the range 0.0-1.0.".to_string(),
		});
	}

	Ok(())
}

fn validate_graph(graph: &Graph) -> Result<()> {
	match graph.store.as_str() {
		"memory" => {},
		"file" =>
			if graph.storage_dir.trim().is_empty() {
				return Err(Error::Validation {
					message: "graph.storage_dir must be non-empty when graph.store is file."
						.to_string(),
				});
			},
		_ => {
			return Err(Error::Validation {
				message: "graph.store must be one of memory or file.".to_string(),
			});
		},
	}

	if graph.proximity_window == 0 {
		return Err(Error::Validation {
			message: "graph.proximity_window must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in [
		&mut cfg.providers.embedding.api_base,
		&mut cfg.providers.router.api_base,
		&mut cfg.registries.trials.api_base,
		&mut cfg.registries.pubmed.api_base,
	] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	if cfg.registries.pubmed.email.as_deref().map(|email| email.trim().is_empty()).unwrap_or(false)
	{
		cfg.registries.pubmed.email = None;
	}

	cfg.graph.store = cfg.graph.store.trim().to_ascii_lowercase();
}
