pub mod server;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use biolink_config::McpContext;

#[derive(Debug, Parser)]
#[command(
	version = biolink_cli::VERSION,
	rename_all = "kebab",
	styles = biolink_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> Result<()> {
	let config = biolink_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	enforce_loopback(&config.service.mcp_bind)?;

	let api_base = api_base(&config.service.http_bind, config.mcp.as_ref());

	server::serve_mcp(&config.service.mcp_bind, &api_base).await
}

/// Explicit `mcp.api_base`, else the API's own bind address.
fn api_base(http_bind: &str, mcp: Option<&McpContext>) -> String {
	mcp.and_then(|mcp| mcp.api_base.as_deref())
		.map(str::trim)
		.filter(|base| !base.is_empty())
		.unwrap_or(http_bind)
		.to_string()
}

// The adapter has no authentication, so it only listens on loopback.
fn enforce_loopback(mcp_bind: &str) -> Result<()> {
	let bind_addr: SocketAddr = mcp_bind
		.parse()
		.map_err(|err| eyre::eyre!("service.mcp_bind must be a valid socket address: {err}"))?;

	if !bind_addr.ip().is_loopback() {
		return Err(eyre::eyre!("service.mcp_bind must be a loopback address."));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::{api_base, enforce_loopback};
	use biolink_config::McpContext;

	#[test]
	fn mcp_bind_must_be_loopback() {
		let err = enforce_loopback("0.0.0.0:9090").expect_err("expected error");

		assert!(err.to_string().contains("loopback"), "unexpected error: {err}");
		assert!(enforce_loopback("127.0.0.1:9090").is_ok());
		assert!(enforce_loopback("not an address").is_err());
	}

	#[test]
	fn api_base_defaults_to_http_bind() {
		let blank = McpContext { api_base: Some(" ".to_string()) };
		let explicit = McpContext { api_base: Some("http://api.internal:8080".to_string()) };

		assert_eq!(api_base("0.0.0.0:8080", None), "0.0.0.0:8080");
		assert_eq!(api_base("0.0.0.0:8080", Some(&blank)), "0.0.0.0:8080");
		assert_eq!(api_base("0.0.0.0:8080", Some(&explicit)), "http://api.internal:8080");
	}
}
