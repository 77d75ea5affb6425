use clap::Parser;

use biolink_mcp::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	biolink_mcp::run(args).await
}
