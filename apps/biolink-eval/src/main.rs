use clap::Parser;

use biolink_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	biolink_eval::run(args).await
}
