use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = biolink_api::Args::parse();
	biolink_api::run(args).await
}
