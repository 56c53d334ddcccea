// crates.io
use clap::Parser;
// self
use procure_api::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	procure_api::run(args).await
}
