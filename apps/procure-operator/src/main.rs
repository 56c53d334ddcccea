use clap::Parser;
use procure_operator::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	procure_operator::run(args).await
}
