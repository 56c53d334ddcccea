pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = procure_cli::VERSION,
	rename_all = "kebab",
	styles = procure_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = procure_config::load(&args.config)?;
	init_tracing(&config)?;
	let api_addr: SocketAddr = config.service.api_bind.parse()?;
	if !config.service.allow_non_loopback_bind && !api_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"service.api_bind must be a loopback address unless service.allow_non_loopback_bind is true."
		));
	}
	let state = AppState::new(config).await?;
	let app = routes::router(state);

	let listener = TcpListener::bind(api_addr).await?;
	tracing::info!(%api_addr, "HTTP server listening.");
	axum::serve(listener, app).await?;

	Ok(())
}

fn init_tracing(config: &procure_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
	Ok(())
}
