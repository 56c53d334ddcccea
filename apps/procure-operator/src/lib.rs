pub mod commands;

// std
use std::path::PathBuf;

// crates.io
use clap::{Parser, Subcommand};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

// self
use procure_engine::ProcureEngine;
use procure_storage::db::Db;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
	version = procure_cli::VERSION,
	rename_all = "kebab",
	styles = procure_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Applies the schema (tables, indexes, extensions) idempotently.
	InitSchema,
	/// Pulls OCDS releases for one source, or every configured source.
	Ingest {
		#[arg(long, value_name = "SOURCE_ID")]
		source: Option<String>,
		/// Re-pull this many days back instead of resuming from the stored watermark.
		#[arg(long)]
		days: Option<i64>,
		/// Cap the number of fetched releases actually processed.
		#[arg(long)]
		limit: Option<usize>,
	},
	/// Reruns the Matching Engine funnel for one profile, or every profile.
	Recalculate {
		#[arg(long, value_name = "ORG_ID")]
		org: Option<Uuid>,
	},
	/// Runs the Tier-2 Reviewer for one profile, or every profile.
	Tier2 {
		#[arg(long, value_name = "ORG_ID")]
		org: Option<Uuid>,
	},
	/// Prints the most recent ingestion log rows for a source as JSON.
	Export {
		#[arg(long, value_name = "SOURCE_ID")]
		source: String,
		#[arg(long, default_value_t = 20)]
		limit: i64,
	},
}

pub async fn run(args: Args) -> eyre::Result<()> {
	let config = procure_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;
	db.ensure_schema(config.storage.vector_dim).await?;
	let engine = ProcureEngine::new(config, db);

	match args.command {
		Command::InitSchema => commands::init_schema(&engine).await,
		Command::Ingest { source, days, limit } => {
			commands::ingest(&engine, commands::IngestOptions { source_id: source, days, limit }).await
		}
		Command::Recalculate { org } => commands::recalculate(&engine, org).await,
		Command::Tier2 { org } => commands::run_tier2(&engine, org).await,
		Command::Export { source, limit } => commands::export(&engine, &source, limit).await,
	}
}
