//! Operator subcommands: a small set of idempotent one-shot commands run by
//! hand or from a scheduler. Each returns a report the caller uses to decide
//! the process exit code — partial per-item failures are non-fatal as long
//! as at least one item of the run succeeded.

use color_eyre::eyre::{self, eyre};
use procure_config::Config;
use procure_engine::{ProcureEngine, ingestion, matching, tier2};
use procure_storage::queries;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub async fn init_schema(engine: &ProcureEngine) -> eyre::Result<()> {
	engine.db.ensure_schema(engine.cfg.storage.vector_dim).await?;
	tracing::info!("Schema ensured.");
	Ok(())
}

pub struct IngestOptions {
	pub source_id: Option<String>,
	pub days: Option<i64>,
	pub limit: Option<usize>,
}

pub async fn ingest(engine: &ProcureEngine, opts: IngestOptions) -> eyre::Result<()> {
	let sources = selected_sources(&engine.cfg, opts.source_id.as_deref())?;
	let since_override = opts.days.map(|days| OffsetDateTime::now_utc() - Duration::days(days));

	let mut attempted = 0usize;
	let mut succeeded = 0usize;

	for source in &sources {
		attempted += 1;

		match ingestion::run_incremental(
			&engine.db,
			&engine.cfg,
			&engine.mesh,
			engine.providers.embedding.as_ref(),
			source,
			since_override,
			opts.limit,
		)
		.await
		{
			Ok(report) => {
				tracing::info!(
					source = %source.source_id,
					processed = report.items_processed,
					failed = report.items_failed,
					"Ingestion run finished."
				);
				if report.items_processed > 0 || report.items_failed == 0 {
					succeeded += 1;
				}
			}
			Err(err) => {
				tracing::error!(source = %source.source_id, error = %err, "Ingestion run failed.");
			}
		}
	}

	require_partial_success(attempted, succeeded, "ingestion")
}

pub async fn recalculate(engine: &ProcureEngine, org: Option<Uuid>) -> eyre::Result<()> {
	let orgs = selected_orgs(&engine.db, org).await?;

	let mut attempted = 0usize;
	let mut succeeded = 0usize;

	for org_id in orgs {
		attempted += 1;

		match matching::recalculate(&engine.db, &engine.cfg, org_id).await {
			Ok(report) => {
				tracing::info!(
					org_id = %org_id,
					go = report.go,
					review = report.review,
					no_go = report.no_go,
					deleted = report.deleted,
					"Recalculation finished."
				);
				succeeded += 1;
			}
			Err(err) => {
				tracing::error!(org_id = %org_id, error = %err, "Recalculation failed.");
			}
		}
	}

	require_partial_success(attempted, succeeded, "recalculate")
}

pub async fn run_tier2(engine: &ProcureEngine, org: Option<Uuid>) -> eyre::Result<()> {
	let orgs = selected_orgs(&engine.db, org).await?;

	let mut attempted = 0usize;
	let mut succeeded = 0usize;

	for org_id in orgs {
		attempted += 1;

		match tier2::review(&engine.db, &engine.cfg, engine.providers.chat.as_ref(), org_id).await {
			Ok(report) => {
				tracing::info!(org_id = %org_id, pass = report.pass, fail = report.fail, "Tier-2 review finished.");
				succeeded += 1;
			}
			Err(err) => {
				tracing::error!(org_id = %org_id, error = %err, "Tier-2 review failed.");
			}
		}
	}

	require_partial_success(attempted, succeeded, "tier2")
}

#[derive(Debug, Serialize)]
struct IngestionLogEntry {
	log_id: Uuid,
	source: String,
	started_at: String,
	completed_at: Option<String>,
	status: String,
	items_processed: i32,
	error_detail: Option<String>,
}

pub async fn export(engine: &ProcureEngine, source_id: &str, limit: i64) -> eyre::Result<()> {
	let rows = queries::recent_ingestion_logs_by_source(&engine.db.pool, source_id, limit).await?;
	let entries: Vec<IngestionLogEntry> = rows
		.into_iter()
		.map(|row| {
			Ok(IngestionLogEntry {
				log_id: row.log_id,
				source: row.source,
				started_at: format_timestamp(row.started_at)?,
				completed_at: row.completed_at.map(format_timestamp).transpose()?,
				status: row.status,
				items_processed: row.items_processed,
				error_detail: row.error_detail,
			})
		})
		.collect::<eyre::Result<Vec<_>>>()?;

	println!("{}", serde_json::to_string_pretty(&entries)?);
	Ok(())
}

fn format_timestamp(ts: OffsetDateTime) -> eyre::Result<String> {
	ts.format(&time::format_description::well_known::Rfc3339).map_err(|err| eyre!("Failed to format timestamp: {err}"))
}

fn selected_sources(cfg: &Config, source_id: Option<&str>) -> eyre::Result<Vec<procure_config::IngestionSource>> {
	match source_id {
		None => Ok(cfg.ingestion.sources.clone()),
		Some(id) => {
			let source = cfg.ingestion.sources.iter().find(|source| source.source_id == id).cloned();

			source.map(|source| vec![source]).ok_or_else(|| eyre!("Unknown ingestion source {id:?}."))
		}
	}
}

async fn selected_orgs(db: &procure_storage::db::Db, org: Option<Uuid>) -> eyre::Result<Vec<Uuid>> {
	match org {
		Some(org_id) => Ok(vec![org_id]),
		None => {
			let profiles = queries::list_service_profiles(&db.pool).await?;
			Ok(profiles.into_iter().map(|profile| profile.org_id).collect())
		}
	}
}

/// Partial per-item failures are non-fatal; the run only fails when every
/// attempted item failed. Nothing attempted is a no-op success.
fn require_partial_success(attempted: usize, succeeded: usize, label: &str) -> eyre::Result<()> {
	if attempted > 0 && succeeded == 0 {
		return Err(eyre!("All {attempted} {label} run(s) failed."));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn require_partial_success_passes_with_one_success() {
		assert!(require_partial_success(3, 1, "test").is_ok());
	}

	#[test]
	fn require_partial_success_fails_when_all_failed() {
		assert!(require_partial_success(3, 0, "test").is_err());
	}

	#[test]
	fn require_partial_success_is_a_no_op_when_nothing_attempted() {
		assert!(require_partial_success(0, 0, "test").is_ok());
	}
}
