//! Ingestion Worker: pulls OCDS releases since each
//! source's watermark, normalises and upserts buyers/notices, raises
//! material-change alerts against the state observed before the upsert, and
//! hands matching notices to enrichment before moving on to the next
//! release. Per-release failures are isolated; the run's own status
//! reflects only whether the page fetch itself succeeded.

use procure_config::{Config, IngestionSource};
use procure_domain::{NoticeSnapshot, cpv, diff_notice, normalise_buyer, normalise_release};
use procure_storage::db::Db;
use procure_storage::mesh::InterestMesh;
use procure_storage::models::NoticeRow;
use procure_storage::queries;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{EmbeddingProvider, Result, alerts, enrichment, ocds_client};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestionReport {
	pub items_processed: i32,
	pub items_failed: i32,
}

/// Runs one incremental pull for `source`. Page-fetch failures that survive
/// `ocds_client`'s own retries fail the whole run; a single bad release
/// inside a fetched page is logged and skipped without aborting the rest.
///
/// `since_override` lets an operator re-pull a fixed window (`--days`)
/// instead of resuming from the stored watermark; `limit` (`--limit`) caps
/// how many fetched releases are processed, for bounded manual runs.
pub async fn run_incremental(
	db: &Db,
	cfg: &Config,
	mesh: &InterestMesh,
	embedding_provider: &dyn EmbeddingProvider,
	source: &IngestionSource,
	since_override: Option<OffsetDateTime>,
	limit: Option<usize>,
) -> Result<IngestionReport> {
	let log = queries::open_ingestion_log(&db.pool, &source.source_id).await?;
	let since = match since_override {
		Some(since) => since,
		None => watermark(db, source).await?,
	};

	let releases = match ocds_client::fetch_incremental(&source.base_url, since, cfg.ingestion.http_timeout_ms, &cfg.ingestion.retry).await {
		Ok(releases) => releases,
		Err(err) => {
			queries::finalize_ingestion_log(&db.pool, log.log_id, "FAILED", 0, Some(&err.to_string())).await?;
			return Err(err);
		}
	};
	let releases = match limit {
		Some(limit) => &releases[..releases.len().min(limit)],
		None => &releases[..],
	};

	let mut report = IngestionReport::default();

	for release in releases {
		match process_release(db, cfg, mesh, embedding_provider, release, false).await {
			Ok(()) => report.items_processed += 1,
			Err(err) => {
				tracing::warn!(error = %err, "Skipping release after per-item failure.");
				report.items_failed += 1;
			}
		}
	}

	queries::finalize_ingestion_log(&db.pool, log.log_id, "SUCCESS", report.items_processed, None).await?;

	Ok(report)
}

/// Keyword-driven historical backfill: same per-release pipeline, but every
/// upserted notice is force-typed `historical` regardless of its own OCDS
/// tag, since backfilled releases feed the Renewal Radar, not the live feed.
pub async fn run_historical_backfill(
	db: &Db,
	cfg: &Config,
	mesh: &InterestMesh,
	embedding_provider: &dyn EmbeddingProvider,
	source: &IngestionSource,
	keyword: &str,
	published_from: OffsetDateTime,
	published_to: OffsetDateTime,
) -> Result<IngestionReport> {
	let log = queries::open_ingestion_log(&db.pool, &format!("{}:backfill:{keyword}", source.source_id)).await?;

	let releases = match ocds_client::fetch_historical_by_keyword(
		&source.base_url,
		keyword,
		published_from,
		published_to,
		cfg.ingestion.http_timeout_ms,
		&cfg.ingestion.retry,
	)
	.await
	{
		Ok(releases) => releases,
		Err(err) => {
			queries::finalize_ingestion_log(&db.pool, log.log_id, "FAILED", 0, Some(&err.to_string())).await?;
			return Err(err);
		}
	};

	let mut report = IngestionReport::default();

	for release in &releases {
		match process_release(db, cfg, mesh, embedding_provider, release, true).await {
			Ok(()) => report.items_processed += 1,
			Err(err) => {
				tracing::warn!(error = %err, "Skipping backfilled release after per-item failure.");
				report.items_failed += 1;
			}
		}
	}

	queries::finalize_ingestion_log(&db.pool, log.log_id, "SUCCESS", report.items_processed, None).await?;

	Ok(report)
}

async fn watermark(db: &Db, source: &IngestionSource) -> Result<OffsetDateTime> {
	if let Some(watermark) = queries::last_successful_watermark(&db.pool, &source.source_id).await? {
		return Ok(watermark);
	}

	let epoch = OffsetDateTime::parse(&source.epoch, &time::format_description::well_known::Rfc3339)
		.map_err(|err| crate::Error::InvalidRequest { message: format!("Invalid source epoch {:?}: {err}", source.epoch) })?;

	Ok(epoch)
}

/// Runs the whole per-release write sequence — buyer upsert, material-change
/// alerts, notice upsert, enrichment — in a single transaction, committed
/// once the release is fully processed.
async fn process_release(
	db: &Db,
	cfg: &Config,
	mesh: &InterestMesh,
	embedding_provider: &dyn EmbeddingProvider,
	release: &Value,
	force_historical: bool,
) -> Result<()> {
	let Some(patch) = normalise_release(release) else {
		return Err(crate::Error::Validation { message: "Release is missing its ocid.".to_string() });
	};

	let mut tx = db.pool.begin().await?;

	let buyer_id = match release.get("buyer") {
		Some(buyer) if !buyer.is_null() => {
			let patch = normalise_buyer(buyer);

			Some(queries::upsert_buyer(&mut *tx, &patch.canonical_name, &patch.slug, &patch.identifiers).await?.buyer_id)
		}
		_ => None,
	};

	let existing = queries::fetch_notice(&mut *tx, &patch.ocid).await?;
	let notice_type = if force_historical { "historical".to_string() } else { patch.notice_type.clone() };

	if let Some(prior) = &existing {
		let old_snapshot = NoticeSnapshot {
			deadline_date: prior.deadline_date,
			value_amount: prior.value,
			notice_type: &prior.notice_type,
		};
		let new_snapshot = NoticeSnapshot {
			deadline_date: patch.deadline_date,
			value_amount: patch.value_amount,
			notice_type: &notice_type,
		};
		let changes = diff_notice(old_snapshot, new_snapshot, cfg.lifecycle.material_change_value_ratio);

		if !changes.is_empty() {
			alerts::process(&mut tx, &patch.ocid, &changes).await?;
		}
	}

	let row = NoticeRow {
		ocid: patch.ocid.clone(),
		release_id: patch.release_id.unwrap_or_else(|| patch.ocid.clone()),
		title: patch.title,
		description: patch.description,
		buyer_id: buyer_id.or_else(|| existing.as_ref().and_then(|prior| prior.buyer_id)),
		publication_date: patch.publication_date,
		deadline_date: patch.deadline_date,
		value: patch.value_amount,
		currency: Some(patch.value_currency),
		procurement_method: patch.procurement_method,
		notice_type,
		raw_release: patch.raw_json,
		source_url: patch.source_url,
		cpv_codes: patch.cpv_codes,
		inferred_ukcat_codes: existing.as_ref().map(|prior| prior.inferred_ukcat_codes.clone()).unwrap_or_default(),
		contract_period_start: patch.contract_period_start,
		contract_period_end: patch.contract_period_end,
		embedding: existing.as_ref().and_then(|prior| prior.embedding.clone()),
		provider_summary_embedding: existing.as_ref().and_then(|prior| prior.provider_summary_embedding.clone()),
		archived: existing.as_ref().map(|prior| prior.archived).unwrap_or(false),
		created_at: existing.as_ref().map(|prior| prior.created_at).unwrap_or_else(OffsetDateTime::now_utc),
		updated_at: OffsetDateTime::now_utc(),
	};

	queries::upsert_notice(&mut *tx, &row).await?;

	if matches_interest_mesh(db, mesh, &row).await? {
		enrichment::enrich(&mut *tx, embedding_provider, &cfg.providers.embedding, &cfg.providers.retry, &row, false).await?;
	}

	tx.commit().await?;

	Ok(())
}

/// A notice matches the mesh when it declares no CPV codes (neutral) or
/// shares a 4-char prefix with any active profile's inferred CPV list.
async fn matches_interest_mesh(db: &Db, mesh: &InterestMesh, notice: &NoticeRow) -> Result<bool> {
	if notice.cpv_codes.is_empty() {
		return Ok(true);
	}

	let mesh_prefixes = mesh.cpv_prefixes(db).await?;
	let notice_prefixes = cpv::prefixes(&notice.cpv_codes);

	Ok(notice_prefixes.iter().any(|prefix| mesh_prefixes.contains(prefix)))
}
