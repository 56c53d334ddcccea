use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::Db;
use crate::models::{AlertRow, BuyerRow, HistoricalAwardRow, IngestionLogRow, NoticeMatchRow, NoticeRow, ServiceProfileRow};
use crate::Result;

/// Every function here takes `impl PgExecutor<'_>` rather than `&Db`, so a
/// caller that needs several writes to land atomically can thread the same
/// `&mut *tx` through each call and commit once; a caller that just wants
/// one read or write passes `&db.pool` directly.
pub async fn upsert_buyer(
	executor: impl PgExecutor<'_>,
	canonical_name: &str,
	slug: &str,
	identifiers: &Value,
) -> Result<BuyerRow> {
	let row = sqlx::query_as::<_, BuyerRow>(
		"INSERT INTO buyers (canonical_name, slug, identifiers) VALUES ($1, $2, $3) \
		 ON CONFLICT (slug) DO UPDATE SET canonical_name = EXCLUDED.canonical_name, \
		 identifiers = EXCLUDED.identifiers, updated_at = now() \
		 RETURNING buyer_id, canonical_name, slug, identifiers, created_at, updated_at",
	)
	.bind(canonical_name)
	.bind(slug)
	.bind(identifiers)
	.fetch_one(executor)
	.await?;

	Ok(row)
}

/// Upserts a notice keyed by OCID. Only the mutable columns named in the
/// protocol are overwritten on conflict — `created_at` and `ocid` itself
/// never change.
pub async fn upsert_notice(executor: impl PgExecutor<'_>, notice: &NoticeRow) -> Result<()> {
	sqlx::query(
		"INSERT INTO notices (ocid, release_id, title, description, buyer_id, publication_date, \
		 deadline_date, value, currency, procurement_method, notice_type, raw_release, source_url, \
		 cpv_codes, inferred_ukcat_codes, contract_period_start, contract_period_end, embedding, \
		 provider_summary_embedding, archived) \
		 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20) \
		 ON CONFLICT (ocid) DO UPDATE SET \
		 release_id = EXCLUDED.release_id, title = EXCLUDED.title, description = EXCLUDED.description, \
		 buyer_id = EXCLUDED.buyer_id, deadline_date = EXCLUDED.deadline_date, value = EXCLUDED.value, \
		 currency = EXCLUDED.currency, procurement_method = EXCLUDED.procurement_method, \
		 notice_type = EXCLUDED.notice_type, raw_release = EXCLUDED.raw_release, \
		 source_url = EXCLUDED.source_url, cpv_codes = EXCLUDED.cpv_codes, \
		 inferred_ukcat_codes = EXCLUDED.inferred_ukcat_codes, \
		 contract_period_start = EXCLUDED.contract_period_start, \
		 contract_period_end = EXCLUDED.contract_period_end, embedding = EXCLUDED.embedding, \
		 provider_summary_embedding = EXCLUDED.provider_summary_embedding, \
		 archived = EXCLUDED.archived, updated_at = now()",
	)
	.bind(&notice.ocid)
	.bind(&notice.release_id)
	.bind(&notice.title)
	.bind(&notice.description)
	.bind(notice.buyer_id)
	.bind(notice.publication_date)
	.bind(notice.deadline_date)
	.bind(notice.value)
	.bind(&notice.currency)
	.bind(&notice.procurement_method)
	.bind(&notice.notice_type)
	.bind(&notice.raw_release)
	.bind(&notice.source_url)
	.bind(&notice.cpv_codes)
	.bind(&notice.inferred_ukcat_codes)
	.bind(notice.contract_period_start)
	.bind(notice.contract_period_end)
	.bind(&notice.embedding)
	.bind(&notice.provider_summary_embedding)
	.bind(notice.archived)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_notice(executor: impl PgExecutor<'_>, ocid: &str) -> Result<Option<NoticeRow>> {
	let row = sqlx::query_as::<_, NoticeRow>("SELECT * FROM notices WHERE ocid = $1")
		.bind(ocid)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Enrichment Service's only write: sets `embedding` and
/// `inferred_ukcat_codes` without touching any other column.
pub async fn update_enrichment(
	executor: impl PgExecutor<'_>,
	ocid: &str,
	embedding: Option<&pgvector::Vector>,
	inferred_ukcat_codes: &[String],
) -> Result<()> {
	sqlx::query("UPDATE notices SET embedding = $1, inferred_ukcat_codes = $2, updated_at = now() WHERE ocid = $3")
		.bind(embedding)
		.bind(inferred_ukcat_codes)
		.bind(ocid)
		.execute(executor)
		.await?;

	Ok(())
}

/// Renewal Radar's history lookup: historical notices for `buyer_id` sharing
/// any 4-char CPV prefix with `cpv_prefixes`, newest-award first, capped at
/// `limit`. `awards` carries each notice's raw OCDS `awards` array, the
/// source the Renewal Radar reads supplier names from.
pub async fn historical_notices_by_cpv_prefix(
	executor: impl PgExecutor<'_>,
	buyer_id: Uuid,
	cpv_prefixes: &[String],
	limit: i64,
) -> Result<Vec<HistoricalAwardRow>> {
	let rows = sqlx::query_as::<_, HistoricalAwardRow>(
		"SELECT ocid, publication_date, \
		 COALESCE(raw_release -> 'awards', '[]'::jsonb) AS awards \
		 FROM notices \
		 WHERE buyer_id = $1 AND notice_type = 'historical' \
		 AND EXISTS ( \
		   SELECT 1 FROM unnest(cpv_codes) code \
		   WHERE left(code, 4) = ANY($2) \
		 ) \
		 ORDER BY publication_date DESC \
		 LIMIT $3",
	)
	.bind(buyer_id)
	.bind(cpv_prefixes)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn fetch_service_profile(executor: impl PgExecutor<'_>, org_id: Uuid) -> Result<Option<ServiceProfileRow>> {
	let row = sqlx::query_as::<_, ServiceProfileRow>("SELECT * FROM service_profiles WHERE org_id = $1")
		.bind(org_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// All profiles, used to rebuild the Interest Mesh and to drive a
/// recalculate-all-profiles run.
pub async fn list_service_profiles(executor: impl PgExecutor<'_>) -> Result<Vec<ServiceProfileRow>> {
	let rows = sqlx::query_as::<_, ServiceProfileRow>("SELECT * FROM service_profiles ORDER BY org_id")
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn upsert_service_profile(executor: impl PgExecutor<'_>, profile: &ServiceProfileRow) -> Result<()> {
	sqlx::query(
		"INSERT INTO service_profiles (org_id, charity_number, name, latest_income, mission, vision, \
		 programs, target_population, themes, beneficiary_groups, inferred_cpv_codes, regions, \
		 min_contract_value, max_contract_value, exclusion_keywords, embedding) \
		 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16) \
		 ON CONFLICT (org_id) DO UPDATE SET \
		 charity_number = EXCLUDED.charity_number, name = EXCLUDED.name, \
		 latest_income = EXCLUDED.latest_income, mission = EXCLUDED.mission, vision = EXCLUDED.vision, \
		 programs = EXCLUDED.programs, target_population = EXCLUDED.target_population, \
		 themes = EXCLUDED.themes, beneficiary_groups = EXCLUDED.beneficiary_groups, \
		 inferred_cpv_codes = EXCLUDED.inferred_cpv_codes, regions = EXCLUDED.regions, \
		 min_contract_value = EXCLUDED.min_contract_value, max_contract_value = EXCLUDED.max_contract_value, \
		 exclusion_keywords = EXCLUDED.exclusion_keywords, embedding = EXCLUDED.embedding, \
		 updated_at = now()",
	)
	.bind(profile.org_id)
	.bind(&profile.charity_number)
	.bind(&profile.name)
	.bind(profile.latest_income)
	.bind(&profile.mission)
	.bind(&profile.vision)
	.bind(&profile.programs)
	.bind(&profile.target_population)
	.bind(&profile.themes)
	.bind(&profile.beneficiary_groups)
	.bind(&profile.inferred_cpv_codes)
	.bind(&profile.regions)
	.bind(profile.min_contract_value)
	.bind(profile.max_contract_value)
	.bind(&profile.exclusion_keywords)
	.bind(&profile.embedding)
	.execute(executor)
	.await?;

	Ok(())
}

/// Upserts only the mechanical fields of a match — score, sub-scores,
/// verdict, risk flags, checklist, recommendation reasons. Never touches
/// `tier2_verdict`/`tier2_rationale`; those are only ever written by
/// [`set_tier2_verdict`].
pub async fn upsert_match_mechanical(executor: impl PgExecutor<'_>, row: &NoticeMatchRow) -> Result<()> {
	sqlx::query(
		"INSERT INTO notice_matches (org_id, ocid, score, score_semantic, score_domain, score_theme, \
		 score_geo, verdict, viability_warning, risk_flags, checklist, recommendation_reasons, tracked) \
		 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13) \
		 ON CONFLICT (org_id, ocid) DO UPDATE SET \
		 score = EXCLUDED.score, score_semantic = EXCLUDED.score_semantic, \
		 score_domain = EXCLUDED.score_domain, score_theme = EXCLUDED.score_theme, \
		 score_geo = EXCLUDED.score_geo, verdict = EXCLUDED.verdict, \
		 viability_warning = EXCLUDED.viability_warning, risk_flags = EXCLUDED.risk_flags, \
		 checklist = EXCLUDED.checklist, recommendation_reasons = EXCLUDED.recommendation_reasons",
	)
	.bind(row.org_id)
	.bind(&row.ocid)
	.bind(row.score)
	.bind(row.score_semantic)
	.bind(row.score_domain)
	.bind(row.score_theme)
	.bind(row.score_geo)
	.bind(&row.verdict)
	.bind(&row.viability_warning)
	.bind(&row.risk_flags)
	.bind(&row.checklist)
	.bind(&row.recommendation_reasons)
	.bind(row.tracked)
	.execute(executor)
	.await?;

	Ok(())
}

/// Deletes matches for `org_id` that are not in `keep_ocids`, skipping any
/// row whose Tier-2 verdict has already been set — those survive a funnel
/// rerun even if they no longer pass the gates.
pub async fn delete_stale_matches(executor: impl PgExecutor<'_>, org_id: Uuid, keep_ocids: &[String]) -> Result<u64> {
	let result = sqlx::query(
		"DELETE FROM notice_matches \
		 WHERE org_id = $1 AND tier2_verdict IS NULL AND NOT (ocid = ANY($2))",
	)
	.bind(org_id)
	.bind(keep_ocids)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Records a Tier-2 verdict. This is the only writer of these two columns —
/// a review always sets a concrete PASS/FAIL, never clears one back to null,
/// which is what keeps a set verdict surviving a funnel rerun's mechanical
/// upsert (see `upsert_match_mechanical`, which never touches these columns).
pub async fn set_tier2_verdict(
	executor: impl PgExecutor<'_>,
	org_id: Uuid,
	ocid: &str,
	verdict: &str,
	rationale: &str,
) -> Result<()> {
	sqlx::query(
		"UPDATE notice_matches SET tier2_verdict = $1, tier2_rationale = $2 WHERE org_id = $3 AND ocid = $4",
	)
	.bind(verdict)
	.bind(rationale)
	.bind(org_id)
	.bind(ocid)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn insert_alert(executor: impl PgExecutor<'_>, alert: &AlertRow) -> Result<()> {
	sqlx::query(
		"INSERT INTO alerts (alert_id, org_id, ocid, type, severity, message, details, read) \
		 VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
	)
	.bind(alert.alert_id)
	.bind(alert.org_id)
	.bind(&alert.ocid)
	.bind(&alert.r#type)
	.bind(&alert.severity)
	.bind(&alert.message)
	.bind(&alert.details)
	.bind(alert.read)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn unread_alerts(executor: impl PgExecutor<'_>, org_id: Uuid) -> Result<Vec<AlertRow>> {
	let rows = sqlx::query_as::<_, AlertRow>(
		"SELECT * FROM alerts WHERE org_id = $1 AND read = false ORDER BY created_at DESC",
	)
	.bind(org_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn mark_alert_read(executor: impl PgExecutor<'_>, alert_id: Uuid) -> Result<()> {
	sqlx::query("UPDATE alerts SET read = true WHERE alert_id = $1").bind(alert_id).execute(executor).await?;

	Ok(())
}

/// Opens a `RUNNING` ingestion log row for `source`.
pub async fn open_ingestion_log(executor: impl PgExecutor<'_>, source: &str) -> Result<IngestionLogRow> {
	let row = sqlx::query_as::<_, IngestionLogRow>(
		"INSERT INTO ingestion_logs (source, status) VALUES ($1, 'RUNNING') \
		 RETURNING log_id, source, started_at, completed_at, status, items_processed, error_detail",
	)
	.bind(source)
	.fetch_one(executor)
	.await?;

	Ok(row)
}

pub async fn finalize_ingestion_log(
	executor: impl PgExecutor<'_>,
	log_id: Uuid,
	status: &str,
	items_processed: i32,
	error_detail: Option<&str>,
) -> Result<()> {
	sqlx::query(
		"UPDATE ingestion_logs SET status = $1, items_processed = $2, error_detail = $3, completed_at = now() \
		 WHERE log_id = $4",
	)
	.bind(status)
	.bind(items_processed)
	.bind(error_detail)
	.bind(log_id)
	.execute(executor)
	.await?;

	Ok(())
}

/// The watermark for a source is the completion time of its last `SUCCESS`
/// run, if any.
pub async fn last_successful_watermark(executor: impl PgExecutor<'_>, source: &str) -> Result<Option<OffsetDateTime>> {
	let watermark: Option<Option<OffsetDateTime>> = sqlx::query_scalar(
		"SELECT completed_at FROM ingestion_logs WHERE source = $1 AND status = 'SUCCESS' \
		 ORDER BY completed_at DESC LIMIT 1",
	)
	.bind(source)
	.fetch_optional(executor)
	.await?;

	Ok(watermark.flatten())
}

/// Most recent ingestion runs for `source`, newest first — the operator
/// export surface's read side.
pub async fn recent_ingestion_logs_by_source(executor: impl PgExecutor<'_>, source: &str, limit: i64) -> Result<Vec<IngestionLogRow>> {
	let rows = sqlx::query_as::<_, IngestionLogRow>(
		"SELECT log_id, source, started_at, completed_at, status, items_processed, error_detail \
		 FROM ingestion_logs WHERE source = $1 ORDER BY started_at DESC LIMIT $2",
	)
	.bind(source)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// The Matching Engine's stage-1 SQL prefilter: every non-archived notice
/// whose `tender.mainProcurementCategory` is "services" (case-insensitive).
pub async fn candidate_notices_for_matching(executor: impl PgExecutor<'_>) -> Result<Vec<NoticeRow>> {
	let rows = sqlx::query_as::<_, NoticeRow>(
		"SELECT * FROM notices \
		 WHERE archived = false \
		 AND lower(raw_release #>> '{tender,mainProcurementCategory}') = 'services' \
		 ORDER BY ocid",
	)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// The ranked feed for a profile: tracked matches pinned to the top, then
/// ordered by score.
pub async fn ranked_feed(executor: impl PgExecutor<'_>, org_id: Uuid, limit: i64) -> Result<Vec<NoticeMatchRow>> {
	let rows = sqlx::query_as::<_, NoticeMatchRow>(
		"SELECT * FROM notice_matches WHERE org_id = $1 \
		 ORDER BY tracked DESC, score DESC LIMIT $2",
	)
	.bind(org_id)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// The top-K matches for a profile by current score, straight and
/// unweighted by tracking/verdict — the Tier-2 Reviewer's batch input.
pub async fn top_matches_by_score(executor: impl PgExecutor<'_>, org_id: Uuid, top_k: i64) -> Result<Vec<NoticeMatchRow>> {
	let rows = sqlx::query_as::<_, NoticeMatchRow>(
		"SELECT * FROM notice_matches WHERE org_id = $1 ORDER BY score DESC LIMIT $2",
	)
	.bind(org_id)
	.bind(top_k)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Every existing match for a profile, keyed by OCID by the caller — the
/// Matching Engine's "load the existing match map" step.
pub async fn matches_for_org(executor: impl PgExecutor<'_>, org_id: Uuid) -> Result<Vec<NoticeMatchRow>> {
	let rows = sqlx::query_as::<_, NoticeMatchRow>("SELECT * FROM notice_matches WHERE org_id = $1")
		.bind(org_id)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn fetch_match(executor: impl PgExecutor<'_>, org_id: Uuid, ocid: &str) -> Result<Option<NoticeMatchRow>> {
	let row = sqlx::query_as::<_, NoticeMatchRow>("SELECT * FROM notice_matches WHERE org_id = $1 AND ocid = $2")
		.bind(org_id)
		.bind(ocid)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Flips a match's `tracked` flag to an explicit value; used by the toggle
/// endpoint rather than exposed as a read-then-write round-trip.
pub async fn set_tracked(executor: impl PgExecutor<'_>, org_id: Uuid, ocid: &str, tracked: bool) -> Result<()> {
	sqlx::query("UPDATE notice_matches SET tracked = $1 WHERE org_id = $2 AND ocid = $3")
		.bind(tracked)
		.bind(org_id)
		.bind(ocid)
		.execute(executor)
		.await?;

	Ok(())
}

/// Appends a `MATERIAL_CHANGE` alert's message to a match's
/// `recommendation_reasons` and, when the change is a value swing on a
/// currently-GO match, demotes the verdict to REVIEW — both within the
/// Alert Service's single transaction.
pub async fn annotate_match_for_alert(
	executor: impl PgExecutor<'_>,
	org_id: Uuid,
	ocid: &str,
	reason: &str,
	demote_to_review: bool,
) -> Result<()> {
	sqlx::query(
		"UPDATE notice_matches \
		 SET recommendation_reasons = array_append(recommendation_reasons, $1), \
		 verdict = CASE WHEN $2 AND verdict = 'GO' THEN 'REVIEW' ELSE verdict END \
		 WHERE org_id = $3 AND ocid = $4",
	)
	.bind(reason)
	.bind(demote_to_review)
	.bind(org_id)
	.bind(ocid)
	.execute(executor)
	.await?;

	Ok(())
}

/// Every match row tied to `ocid`, across all profiles — the Alert Service
/// fans a material change out to each one.
pub async fn matches_for_notice(executor: impl PgExecutor<'_>, ocid: &str) -> Result<Vec<NoticeMatchRow>> {
	let rows = sqlx::query_as::<_, NoticeMatchRow>("SELECT * FROM notice_matches WHERE ocid = $1")
		.bind(ocid)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

/// The set of CPV codes inferred across every active profile, used to seed
/// the Interest Mesh without loading full profile rows.
pub async fn distinct_inferred_cpv_codes(db: &Db) -> Result<Vec<String>> {
	let codes: Vec<String> =
		sqlx::query_scalar("SELECT DISTINCT unnest(inferred_cpv_codes) FROM service_profiles")
			.fetch_all(&db.pool)
			.await?;

	Ok(codes)
}
