//! Matching Engine — the core seven-stage funnel, run per
//! profile against the SQL-prefiltered candidate set, with the persistence
//! discipline that keeps Tier-2 verdicts sticky across reruns.

use std::collections::{BTreeSet, HashMap};

use procure_config::Config;
use procure_domain::{
	CandidateNotice, CandidateProfile, DeepVerdict, GateOutcome, Lot, ScoredMatch, Suitability, Verdict, cpv, run_funnel,
};
use procure_storage::db::Db;
use procure_storage::models::{NoticeMatchRow, NoticeRow, ServiceProfileRow};
use procure_storage::queries;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, renewal_radar};

/// Recalculates every `NoticeMatch` row for `org_id`: runs the funnel over
/// the current candidate set, mechanically upserts every passed candidate,
/// and deletes stale rows that have no Tier-2 verdict to protect. The reads,
/// every upsert, and the final delete all land in one transaction, committed
/// once after the last merge/delete.
pub async fn recalculate(db: &Db, cfg: &Config, org_id: Uuid) -> Result<RecalculateReport> {
	let mut tx = db.pool.begin().await?;

	let profile_row = queries::fetch_service_profile(&mut *tx, org_id)
		.await?
		.ok_or_else(|| Error::NotFound { message: format!("Service profile {org_id} not found.") })?;
	let profile = candidate_profile(&profile_row);

	let candidates = queries::candidate_notices_for_matching(&mut *tx).await?;
	let existing = queries::matches_for_org(&mut *tx, org_id).await?;
	let existing_by_ocid: HashMap<&str, &NoticeMatchRow> =
		existing.iter().map(|row| (row.ocid.as_str(), row)).collect();

	let mut kept = Vec::with_capacity(candidates.len());
	let mut go = 0usize;
	let mut review = 0usize;
	let mut no_go = 0usize;

	for notice_row in &candidates {
		let notice = candidate_notice(notice_row);
		let existing_match = existing_by_ocid.get(notice_row.ocid.as_str()).copied();
		let deep_verdict = existing_match.and_then(|row| deep_verdict_of(row));
		let notice_prefixes: Vec<String> = cpv::prefixes(&notice.cpv_codes).into_iter().collect();
		let renewal = renewal_radar::enrich(
			&mut *tx,
			&cfg.renewal,
			notice_row.buyer_id,
			&notice_prefixes,
			OffsetDateTime::now_utc(),
		)
		.await?;

		let outcome = run_funnel(&profile, &notice, deep_verdict, Some(&renewal), &cfg.matching);

		let GateOutcome::Passed(scored) = outcome else {
			continue;
		};

		match scored.verdict {
			Verdict::Go => go += 1,
			Verdict::Review => review += 1,
			Verdict::NoGo => no_go += 1,
		}

		let row = match_row(org_id, &notice_row.ocid, &scored, existing_match);

		queries::upsert_match_mechanical(&mut *tx, &row).await?;
		kept.push(notice_row.ocid.clone());
	}

	let deleted = queries::delete_stale_matches(&mut *tx, org_id, &kept).await?;

	tx.commit().await?;

	Ok(RecalculateReport { candidates: candidates.len(), go, review, no_go, deleted })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecalculateReport {
	pub candidates: usize,
	pub go: usize,
	pub review: usize,
	pub no_go: usize,
	pub deleted: u64,
}

fn deep_verdict_of(row: &NoticeMatchRow) -> Option<DeepVerdict> {
	match row.tier2_verdict.as_deref() {
		Some("PASS") => Some(DeepVerdict::Pass),
		Some("FAIL") => Some(DeepVerdict::Fail),
		_ => None,
	}
}

fn candidate_profile(row: &ServiceProfileRow) -> CandidateProfile {
	CandidateProfile {
		latest_income: row.latest_income,
		themes: row.themes.clone(),
		regions: row.regions.clone(),
		inferred_cpv_codes: row.inferred_cpv_codes.clone(),
		exclusion_keywords: row.exclusion_keywords.clone(),
		embedding: row.embedding.as_ref().map(|vector| vector.to_vec()),
	}
}

fn candidate_notice(row: &NoticeRow) -> CandidateNotice {
	CandidateNotice {
		ocid: row.ocid.clone(),
		title: row.title.clone(),
		description: row.description.clone(),
		value: row.value,
		lots: lots_of(&row.raw_release),
		cpv_codes: row.cpv_codes.clone(),
		inferred_ukcat_codes: row.inferred_ukcat_codes.clone(),
		regions: notice_regions(&row.raw_release),
		suitability: suitability_of(row.raw_release.get("tender").and_then(|tender| tender.get("suitability"))),
		embedding: row.embedding.as_ref().map(|vector| vector.to_vec()),
		provider_summary_embedding: row.provider_summary_embedding.as_ref().map(|vector| vector.to_vec()),
		publication_date: row.publication_date,
		deadline_date: row.deadline_date,
	}
}

fn lots_of(raw_release: &Value) -> Vec<Lot> {
	let Some(lots) = raw_release.get("tender").and_then(|tender| tender.get("lots")).and_then(Value::as_array) else {
		return Vec::new();
	};

	lots.iter()
		.enumerate()
		.map(|(idx, lot)| {
			let id = lot.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
			let amount = lot
				.get("value")
				.and_then(|value| value.get("amountGross"))
				.and_then(Value::as_f64)
				.or_else(|| lot.get("value").and_then(|value| value.get("amount")).and_then(Value::as_f64))
				.and_then(rust_decimal::Decimal::from_f64_retain);

			Lot {
				id: if id.is_empty() { format!("lot-{idx}") } else { id },
				title: lot.get("title").and_then(Value::as_str).map(str::to_string),
				value: amount,
				suitability: suitability_of(lot.get("suitability")),
			}
		})
		.collect()
}

fn suitability_of(node: Option<&Value>) -> Suitability {
	let Some(node) = node else {
		return Suitability::default();
	};

	Suitability { sme: node.get("sme").and_then(Value::as_bool), vcse: node.get("vcse").and_then(Value::as_bool) }
}

/// Notice regions come from `tender.items[].deliveryAddresses[].region`,
/// falling back to the buyer party's address region when no item declares
/// delivery addresses at all.
fn notice_regions(raw_release: &Value) -> Vec<String> {
	let mut regions = BTreeSet::new();

	if let Some(items) = raw_release.get("tender").and_then(|tender| tender.get("items")).and_then(Value::as_array) {
		for item in items {
			let Some(addresses) = item.get("deliveryAddresses").and_then(Value::as_array) else {
				continue;
			};

			for address in addresses {
				if let Some(region) = address.get("region").and_then(Value::as_str) {
					regions.insert(region.to_string());
				}
			}
		}
	}

	if !regions.is_empty() {
		return regions.into_iter().collect();
	}

	let Some(parties) = raw_release.get("parties").and_then(Value::as_array) else {
		return Vec::new();
	};

	parties
		.iter()
		.find(|party| {
			party.get("roles").and_then(Value::as_array).is_some_and(|roles| roles.iter().any(|role| role.as_str() == Some("buyer")))
		})
		.and_then(|buyer| buyer.get("address"))
		.and_then(|address| address.get("region"))
		.and_then(Value::as_str)
		.map(|region| vec![region.to_string()])
		.unwrap_or_default()
}

fn match_row(org_id: Uuid, ocid: &str, scored: &ScoredMatch, existing: Option<&NoticeMatchRow>) -> NoticeMatchRow {
	let viability_warning = scored
		.risk_flags
		.iter()
		.find(|(key, _)| key.as_str() != "is_sme" && key.as_str() != "is_vcse" && key.as_str() != "renewal_radar")
		.map(|(_, message)| message.clone());

	NoticeMatchRow {
		org_id,
		ocid: ocid.to_string(),
		score: scored.score,
		score_semantic: scored.score_semantic,
		score_domain: scored.score_domain,
		score_theme: scored.score_theme,
		score_geo: scored.score_geo,
		verdict: verdict_label(scored.verdict).to_string(),
		viability_warning,
		risk_flags: serde_json::to_value(&scored.risk_flags).unwrap_or(Value::Null),
		checklist: checklist_of(scored),
		recommendation_reasons: scored.recommendation_reasons.clone(),
		tracked: existing.map(|row| row.tracked).unwrap_or(false),
		tier2_verdict: existing.and_then(|row| row.tier2_verdict.clone()),
		tier2_rationale: existing.and_then(|row| row.tier2_rationale.clone()),
		created_at: existing.map(|row| row.created_at).unwrap_or_else(OffsetDateTime::now_utc),
	}
}

fn verdict_label(verdict: Verdict) -> &'static str {
	match verdict {
		Verdict::Go => "GO",
		Verdict::Review => "REVIEW",
		Verdict::NoGo => "NO-GO",
	}
}

fn checklist_of(scored: &ScoredMatch) -> Value {
	serde_json::json!([
		{ "item": "vcse_sme_gate", "status": "passed" },
		{ "item": "value_gate", "status": "passed" },
		{ "item": "geo_gate", "status": "passed" },
		{ "item": "cpv_gate", "status": "passed" },
		{ "item": "exclusion_keywords", "status": "passed" },
		{ "item": "tupe_risk", "status": if scored.risk_flags.contains_key("tupe") { "flagged" } else { "clear" } },
	])
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn notice_regions_reads_delivery_addresses() {
		let release = json!({
			"tender": { "items": [{ "deliveryAddresses": [{ "region": "London" }] }] }
		});

		assert_eq!(notice_regions(&release), vec!["London".to_string()]);
	}

	#[test]
	fn notice_regions_falls_back_to_buyer_party_address() {
		let release = json!({
			"tender": {},
			"parties": [{ "roles": ["buyer"], "address": { "region": "West Midlands" } }]
		});

		assert_eq!(notice_regions(&release), vec!["West Midlands".to_string()]);
	}

	#[test]
	fn notice_regions_empty_when_nothing_declared() {
		let release = json!({ "tender": {} });

		assert!(notice_regions(&release).is_empty());
	}
}
