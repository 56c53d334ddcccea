//! Tier-2 Reviewer: bundles a profile's top-scoring matches
//! into one chat-completion request and writes back PASS/FAIL verdicts that
//! stick across future funnel reruns.

use procure_config::Config;
use procure_storage::db::Db;
use procure_storage::models::NoticeRow;
use procure_storage::queries;
use serde_json::Value;
use uuid::Uuid;

use crate::{ChatProvider, Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewReport {
	pub reviewed: usize,
	pub pass: usize,
	pub fail: usize,
}

/// Reviews the top `cfg.tier2.top_k` matches for `org_id`. Builds a single
/// batched request; a run-wide provider failure returns an error without
/// writing anything. Entries the model omits or malforms default to FAIL
/// with a diagnostic rationale rather than being left unreviewed.
pub async fn review(db: &Db, cfg: &Config, chat: &dyn ChatProvider, org_id: Uuid) -> Result<ReviewReport> {
	let profile = queries::fetch_service_profile(&db.pool, org_id)
		.await?
		.ok_or_else(|| Error::NotFound { message: format!("Service profile {org_id} not found.") })?;

	let candidates = queries::top_matches_by_score(&db.pool, org_id, cfg.tier2.top_k as i64).await?;

	if candidates.is_empty() {
		return Ok(ReviewReport::default());
	}

	let mut notices = Vec::with_capacity(candidates.len());

	for candidate in &candidates {
		let Some(notice) = queries::fetch_notice(&db.pool, &candidate.ocid).await? else {
			continue;
		};

		notices.push(notice);
	}

	let messages = chat_messages(&profile.name, &profile.mission, &notices);
	let verdicts = chat.deep_review(&cfg.providers.llm, &cfg.providers.retry, &messages).await?;

	let mut report = ReviewReport::default();
	let mut tx = db.pool.begin().await?;

	for notice in &notices {
		let (verdict, rationale) = match verdicts.get(&notice.ocid) {
			Some(entry) if entry.verdict.eq_ignore_ascii_case("PASS") => ("PASS", entry.rationale.clone()),
			Some(entry) if entry.verdict.eq_ignore_ascii_case("FAIL") => ("FAIL", entry.rationale.clone()),
			Some(entry) => (
				"FAIL",
				format!("Tier-2 review returned an unrecognised verdict {:?}; defaulted to FAIL.", entry.verdict),
			),
			None => ("FAIL", "Tier-2 review omitted this notice from its response; defaulted to FAIL.".to_string()),
		};

		queries::set_tier2_verdict(&mut *tx, org_id, &notice.ocid, verdict, &rationale).await?;

		report.reviewed += 1;
		if verdict == "PASS" {
			report.pass += 1;
		} else {
			report.fail += 1;
		}
	}

	tx.commit().await?;

	Ok(report)
}

fn chat_messages(org_name: &str, mission: &str, notices: &[NoticeRow]) -> Vec<Value> {
	let candidates: Vec<Value> = notices
		.iter()
		.map(|notice| {
			serde_json::json!({
				"ocid": notice.ocid,
				"title": notice.title,
				"description": notice.description,
				"value": notice.value.map(|value| value.to_string()),
				"procurement_method": notice.procurement_method,
			})
		})
		.collect();

	let system = "You are a charity sector procurement reviewer. For every candidate notice, decide whether \
		the charity should genuinely pursue it given its mission. Respond with a single JSON object mapping \
		each notice's \"ocid\" to {\"verdict\": \"PASS\" | \"FAIL\", \"rationale\": string}. Every candidate \
		ocid must appear exactly once.";
	let user = serde_json::json!({
		"organisation": org_name,
		"mission": mission,
		"candidates": candidates,
	});

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": user.to_string() }),
	]
}

#[cfg(test)]
mod tests {
	use time::OffsetDateTime;

	use super::*;

	fn notice(ocid: &str) -> NoticeRow {
		NoticeRow {
			ocid: ocid.to_string(),
			release_id: "release-1".to_string(),
			title: "Grounds maintenance".to_string(),
			description: "Routine grounds maintenance services".to_string(),
			buyer_id: None,
			publication_date: OffsetDateTime::now_utc(),
			deadline_date: None,
			value: None,
			currency: None,
			procurement_method: None,
			notice_type: "live".to_string(),
			raw_release: serde_json::json!({}),
			source_url: None,
			cpv_codes: vec![],
			inferred_ukcat_codes: vec![],
			contract_period_start: None,
			contract_period_end: None,
			embedding: None,
			provider_summary_embedding: None,
			archived: false,
			created_at: OffsetDateTime::now_utc(),
			updated_at: OffsetDateTime::now_utc(),
		}
	}

	#[test]
	fn chat_messages_names_every_candidate_ocid() {
		let notices = vec![notice("ocds-001"), notice("ocds-002")];
		let messages = chat_messages("Example Charity", "Helping people.", &notices);

		let user_content = messages[1].get("content").and_then(Value::as_str).unwrap();

		assert!(user_content.contains("ocds-001"));
		assert!(user_content.contains("ocds-002"));
	}
}
