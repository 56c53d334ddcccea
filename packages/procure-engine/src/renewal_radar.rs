//! Historical-intelligence enrichment: joins a live notice
//! against prior awards from the same buyer/sector to surface an incumbent,
//! an estimated re-tender cycle, and a human summary. Pure read; no writes.

use procure_config::Renewal;
use procure_domain::{HistoricalAward, RenewalSummary, summarise_renewal};
use procure_storage::queries;
use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::Result;

pub async fn enrich(
	executor: impl PgExecutor<'_>,
	cfg: &Renewal,
	buyer_id: Option<Uuid>,
	cpv_prefixes: &[String],
	now: OffsetDateTime,
) -> Result<RenewalSummary> {
	let Some(buyer_id) = buyer_id else {
		return Ok(summarise_renewal(
			false,
			&[],
			now,
			&cfg.cycle_candidates,
			cfg.cycle_tolerance_years,
			cfg.default_cycle_years,
		));
	};

	let rows =
		queries::historical_notices_by_cpv_prefix(executor, buyer_id, cpv_prefixes, cfg.lookback_limit as i64).await?;
	let history: Vec<HistoricalAward> = rows
		.into_iter()
		.map(|row| HistoricalAward { publication_date: row.publication_date, suppliers: suppliers_of(&row.awards) })
		.collect();

	Ok(summarise_renewal(
		true,
		&history,
		now,
		&cfg.cycle_candidates,
		cfg.cycle_tolerance_years,
		cfg.default_cycle_years,
	))
}

/// The ordered union of `awards[].suppliers[].name`, de-duplicated on first
/// occurrence — the declared awardees, not every party named on the release.
fn suppliers_of(awards: &Value) -> Vec<String> {
	let Some(awards) = awards.as_array() else {
		return Vec::new();
	};

	let mut seen = std::collections::HashSet::new();
	let mut names = Vec::new();

	for award in awards {
		let Some(suppliers) = award.get("suppliers").and_then(Value::as_array) else {
			continue;
		};

		for supplier in suppliers {
			let Some(name) = supplier.get("name").and_then(Value::as_str) else {
				continue;
			};

			if seen.insert(name.to_string()) {
				names.push(name.to_string());
			}
		}
	}

	names
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn suppliers_of_reads_award_suppliers() {
		let awards = json!([
			{ "suppliers": [{ "name": "Acme Care Ltd" }] },
			{ "suppliers": [{ "name": "Beta Services Ltd" }] },
		]);

		assert_eq!(suppliers_of(&awards), vec!["Acme Care Ltd".to_string(), "Beta Services Ltd".to_string()]);
	}

	#[test]
	fn suppliers_of_deduplicates_first_seen() {
		let awards = json!([
			{ "suppliers": [{ "name": "Acme Care Ltd" }] },
			{ "suppliers": [{ "name": "Acme Care Ltd" }, { "name": "Beta Services Ltd" }] },
		]);

		assert_eq!(suppliers_of(&awards), vec!["Acme Care Ltd".to_string(), "Beta Services Ltd".to_string()]);
	}

	#[test]
	fn suppliers_of_ignores_parties_without_roles() {
		let awards = json!([{ "suppliers": [] }]);

		assert!(suppliers_of(&awards).is_empty());
	}
}
