use rust_decimal::Decimal;
use serde_json::Value;
use time::OffsetDateTime;

use crate::types::{Lot, Suitability};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerPatch {
	pub canonical_name: String,
	pub slug: String,
	pub identifiers: Value,
}

#[derive(Debug, Clone)]
pub struct NoticePatch {
	pub ocid: String,
	pub release_id: Option<String>,
	pub title: String,
	pub description: String,
	pub publication_date: OffsetDateTime,
	pub deadline_date: Option<OffsetDateTime>,
	pub value_amount: Option<Decimal>,
	pub value_currency: String,
	pub procurement_method: Option<String>,
	pub notice_type: String,
	pub cpv_codes: Vec<String>,
	pub contract_period_start: Option<OffsetDateTime>,
	pub contract_period_end: Option<OffsetDateTime>,
	pub source_url: Option<String>,
	pub lots: Vec<Lot>,
	pub suitability: Suitability,
	pub main_procurement_category: Option<String>,
	pub raw_json: Value,
}

/// Normalises a buyer's free-text name into the canonical name + slug pair
/// used as the upsert key.
pub fn normalise_buyer(buyer: &Value) -> BuyerPatch {
	let raw_name = buyer.get("name").and_then(Value::as_str).unwrap_or("Unknown Buyer");
	let canonical_name = collapse_whitespace(raw_name.trim());
	let slug = canonical_name.to_lowercase().replace(char::is_whitespace, "-");
	let identifiers = buyer.get("identifier").cloned().unwrap_or(Value::Object(Default::default()));

	BuyerPatch { canonical_name, slug, identifiers }
}

fn collapse_whitespace(input: &str) -> String {
	input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps a raw OCDS release to a canonical notice patch.
pub fn normalise_release(release: &Value) -> Option<NoticePatch> {
	let ocid = release.get("ocid").and_then(Value::as_str)?.to_string();
	let tender = release.get("tender").cloned().unwrap_or(Value::Object(Default::default()));

	let publication_date = release
		.get("date")
		.and_then(Value::as_str)
		.and_then(|date| OffsetDateTime::parse(date, &time::format_description::well_known::Rfc3339).ok())
		.unwrap_or_else(|| {
			OffsetDateTime::now_utc()
		});

	let deadline_date = tender
		.get("tenderPeriod")
		.and_then(|period| period.get("endDate"))
		.and_then(Value::as_str)
		.and_then(|date| OffsetDateTime::parse(date, &time::format_description::well_known::Rfc3339).ok());

	let value = tender.get("value").cloned().unwrap_or(Value::Object(Default::default()));
	let value_amount = value.get("amount").and_then(Value::as_f64).and_then(Decimal::from_f64_retain);
	let value_currency =
		value.get("currency").and_then(Value::as_str).unwrap_or("GBP").to_string();

	let (contract_period_start, contract_period_end) = contract_period(release, &tender);

	let notice_type = release
		.get("tag")
		.and_then(Value::as_array)
		.and_then(|tags| tags.first())
		.and_then(Value::as_str)
		.unwrap_or("contractNotice")
		.to_string();

	Some(NoticePatch {
		ocid,
		release_id: release.get("id").and_then(Value::as_str).map(str::to_string),
		title: tender.get("title").and_then(Value::as_str).unwrap_or("Untitled Notice").to_string(),
		description: tender.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
		publication_date,
		deadline_date,
		value_amount,
		value_currency,
		procurement_method: tender.get("procurementMethod").and_then(Value::as_str).map(str::to_string),
		notice_type,
		cpv_codes: cpv_codes(&tender),
		contract_period_start,
		contract_period_end,
		source_url: tender
			.get("documents")
			.and_then(Value::as_array)
			.and_then(|docs| docs.first())
			.and_then(|doc| doc.get("url"))
			.and_then(Value::as_str)
			.map(str::to_string),
		lots: lots(&tender),
		suitability: suitability(tender.get("suitability")),
		main_procurement_category: tender
			.get("mainProcurementCategory")
			.and_then(Value::as_str)
			.map(str::to_string),
		raw_json: release.clone(),
	})
}

fn contract_period(
	release: &Value,
	tender: &Value,
) -> (Option<OffsetDateTime>, Option<OffsetDateTime>) {
	let own = tender.get("contractPeriod");
	let from_awards = || {
		release
			.get("awards")
			.and_then(Value::as_array)
			.and_then(|awards| awards.first())
			.and_then(|award| award.get("contractPeriod"))
	};
	let period = own.filter(|period| !period.is_null()).or_else(from_awards);

	let parse = |key: &str| {
		period
			.and_then(|period| period.get(key))
			.and_then(Value::as_str)
			.and_then(|date| {
				OffsetDateTime::parse(date, &time::format_description::well_known::Rfc3339).ok()
			})
	};

	(parse("startDate"), parse("endDate"))
}

/// Union of CPV ids from item classifications, the top-level tender
/// classification, and additional classifications, de-duplicated preserving
/// first occurrence.
fn cpv_codes(tender: &Value) -> Vec<String> {
	let mut codes = Vec::new();
	let mut push = |id: Option<&str>| {
		if let Some(id) = id
			&& !codes.contains(&id.to_string())
		{
			codes.push(id.to_string());
		}
	};

	if let Some(items) = tender.get("items").and_then(Value::as_array) {
		for item in items {
			push(item.get("classification").and_then(|c| c.get("id")).and_then(Value::as_str));
		}
	}

	push(tender.get("classification").and_then(|c| c.get("id")).and_then(Value::as_str));

	if let Some(additional) = tender.get("additionalClassifications").and_then(Value::as_array) {
		for classification in additional {
			push(classification.get("id").and_then(Value::as_str));
		}
	}

	codes
}

fn lots(tender: &Value) -> Vec<Lot> {
	let Some(lots) = tender.get("lots").and_then(Value::as_array) else {
		return Vec::new();
	};

	lots.iter()
		.enumerate()
		.map(|(idx, lot)| {
			let id = lot.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
			let value = lot.get("value");
			let amount = value
				.and_then(|value| value.get("amountGross"))
				.and_then(Value::as_f64)
				.or_else(|| value.and_then(|value| value.get("amount")).and_then(Value::as_f64))
				.and_then(Decimal::from_f64_retain);

			Lot {
				id: if id.is_empty() { format!("lot-{idx}") } else { id },
				title: lot.get("title").and_then(Value::as_str).map(str::to_string),
				value: amount,
				suitability: suitability(lot.get("suitability")),
			}
		})
		.collect()
}

fn suitability(node: Option<&Value>) -> Suitability {
	let Some(node) = node else {
		return Suitability::default();
	};

	Suitability {
		sme: node.get("sme").and_then(Value::as_bool),
		vcse: node.get("vcse").and_then(Value::as_bool),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn normalise_buyer_slugifies_name() {
		let buyer = json!({ "name": "  London   Borough of Camden  " });
		let patch = normalise_buyer(&buyer);

		assert_eq!(patch.canonical_name, "London Borough of Camden");
		assert_eq!(patch.slug, "london-borough-of-camden");
	}

	#[test]
	fn normalise_release_extracts_core_fields() {
		let release = json!({
			"ocid": "ocds-abc-001",
			"id": "rel-1",
			"date": "2024-01-15T10:00:00Z",
			"tag": ["contractNotice"],
			"tender": {
				"title": "Grounds maintenance services",
				"description": "Cutting grass",
				"mainProcurementCategory": "services",
				"tenderPeriod": { "endDate": "2024-02-15T10:00:00Z" },
				"value": { "amount": 120000.0, "currency": "GBP" },
				"items": [{ "classification": { "id": "77300000" } }],
				"classification": { "id": "77310000" },
			},
		});

		let patch = normalise_release(&release).expect("release must normalise");

		assert_eq!(patch.ocid, "ocds-abc-001");
		assert_eq!(patch.title, "Grounds maintenance services");
		assert_eq!(patch.cpv_codes, vec!["77300000".to_string(), "77310000".to_string()]);
		assert!(patch.deadline_date.is_some());
		assert_eq!(patch.main_procurement_category.as_deref(), Some("services"));
	}

	#[test]
	fn normalise_release_rejects_missing_ocid() {
		let release = json!({ "tender": { "title": "No ocid" } });

		assert!(normalise_release(&release).is_none());
	}

	#[test]
	fn normalise_release_defaults_notice_type_and_currency() {
		let release = json!({ "ocid": "ocds-def-002", "date": "2024-01-01T00:00:00Z", "tender": {} });
		let patch = normalise_release(&release).expect("release must normalise");

		assert_eq!(patch.notice_type, "contractNotice");
		assert_eq!(patch.value_currency, "GBP");
	}

	#[test]
	fn contract_period_falls_back_to_first_award() {
		let release = json!({
			"ocid": "ocds-ghi-003",
			"date": "2024-01-01T00:00:00Z",
			"tender": {},
			"awards": [{ "contractPeriod": { "startDate": "2024-03-01T00:00:00Z", "endDate": "2025-03-01T00:00:00Z" } }],
		});
		let patch = normalise_release(&release).expect("release must normalise");

		assert!(patch.contract_period_start.is_some());
		assert!(patch.contract_period_end.is_some());
	}
}
