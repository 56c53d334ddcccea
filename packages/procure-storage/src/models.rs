use pgvector::Vector;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct BuyerRow {
	pub buyer_id: Uuid,
	pub canonical_name: String,
	pub slug: String,
	pub identifiers: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct NoticeRow {
	pub ocid: String,
	pub release_id: String,
	pub title: String,
	pub description: String,
	pub buyer_id: Option<Uuid>,
	pub publication_date: OffsetDateTime,
	pub deadline_date: Option<OffsetDateTime>,
	pub value: Option<Decimal>,
	pub currency: Option<String>,
	pub procurement_method: Option<String>,
	pub notice_type: String,
	pub raw_release: Value,
	pub source_url: Option<String>,
	pub cpv_codes: Vec<String>,
	pub inferred_ukcat_codes: Vec<String>,
	pub contract_period_start: Option<OffsetDateTime>,
	pub contract_period_end: Option<OffsetDateTime>,
	pub embedding: Option<Vector>,
	pub provider_summary_embedding: Option<Vector>,
	pub archived: bool,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct ServiceProfileRow {
	pub org_id: Uuid,
	pub charity_number: Option<String>,
	pub name: String,
	pub latest_income: Option<i64>,
	pub mission: String,
	pub vision: String,
	pub programs: String,
	pub target_population: String,
	pub themes: Vec<String>,
	pub beneficiary_groups: Vec<String>,
	pub inferred_cpv_codes: Vec<String>,
	pub regions: Vec<String>,
	pub min_contract_value: Option<Decimal>,
	pub max_contract_value: Option<Decimal>,
	pub exclusion_keywords: Vec<String>,
	pub embedding: Option<Vector>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct NoticeMatchRow {
	pub org_id: Uuid,
	pub ocid: String,
	pub score: f32,
	pub score_semantic: f32,
	pub score_domain: f32,
	pub score_theme: f32,
	pub score_geo: f32,
	pub verdict: String,
	pub viability_warning: Option<String>,
	pub risk_flags: Value,
	pub checklist: Value,
	pub recommendation_reasons: Vec<String>,
	pub tracked: bool,
	pub tier2_verdict: Option<String>,
	pub tier2_rationale: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct AlertRow {
	pub alert_id: Uuid,
	pub org_id: Uuid,
	pub ocid: String,
	pub r#type: String,
	pub severity: String,
	pub message: String,
	pub details: Value,
	pub read: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct IngestionLogRow {
	pub log_id: Uuid,
	pub source: String,
	pub started_at: OffsetDateTime,
	pub completed_at: Option<OffsetDateTime>,
	pub status: String,
	pub items_processed: i32,
	pub error_detail: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct HistoricalAwardRow {
	pub ocid: String,
	pub publication_date: OffsetDateTime,
	pub awards: Value,
}
