use std::collections::BTreeMap;

use rust_decimal::Decimal;
use time::OffsetDateTime;

/// A lot's declared suitability flags, taken from `tender.suitability` or
/// `lot.suitability` in a release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Suitability {
	pub sme: Option<bool>,
	pub vcse: Option<bool>,
}

impl Suitability {
	pub fn is_declared(&self) -> bool {
		self.sme.is_some() || self.vcse.is_some()
	}
}

/// A sub-bundle of a tender carrying its own value and suitability.
#[derive(Debug, Clone)]
pub struct Lot {
	pub id: String,
	pub title: Option<String>,
	pub value: Option<Decimal>,
	pub suitability: Suitability,
}

/// The subset of a `Notice` the funnel needs to gate and score a candidate.
/// Deliberately narrower than the stored row: this is what travels between
/// `procure-engine` and the pure functions here.
#[derive(Debug, Clone)]
pub struct CandidateNotice {
	pub ocid: String,
	pub title: String,
	pub description: String,
	pub value: Option<Decimal>,
	pub lots: Vec<Lot>,
	pub cpv_codes: Vec<String>,
	pub inferred_ukcat_codes: Vec<String>,
	pub regions: Vec<String>,
	pub suitability: Suitability,
	pub embedding: Option<Vec<f32>>,
	pub provider_summary_embedding: Option<Vec<f32>>,
	pub publication_date: OffsetDateTime,
	pub deadline_date: Option<OffsetDateTime>,
}

/// The subset of a `ServiceProfile` the funnel needs.
#[derive(Debug, Clone)]
pub struct CandidateProfile {
	pub latest_income: Option<i64>,
	pub themes: Vec<String>,
	pub regions: Vec<String>,
	pub inferred_cpv_codes: Vec<String>,
	pub exclusion_keywords: Vec<String>,
	pub embedding: Option<Vec<f32>>,
}

/// Outcome of running the seven-stage funnel for one (profile, notice) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
	Rejected(RejectStage),
	Passed(ScoredMatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectStage {
	VcseSmeGate,
	ValueGate,
	GeoGate,
	CpvGate,
	ExclusionKeyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	Go,
	Review,
	NoGo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
	pub score: f32,
	pub score_semantic: f32,
	pub score_domain: f32,
	pub score_geo: f32,
	pub score_theme: f32,
	pub verdict: Verdict,
	pub risk_flags: BTreeMap<String, String>,
	pub recommendation_reasons: Vec<String>,
}
