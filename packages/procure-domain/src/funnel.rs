use rust_decimal::Decimal;

use crate::renewal::RenewalSummary;
use crate::{cpv, geo, theme};
use crate::types::{CandidateNotice, CandidateProfile, GateOutcome, RejectStage, ScoredMatch, Verdict};
use procure_config::Matching;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepVerdict {
	Pass,
	Fail,
}

/// Runs the seven-stage funnel for one (profile, notice) pair. `deep_verdict`
/// is the profile's existing Tier-2 verdict for this notice, if any — its
/// sticky-override rule is applied last. `renewal` is the Renewal Radar
/// summary already computed for this (buyer, notice) pair, if the caller has
/// one to hand — fetching history is I/O and stays out of this crate.
pub fn evaluate(
	profile: &CandidateProfile,
	notice: &CandidateNotice,
	deep_verdict: Option<DeepVerdict>,
	renewal: Option<&RenewalSummary>,
	cfg: &Matching,
) -> GateOutcome {
	if vcse_sme_gate_rejects(notice) {
		return GateOutcome::Rejected(RejectStage::VcseSmeGate);
	}

	if value_gate_rejects(profile, notice, cfg.value_gate_ratio) {
		return GateOutcome::Rejected(RejectStage::ValueGate);
	}

	let Some(score_geo) =
		geo::score(&profile.regions, &notice.regions, profile.latest_income, cfg.national_income_threshold)
	else {
		return GateOutcome::Rejected(RejectStage::GeoGate);
	};

	if cpv::disjoint(&notice.cpv_codes, &profile.inferred_cpv_codes) {
		return GateOutcome::Rejected(RejectStage::CpvGate);
	}

	let haystack = format!("{} {}", notice.title, notice.description).to_lowercase();

	if profile.exclusion_keywords.iter().any(|keyword| {
		let keyword = keyword.trim().to_lowercase();

		!keyword.is_empty() && haystack.contains(&keyword)
	}) {
		return GateOutcome::Rejected(RejectStage::ExclusionKeyword);
	}

	let score_semantic = semantic_score(profile, notice);
	let score_domain = cpv::domain_score(&notice.cpv_codes, &profile.inferred_cpv_codes);
	let score_theme = theme::score(&profile.themes, &notice.inferred_ukcat_codes);
	let total = cfg.weights.semantic * score_semantic
		+ cfg.weights.theme * score_theme
		+ cfg.weights.domain * score_domain
		+ cfg.weights.geo * score_geo;

	let mut risk_flags = scan_risks(&haystack, &cfg.risk_keywords);
	annotate_suitability(notice, &mut risk_flags);

	let mut recommendation_reasons = Vec::new();

	if let Some(renewal) = renewal.filter(|renewal| renewal.buyer_seen_before) {
		risk_flags.insert("renewal_radar".to_string(), renewal.radar_summary.clone());
		recommendation_reasons.push(format!(
			"Renewal Radar: buyer has {} prior contract(s) in this sector.",
			renewal.historical_contract_count
		));
	}

	let has_tupe = risk_flags.contains_key("tupe");
	let mut verdict = if total > cfg.go_threshold { Verdict::Go } else { Verdict::Review };

	if has_tupe {
		verdict = Verdict::Review;
	}

	match deep_verdict {
		Some(DeepVerdict::Pass) => {
			verdict = Verdict::Go;
			recommendation_reasons.push("Tier-2 review: verdict confirmed GO.".to_string());
		}
		Some(DeepVerdict::Fail) => {
			verdict = Verdict::NoGo;
			recommendation_reasons.push("Tier-2 review: verdict overridden to NO-GO.".to_string());
		}
		None => {}
	}

	GateOutcome::Passed(ScoredMatch {
		score: total,
		score_semantic,
		score_domain,
		score_geo,
		score_theme,
		verdict,
		risk_flags,
		recommendation_reasons,
	})
}

/// Stage 2: if the notice or any of its lots declares a `suitability`
/// object at all, at least one declared `sme`/`vcse` flag must be true
/// somewhere on the notice. A notice with no declared suitability anywhere
/// passes with a neutral reason.
fn vcse_sme_gate_rejects(notice: &CandidateNotice) -> bool {
	let any_declared =
		notice.suitability.is_declared() || notice.lots.iter().any(|lot| lot.suitability.is_declared());

	if !any_declared {
		return false;
	}

	let is_sme = notice.suitability.sme == Some(true)
		|| notice.lots.iter().any(|lot| lot.suitability.sme == Some(true));
	let is_vcse = notice.suitability.vcse == Some(true)
		|| notice.lots.iter().any(|lot| lot.suitability.vcse == Some(true));

	!(is_sme || is_vcse)
}

fn value_gate_rejects(profile: &CandidateProfile, notice: &CandidateNotice, gate_ratio: f32) -> bool {
	let Some(income) = profile.latest_income.filter(|income| *income > 0) else {
		return false;
	};
	let Some(total_value) = notice.value else {
		return false;
	};

	let threshold = Decimal::from(income) * Decimal::from_f32_retain(gate_ratio).unwrap_or_default();

	if total_value <= threshold {
		return false;
	}

	let has_suitable_lot = notice.lots.iter().any(|lot| lot.value.is_some_and(|value| value <= threshold));

	!has_suitable_lot
}

fn semantic_score(profile: &CandidateProfile, notice: &CandidateNotice) -> f32 {
	let target = notice.provider_summary_embedding.as_ref().or(notice.embedding.as_ref());

	match (&profile.embedding, target) {
		(Some(a), Some(b)) => cosine_similarity(a, b).max(0.0),
		_ => 0.0,
	}
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.is_empty() || b.is_empty() || a.len() != b.len() {
		return 0.0;
	}

	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}

fn scan_risks(haystack: &str, risk_keywords: &[String]) -> std::collections::BTreeMap<String, String> {
	let mut flags = std::collections::BTreeMap::new();

	for keyword in risk_keywords {
		let key = keyword.trim().to_lowercase();

		if !key.is_empty() && haystack.contains(&key) {
			flags.insert(key.clone(), format!("Flagged keyword detected: {key}."));
		}
	}

	flags
}

fn annotate_suitability(
	notice: &CandidateNotice,
	risk_flags: &mut std::collections::BTreeMap<String, String>,
) {
	let is_sme = notice.suitability.sme == Some(true)
		|| notice.lots.iter().any(|lot| lot.suitability.sme == Some(true));
	let is_vcse = notice.suitability.vcse == Some(true)
		|| notice.lots.iter().any(|lot| lot.suitability.vcse == Some(true));

	if is_sme {
		risk_flags.insert("is_sme".to_string(), "true".to_string());
	}
	if is_vcse {
		risk_flags.insert("is_vcse".to_string(), "true".to_string());
	}
}

#[cfg(test)]
mod tests {
	use crate::types::{CandidateNotice, CandidateProfile, Lot, Suitability};
	use procure_config::{MatchWeights, Matching};
	use time::OffsetDateTime;

	use super::*;

	fn matching_config() -> Matching {
		Matching {
			value_gate_ratio: 0.4,
			go_threshold: 0.65,
			national_income_threshold: 5_000_000,
			weights: MatchWeights { semantic: 0.40, theme: 0.30, domain: 0.20, geo: 0.10 },
			risk_keywords: vec!["tupe".to_string(), "safeguarding".to_string()],
		}
	}

	fn notice(value: Option<Decimal>, lots: Vec<Lot>) -> CandidateNotice {
		CandidateNotice {
			ocid: "ocds-001".to_string(),
			title: "Grounds maintenance".to_string(),
			description: "Routine grounds maintenance services".to_string(),
			value,
			lots,
			cpv_codes: vec!["85311100".to_string()],
			inferred_ukcat_codes: vec![],
			regions: vec!["london".to_string()],
			suitability: Suitability::default(),
			embedding: None,
			provider_summary_embedding: None,
			publication_date: OffsetDateTime::now_utc(),
			deadline_date: None,
		}
	}

	fn profile(income: i64, regions: Vec<String>) -> CandidateProfile {
		CandidateProfile {
			latest_income: Some(income),
			themes: vec![],
			regions,
			inferred_cpv_codes: vec!["85311000".to_string()],
			exclusion_keywords: vec![],
			embedding: None,
		}
	}

	#[test]
	fn value_gate_rejects_without_suitable_lot() {
		let profile = profile(250_000, vec!["london".to_string()]);
		let notice = notice(Some(Decimal::new(2_000_000, 0)), vec![]);

		let outcome = evaluate(&profile, &notice, None, None, &matching_config());

		assert_eq!(outcome, GateOutcome::Rejected(RejectStage::ValueGate));
	}

	#[test]
	fn value_gate_passes_with_suitable_lot() {
		let profile = profile(250_000, vec!["london".to_string(), "west midlands".to_string()]);
		let lot = Lot {
			id: "lot-1".to_string(),
			title: Some("Small lot".to_string()),
			value: Some(Decimal::new(90_000, 0)),
			suitability: Suitability::default(),
		};
		let notice = notice(Some(Decimal::new(2_000_000, 0)), vec![lot]);

		let outcome = evaluate(&profile, &notice, None, None, &matching_config());

		assert!(matches!(outcome, GateOutcome::Passed(_)));
	}

	#[test]
	fn value_exactly_at_threshold_is_not_rejected() {
		let profile = profile(1_000_000, vec!["london".to_string()]);
		let notice = notice(Some(Decimal::new(400_000, 0)), vec![]);

		let outcome = evaluate(&profile, &notice, None, None, &matching_config());

		assert!(matches!(outcome, GateOutcome::Passed(_)));
	}

	#[test]
	fn vcse_sme_gate_rejects_declared_but_unsuitable_notice() {
		let profile = profile(250_000, vec!["london".to_string()]);
		let mut notice = notice(None, vec![]);
		notice.suitability = Suitability { sme: Some(false), vcse: Some(false) };

		let outcome = evaluate(&profile, &notice, None, None, &matching_config());

		assert_eq!(outcome, GateOutcome::Rejected(RejectStage::VcseSmeGate));
	}

	#[test]
	fn vcse_sme_gate_passes_when_a_lot_declares_suitable() {
		let profile = profile(250_000, vec!["london".to_string()]);
		let lot = Lot {
			id: "lot-1".to_string(),
			title: None,
			value: None,
			suitability: Suitability { sme: Some(true), vcse: None },
		};
		let mut notice = notice(None, vec![lot]);
		notice.suitability = Suitability { sme: Some(false), vcse: Some(false) };

		let outcome = evaluate(&profile, &notice, None, None, &matching_config());

		assert!(matches!(outcome, GateOutcome::Passed(_)));
	}

	#[test]
	fn vcse_sme_gate_passes_when_nothing_declared() {
		let profile = profile(250_000, vec!["london".to_string()]);
		let notice = notice(None, vec![]);

		let outcome = evaluate(&profile, &notice, None, None, &matching_config());

		assert!(matches!(outcome, GateOutcome::Passed(_)));
	}

	#[test]
	fn cpv_gate_rejects_disjoint_prefixes() {
		let mut profile = profile(250_000, vec!["london".to_string()]);
		profile.inferred_cpv_codes = vec!["45000000".to_string()];
		let notice = notice(None, vec![]);

		let outcome = evaluate(&profile, &notice, None, None, &matching_config());

		assert_eq!(outcome, GateOutcome::Rejected(RejectStage::CpvGate));
	}

	#[test]
	fn tupe_forces_review_even_with_high_score() {
		let profile = profile(250_000, vec!["london".to_string()]);
		let mut notice = notice(None, vec![]);
		notice.description = "Service involves a TUPE transfer of existing staff.".to_string();
		notice.embedding = Some(vec![1.0, 0.0, 0.0]);

		let mut profile = profile;
		profile.embedding = Some(vec![1.0, 0.0, 0.0]);

		let outcome = evaluate(&profile, &notice, None, None, &matching_config());

		match outcome {
			GateOutcome::Passed(scored) => {
				assert_eq!(scored.verdict, Verdict::Review);
				assert!(scored.risk_flags.contains_key("tupe"));
			}
			other => panic!("expected a passed match, got {other:?}"),
		}
	}

	#[test]
	fn tier2_pass_overrides_to_go() {
		let profile = profile(250_000, vec!["london".to_string()]);
		let notice = notice(None, vec![]);

		let outcome = evaluate(&profile, &notice, Some(DeepVerdict::Pass), None, &matching_config());

		match outcome {
			GateOutcome::Passed(scored) => assert_eq!(scored.verdict, Verdict::Go),
			other => panic!("expected a passed match, got {other:?}"),
		}
	}

	#[test]
	fn tier2_fail_overrides_to_no_go() {
		let profile = profile(250_000, vec!["london".to_string()]);
		let notice = notice(None, vec![]);

		let outcome = evaluate(&profile, &notice, Some(DeepVerdict::Fail), None, &matching_config());

		match outcome {
			GateOutcome::Passed(scored) => assert_eq!(scored.verdict, Verdict::NoGo),
			other => panic!("expected a passed match, got {other:?}"),
		}
	}
}
