use procure_config::{MatchWeights, Matching};
use procure_domain::types::{CandidateNotice, CandidateProfile, Lot, Suitability};
use procure_domain::{run_funnel, DeepVerdict, GateOutcome, RejectStage, Verdict};
use rust_decimal::Decimal;
use time::OffsetDateTime;

fn matching_config() -> Matching {
	Matching {
		value_gate_ratio: 0.4,
		go_threshold: 0.65,
		national_income_threshold: 5_000_000,
		weights: MatchWeights { semantic: 0.40, theme: 0.30, domain: 0.20, geo: 0.10 },
		risk_keywords: vec!["tupe".to_string(), "safeguarding".to_string()],
	}
}

fn small_local_charity() -> CandidateProfile {
	CandidateProfile {
		latest_income: Some(180_000),
		themes: vec!["Education".to_string()],
		regions: vec!["London".to_string()],
		inferred_cpv_codes: vec!["80000000".to_string()],
		exclusion_keywords: vec!["gambling".to_string()],
		embedding: Some(vec![1.0, 0.0, 0.0]),
	}
}

fn national_framework_notice(value: Decimal, lots: Vec<Lot>) -> CandidateNotice {
	CandidateNotice {
		ocid: "ocds-uk-framework-1".to_string(),
		title: "National education support framework".to_string(),
		description: "A multi-lot framework for tutoring and literacy support services.".to_string(),
		value: Some(value),
		lots,
		cpv_codes: vec!["80000000".to_string()],
		inferred_ukcat_codes: vec!["ED01".to_string()],
		regions: vec![],
		suitability: Suitability::default(),
		embedding: Some(vec![1.0, 0.0, 0.0]),
		provider_summary_embedding: None,
		publication_date: OffsetDateTime::now_utc(),
		deadline_date: None,
	}
}

#[test]
fn local_small_charity_rejected_by_value_gate_on_whole_framework() {
	let profile = small_local_charity();
	let notice = national_framework_notice(Decimal::new(50_000_000, 0), vec![]);

	let outcome = run_funnel(&profile, &notice, None, None, &matching_config());

	assert_eq!(outcome, GateOutcome::Rejected(RejectStage::ValueGate));
}

#[test]
fn same_framework_passes_when_a_lot_is_sized_for_the_charity() {
	let profile = small_local_charity();
	let lot = Lot {
		id: "lot-3".to_string(),
		title: Some("Regional tutoring lot".to_string()),
		value: Some(Decimal::new(60_000, 0)),
		suitability: Suitability { sme: Some(true), vcse: Some(true) },
	};
	let notice = national_framework_notice(Decimal::new(50_000_000, 0), vec![lot]);

	let outcome = run_funnel(&profile, &notice, None, None, &matching_config());

	match outcome {
		GateOutcome::Passed(scored) => {
			assert_eq!(scored.verdict, Verdict::Go);
			assert!(scored.risk_flags.contains_key("is_vcse"));
			assert_eq!(scored.score_theme, 1.0);
		}
		other => panic!("expected a passed match, got {other:?}"),
	}
}

#[test]
fn tupe_transfer_forces_review_regardless_of_score() {
	let profile = small_local_charity();
	let lot = Lot {
		id: "lot-1".to_string(),
		title: None,
		value: Some(Decimal::new(60_000, 0)),
		suitability: Suitability::default(),
	};
	let mut notice = national_framework_notice(Decimal::new(50_000_000, 0), vec![lot]);
	notice.description.push_str(" Staff currently employed by the incumbent transfer under TUPE.");

	let outcome = run_funnel(&profile, &notice, None, None, &matching_config());

	match outcome {
		GateOutcome::Passed(scored) => assert_eq!(scored.verdict, Verdict::Review),
		other => panic!("expected a passed match, got {other:?}"),
	}
}

#[test]
fn exclusion_keyword_rejects_before_scoring() {
	let profile = small_local_charity();
	let lot = Lot {
		id: "lot-1".to_string(),
		title: None,
		value: Some(Decimal::new(60_000, 0)),
		suitability: Suitability::default(),
	};
	let mut notice = national_framework_notice(Decimal::new(50_000_000, 0), vec![lot]);
	notice.description = "Operation of a licensed gambling arcade concession.".to_string();

	let outcome = run_funnel(&profile, &notice, None, None, &matching_config());

	assert_eq!(outcome, GateOutcome::Rejected(RejectStage::ExclusionKeyword));
}

#[test]
fn tier2_deep_review_verdict_is_sticky_over_gate_score() {
	let profile = small_local_charity();
	let lot = Lot {
		id: "lot-1".to_string(),
		title: None,
		value: Some(Decimal::new(60_000, 0)),
		suitability: Suitability::default(),
	};
	let notice = national_framework_notice(Decimal::new(50_000_000, 0), vec![lot]);

	let outcome = run_funnel(&profile, &notice, Some(DeepVerdict::Fail), None, &matching_config());

	match outcome {
		GateOutcome::Passed(scored) => assert_eq!(scored.verdict, Verdict::NoGo),
		other => panic!("expected a passed match, got {other:?}"),
	}
}

#[test]
fn renewal_radar_attaches_flag_and_reason_for_a_seen_buyer() {
	let profile = small_local_charity();
	let lot = Lot {
		id: "lot-1".to_string(),
		title: None,
		value: Some(Decimal::new(60_000, 0)),
		suitability: Suitability::default(),
	};
	let notice = national_framework_notice(Decimal::new(50_000_000, 0), vec![lot]);
	let renewal = procure_domain::summarise_renewal(
		true,
		&[procure_domain::HistoricalAward {
			publication_date: OffsetDateTime::now_utc() - time::Duration::days(730),
			suppliers: vec!["Acme Care Ltd".to_string()],
		}],
		OffsetDateTime::now_utc(),
		&[1, 2, 3, 5],
		0.75,
		3,
	);

	let outcome = run_funnel(&profile, &notice, None, Some(&renewal), &matching_config());

	match outcome {
		GateOutcome::Passed(scored) => {
			assert!(scored.risk_flags.contains_key("renewal_radar"));
			assert!(scored.recommendation_reasons.iter().any(|reason| reason.contains("Renewal Radar")));
		}
		other => panic!("expected a passed match, got {other:?}"),
	}
}
