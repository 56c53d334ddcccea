use time::OffsetDateTime;

/// A single historical award release for a buyer, already filtered to a
/// shared CPV prefix by the caller.
#[derive(Debug, Clone)]
pub struct HistoricalAward {
	pub publication_date: OffsetDateTime,
	pub suppliers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenewalSummary {
	pub buyer_seen_before: bool,
	pub historical_contract_count: usize,
	pub incumbent: Option<String>,
	pub last_awarded_date: Option<OffsetDateTime>,
	pub estimated_cycle_years: Option<u32>,
	pub unique_suppliers: Vec<String>,
	pub radar_summary: String,
}

/// Snaps years-since-last-award to the nearest configured cycle candidate
/// within tolerance; falls back to the configured default when none match.
pub fn estimate_cycle_years(
	years_since_last_award: f32,
	candidates: &[u32],
	tolerance: f32,
	default_cycle_years: u32,
) -> u32 {
	candidates
		.iter()
		.copied()
		.find(|candidate| (years_since_last_award - *candidate as f32).abs() < tolerance)
		.unwrap_or(default_cycle_years)
}

/// Pure summary computation over a buyer's historical award history. The
/// caller must supply `history` newest-first: the incumbent is the first
/// supplier encountered walking it in that order. Never errors — an empty
/// history or no buyer reference both produce a `radar_summary` explaining
/// why no intelligence is available.
pub fn summarise(
	buyer_reference_present: bool,
	history: &[HistoricalAward],
	now: OffsetDateTime,
	cycle_candidates: &[u32],
	cycle_tolerance: f32,
	default_cycle_years: u32,
) -> RenewalSummary {
	if !buyer_reference_present {
		return RenewalSummary {
			buyer_seen_before: false,
			historical_contract_count: 0,
			incumbent: None,
			last_awarded_date: None,
			estimated_cycle_years: None,
			unique_suppliers: Vec::new(),
			radar_summary: "No buyer reference — cannot perform historical lookup.".to_string(),
		};
	}
	if history.is_empty() {
		return RenewalSummary {
			buyer_seen_before: false,
			historical_contract_count: 0,
			incumbent: None,
			last_awarded_date: None,
			estimated_cycle_years: None,
			unique_suppliers: Vec::new(),
			radar_summary: "New buyer — no prior history in this sector.".to_string(),
		};
	}

	let mut suppliers = Vec::new();

	for award in history {
		for supplier in &award.suppliers {
			if !suppliers.contains(supplier) {
				suppliers.push(supplier.clone());
			}
		}
	}

	let last_awarded_date = history.iter().map(|award| award.publication_date).max();
	let estimated_cycle_years = last_awarded_date.map(|last| {
		let years_since = (now - last).whole_days() as f32 / 365.25;

		estimate_cycle_years(years_since, cycle_candidates, cycle_tolerance, default_cycle_years)
	});
	let unique_suppliers: Vec<String> = suppliers.iter().take(5).cloned().collect();
	let incumbent = suppliers.first().cloned();

	let radar_summary = render_summary(
		history.len(),
		incumbent.as_deref(),
		last_awarded_date,
		estimated_cycle_years,
		&unique_suppliers,
	);

	RenewalSummary {
		buyer_seen_before: true,
		historical_contract_count: history.len(),
		incumbent,
		last_awarded_date,
		estimated_cycle_years,
		unique_suppliers,
		radar_summary,
	}
}

fn render_summary(
	count: usize,
	incumbent: Option<&str>,
	last_awarded_date: Option<OffsetDateTime>,
	estimated_cycle_years: Option<u32>,
	unique_suppliers: &[String],
) -> String {
	let mut lines = Vec::new();

	match incumbent {
		Some(name) => lines.push(format!("Incumbent: {name}")),
		None => lines.push("No clear incumbent identified in history.".to_string()),
	}

	if let (Some(last), Some(cycle)) = (last_awarded_date, estimated_cycle_years) {
		lines.push(format!("Last awarded: {last} (est. {cycle}-year cycle)"));
	}

	if unique_suppliers.len() > 1 {
		let competitors = unique_suppliers[1..].join(", ");

		lines.push(format!("Other competitors seen: {competitors}"));
	}

	lines.push(format!("{count} historical contract(s) found for this buyer in this sector."));

	lines.join("\n")
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn no_buyer_reference_short_circuits() {
		let summary = summarise(false, &[], OffsetDateTime::now_utc(), &[1, 2, 3, 5], 0.75, 3);

		assert!(!summary.buyer_seen_before);
		assert!(summary.radar_summary.contains("No buyer reference"));
	}

	#[test]
	fn empty_history_reports_new_buyer() {
		let summary = summarise(true, &[], OffsetDateTime::now_utc(), &[1, 2, 3, 5], 0.75, 3);

		assert!(!summary.buyer_seen_before);
		assert!(summary.radar_summary.contains("New buyer"));
	}

	#[test]
	fn estimate_cycle_years_snaps_to_nearest_candidate() {
		assert_eq!(estimate_cycle_years(2.2, &[1, 2, 3, 5], 0.75, 3), 2);
		assert_eq!(estimate_cycle_years(5.1, &[1, 2, 3, 5], 0.75, 3), 5);
		assert_eq!(estimate_cycle_years(8.0, &[1, 2, 3, 5], 0.75, 3), 3);
	}

	#[test]
	fn summarise_picks_most_recent_award_as_incumbent_source() {
		let now = datetime!(2026-01-01 0:00 UTC);
		let history = vec![
			HistoricalAward {
				publication_date: now - time::Duration::days((2.2 * 365.25) as i64),
				suppliers: vec!["Acme Care Ltd".to_string()],
			},
			HistoricalAward {
				publication_date: now - time::Duration::days((5.1 * 365.25) as i64),
				suppliers: vec!["Beta Services Ltd".to_string()],
			},
		];

		let summary = summarise(true, &history, now, &[1, 2, 3, 5], 0.75, 3);

		assert!(summary.buyer_seen_before);
		assert_eq!(summary.historical_contract_count, 2);
		assert_eq!(summary.incumbent.as_deref(), Some("Acme Care Ltd"));
		assert_eq!(summary.estimated_cycle_years, Some(2));
		assert_eq!(summary.unique_suppliers.len(), 2);
	}
}
