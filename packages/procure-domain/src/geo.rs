const NATIONAL_REGION_MARKERS: [&str; 3] = ["national", "united kingdom", "uk"];

fn normalised(regions: &[String]) -> Vec<String> {
	regions.iter().map(|region| region.trim().to_lowercase()).collect()
}

/// A profile is "national" if its income exceeds the configured threshold
/// or it declares one of the national region markers.
pub fn is_national(latest_income: Option<i64>, regions: &[String], income_threshold: i64) -> bool {
	if let Some(income) = latest_income
		&& income > income_threshold
	{
		return true;
	}

	let regions = normalised(regions);

	NATIONAL_REGION_MARKERS.iter().any(|marker| regions.iter().any(|region| region == marker))
}

/// Geo gate + score. Returns `None` for the local-with-declared-regions-and-
/// no-overlap case, which is the only hard rejection in this stage.
pub fn score(
	profile_regions: &[String],
	notice_regions: &[String],
	latest_income: Option<i64>,
	income_threshold: i64,
) -> Option<f32> {
	let profile_regions = normalised(profile_regions);
	let notice_regions = normalised(notice_regions);
	let overlaps = profile_regions.iter().any(|region| notice_regions.contains(region));

	if is_national(latest_income, &profile_regions, income_threshold) {
		return Some(if overlaps || notice_regions.is_empty() { 1.0 } else { 0.25 });
	}

	if overlaps {
		return Some(1.0);
	}
	if notice_regions.is_empty() {
		return Some(0.5);
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn national_by_income() {
		assert!(is_national(Some(6_000_000), &[], 5_000_000));
		assert!(!is_national(Some(1_000_000), &[], 5_000_000));
	}

	#[test]
	fn national_by_region_marker() {
		assert!(is_national(None, &["National".to_string()], 5_000_000));
		assert!(is_national(None, &["United Kingdom".to_string()], 5_000_000));
		assert!(!is_national(None, &["London".to_string()], 5_000_000));
	}

	#[test]
	fn national_notice_with_no_regions_scores_one() {
		let score = score(&["national".to_string()], &[], Some(6_000_000), 5_000_000);

		assert_eq!(score, Some(1.0));
	}

	#[test]
	fn national_no_overlap_scores_neutral_quarter() {
		let score =
			score(&["london".to_string()], &["west midlands".to_string()], Some(6_000_000), 5_000_000);

		assert_eq!(score, Some(0.25));
	}

	#[test]
	fn local_with_overlap_scores_one() {
		let score = score(&["london".to_string()], &["london".to_string()], Some(250_000), 5_000_000);

		assert_eq!(score, Some(1.0));
	}

	#[test]
	fn local_with_no_declared_notice_regions_passes_neutral() {
		let score = score(&["london".to_string()], &[], Some(250_000), 5_000_000);

		assert_eq!(score, Some(0.5));
	}

	#[test]
	fn local_with_declared_regions_and_no_overlap_rejects() {
		let score =
			score(&["london".to_string()], &["west midlands".to_string()], Some(250_000), 5_000_000);

		assert_eq!(score, None);
	}
}
