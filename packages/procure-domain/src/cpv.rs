use std::collections::BTreeSet;

/// A CPV prefix is the first four digits of a code — the "division" level.
pub fn prefix(code: &str) -> &str {
	let len = code.len().min(4);

	&code[..len]
}

pub fn prefixes(codes: &[String]) -> BTreeSet<String> {
	codes.iter().map(|code| prefix(code).to_string()).collect()
}

/// True when both sides declare at least one CPV code and none of their
/// 4-char prefixes overlap — the hard CPV-gate rejection rule.
pub fn disjoint(notice_codes: &[String], profile_codes: &[String]) -> bool {
	if notice_codes.is_empty() || profile_codes.is_empty() {
		return false;
	}

	let notice_prefixes = prefixes(notice_codes);
	let profile_prefixes = prefixes(profile_codes);

	notice_prefixes.is_disjoint(&profile_prefixes)
}

/// CPV-overlap domain score: 1.0 if the 4-char prefixes intersect, 0.5
/// (neutral) if either side has no codes at all, else 0.0.
pub fn domain_score(notice_codes: &[String], profile_codes: &[String]) -> f32 {
	if notice_codes.is_empty() || profile_codes.is_empty() {
		return 0.5;
	}

	let notice_prefixes = prefixes(notice_codes);
	let profile_prefixes = prefixes(profile_codes);

	if notice_prefixes.is_disjoint(&profile_prefixes) { 0.0 } else { 1.0 }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prefix_truncates_to_four_chars() {
		assert_eq!(prefix("85311000"), "8531");
		assert_eq!(prefix("85"), "85");
	}

	#[test]
	fn disjoint_is_false_when_either_side_empty() {
		assert!(!disjoint(&[], &["85311100".to_string()]));
		assert!(!disjoint(&["85311000".to_string()], &[]));
	}

	#[test]
	fn disjoint_true_when_prefixes_share_nothing() {
		let notice = vec!["85311000".to_string()];
		let profile = vec!["45000000".to_string()];

		assert!(disjoint(&notice, &profile));
	}

	#[test]
	fn domain_score_is_neutral_when_either_side_empty() {
		assert_eq!(domain_score(&[], &["85311100".to_string()]), 0.5);
	}

	#[test]
	fn domain_score_is_one_on_prefix_overlap() {
		let notice = vec!["85311000".to_string()];
		let profile = vec!["85311100".to_string()];

		assert_eq!(domain_score(&notice, &profile), 1.0);
	}
}
