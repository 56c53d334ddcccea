/// Fixed charity-theme → UKCAT code-prefix mapping. Themes not present here
/// contribute no matched prefixes and are silently dropped from scoring,
/// mirroring the partial mapping observed upstream.
const THEME_PREFIXES: [(&str, &str); 10] = [
	("education", "ED"),
	("health", "HE"),
	("housing", "HO"),
	("poverty relief", "PO"),
	("disability", "DI"),
	("mental health", "MH"),
	("older people", "OP"),
	("children and young people", "CY"),
	("environment", "EN"),
	("employment", "EM"),
];

fn prefixes_for_theme(theme: &str) -> Option<&'static str> {
	let theme = theme.trim().to_lowercase();

	THEME_PREFIXES.iter().find(|(name, _)| *name == theme).map(|(_, prefix)| *prefix)
}

/// Theme overlap score: the fraction of the profile's mapped theme prefixes
/// that are matched by at least one of the notice's inferred UKCAT codes. A
/// profile with no themes scores neutral (0.5).
pub fn score(profile_themes: &[String], notice_ukcat_codes: &[String]) -> f32 {
	if profile_themes.is_empty() {
		return 0.5;
	}

	let theme_prefixes: Vec<&str> =
		profile_themes.iter().filter_map(|theme| prefixes_for_theme(theme)).collect();

	if theme_prefixes.is_empty() {
		return 0.5;
	}

	let matched = theme_prefixes
		.iter()
		.filter(|prefix| notice_ukcat_codes.iter().any(|code| code.starts_with(*prefix)))
		.count();

	matched as f32 / theme_prefixes.len() as f32
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_themes_is_neutral() {
		assert_eq!(score(&[], &["ED01".to_string()]), 0.5);
	}

	#[test]
	fn unmapped_themes_fall_back_to_neutral() {
		assert_eq!(score(&["Arts And Culture".to_string()], &["ED01".to_string()]), 0.5);
	}

	#[test]
	fn full_overlap_scores_one() {
		let themes = vec!["Education".to_string(), "Health".to_string()];
		let codes = vec!["ED01".to_string(), "HE03".to_string()];

		assert_eq!(score(&themes, &codes), 1.0);
	}

	#[test]
	fn partial_overlap_scores_fraction() {
		let themes = vec!["Education".to_string(), "Health".to_string()];
		let codes = vec!["ED01".to_string()];

		assert_eq!(score(&themes, &codes), 0.5);
	}
}
