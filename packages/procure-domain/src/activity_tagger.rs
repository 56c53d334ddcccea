use std::sync::OnceLock;

use regex::Regex;

struct Pattern {
	code: &'static str,
	include: &'static str,
	exclude: Option<&'static str>,
}

/// Tabular pattern source, loaded once. Include must match and, if present,
/// exclude must not. Mirrors the UKCAT activity-code classifier's
/// code/include-regex/exclude-regex rows.
const PATTERNS: [Pattern; 8] = [
	Pattern { code: "ED01", include: r"(?i)\b(school|education|tuition|literacy)\b", exclude: None },
	Pattern {
		code: "HE02",
		include: r"(?i)\b(health|clinical|nhs|mental health)\b",
		exclude: Some(r"(?i)\bhealth\s*and\s*safety\b"),
	},
	Pattern { code: "HO03", include: r"(?i)\b(housing|homeless|tenanc(y|ies))\b", exclude: None },
	Pattern {
		code: "PO04",
		include: r"(?i)\b(poverty|food\s*bank|financial hardship)\b",
		exclude: None,
	},
	Pattern { code: "DI05", include: r"(?i)\b(disabilit(y|ies)|accessib)\b", exclude: None },
	Pattern {
		code: "MH06",
		include: r"(?i)\bmental health\b",
		exclude: Some(r"(?i)\bhealth\s*and\s*safety\b"),
	},
	Pattern {
		code: "OP07",
		include: r"(?i)\b(older people|elderly|age\s*uk)\b",
		exclude: None,
	},
	Pattern {
		code: "CY08",
		include: r"(?i)\b(children|young people|youth)\b",
		exclude: None,
	},
];

struct CompiledPattern {
	code: &'static str,
	include: Regex,
	exclude: Option<Regex>,
}

fn compiled_patterns() -> &'static Vec<CompiledPattern> {
	static CELL: OnceLock<Vec<CompiledPattern>> = OnceLock::new();

	CELL.get_or_init(|| {
		PATTERNS
			.iter()
			.map(|pattern| CompiledPattern {
				code: pattern.code,
				include: Regex::new(pattern.include).expect("built-in activity pattern must compile"),
				exclude: pattern
					.exclude
					.map(|exclude| Regex::new(exclude).expect("built-in exclude pattern must compile")),
			})
			.collect()
	})
}

/// Maps free text to a sorted, de-duplicated set of UKCAT activity codes.
pub fn tag(text: &str) -> Vec<String> {
	if text.trim().is_empty() {
		return Vec::new();
	}

	let mut codes: Vec<String> = compiled_patterns()
		.iter()
		.filter(|pattern| {
			pattern.include.is_match(text)
				&& !pattern.exclude.as_ref().is_some_and(|exclude| exclude.is_match(text))
		})
		.map(|pattern| pattern.code.to_string())
		.collect();

	codes.sort();
	codes.dedup();

	codes
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_text_returns_empty() {
		assert!(tag("").is_empty());
		assert!(tag("   ").is_empty());
	}

	#[test]
	fn matches_multiple_independent_codes() {
		let codes = tag("Provision of school meals and homeless shelter support");

		assert_eq!(codes, vec!["ED01".to_string(), "HO03".to_string()]);
	}

	#[test]
	fn exclude_pattern_suppresses_a_match() {
		let codes = tag("Health and safety compliance audit");

		assert!(!codes.contains(&"HE02".to_string()));
	}

	#[test]
	fn case_insensitive_matching() {
		assert_eq!(tag("YOUTH outreach programme"), vec!["CY08".to_string()]);
	}
}
