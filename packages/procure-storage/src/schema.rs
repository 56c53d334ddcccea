pub fn render_schema(vector_dim: u32) -> String {
	let init = include_str!("../../../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<VECTOR_DIM>", &vector_dim.to_string())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_buyers.sql" => out.push_str(include_str!("../../../sql/tables/001_buyers.sql")),
				"tables/002_notices.sql" => out.push_str(include_str!("../../../sql/tables/002_notices.sql")),
				"tables/003_service_profiles.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_service_profiles.sql")),
				"tables/004_notice_matches.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_notice_matches.sql")),
				"tables/005_alerts.sql" => out.push_str(include_str!("../../../sql/tables/005_alerts.sql")),
				"tables/006_ingestion_logs.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_ingestion_logs.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn renders_every_table_with_the_configured_vector_dim() {
		let sql = render_schema(1536);

		assert!(sql.contains("CREATE TABLE IF NOT EXISTS buyers"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS notices"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS service_profiles"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS notice_matches"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS alerts"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS ingestion_logs"));
		assert!(sql.contains("vector(1536)"));
		assert!(!sql.contains("<VECTOR_DIM>"));
	}
}
