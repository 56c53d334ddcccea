use std::collections::HashMap;
use std::time::Duration;

use procure_config::{LlmProviderConfig, RetryPolicy};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::retry::with_retry;

/// A single Tier-2 deep-review verdict, as carried in the batch response map
/// keyed by OCID.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatVerdict {
	pub verdict: String,
	pub rationale: String,
}

pub type VerdictMap = HashMap<String, ChatVerdict>;

/// Sends one chat-completions request batching every candidate under review
/// and parses the model's OCID → verdict map out of the response, retrying
/// transient failures per `policy`. A malformed or unparseable reply is a
/// run-wide failure — the caller writes nothing on `Err`.
pub async fn deep_review(cfg: &LlmProviderConfig, policy: &RetryPolicy, messages: &[Value]) -> Result<VerdictMap> {
	with_retry(&cfg.provider_id, policy, || call_once(cfg, messages)).await
}

async fn call_once(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<VerdictMap> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"response_format": { "type": "json_object" },
	});
	let res = client.post(&url).headers(crate::auth_headers(&cfg.api_key, &Default::default())?).json(&body).send().await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_verdict_map(json)
}

fn parse_verdict_map(json: Value) -> Result<VerdictMap> {
	let content = json
		.get("choices")
		.and_then(Value::as_array)
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(Value::as_str)
		.ok_or_else(|| Error::InvalidResponse { message: "Chat response is missing message content.".to_string() })?;

	serde_json::from_str(content)
		.map_err(|_| Error::InvalidResponse { message: "Chat content is not a valid OCID-verdict JSON object.".to_string() })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_verdict_map_from_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"ocds-001\": {\"verdict\": \"PASS\", \"rationale\": \"Strong domain overlap.\"}}" } }
			]
		});
		let verdicts = parse_verdict_map(json).expect("parse failed");

		assert_eq!(verdicts["ocds-001"].verdict, "PASS");
		assert_eq!(verdicts["ocds-001"].rationale, "Strong domain overlap.");
	}

	#[test]
	fn rejects_non_json_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "not json" } }]
		});

		assert!(parse_verdict_map(json).is_err());
	}

	#[test]
	fn rejects_missing_choices() {
		assert!(parse_verdict_map(serde_json::json!({})).is_err());
	}
}
