use std::time::Duration;

use procure_config::{EmbeddingProviderConfig, RetryPolicy};
use reqwest::Client;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::retry::with_retry;

/// Embeds a batch of texts via the configured embedding provider, retrying
/// transient failures per `policy`. Batching is the caller's concern; this
/// sends exactly one request per call.
pub async fn embed(
	cfg: &EmbeddingProviderConfig,
	policy: &RetryPolicy,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	with_retry(&cfg.provider_id, policy, || call_once(cfg, texts)).await
}

async fn call_once(cfg: &EmbeddingProviderConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client.post(url).headers(crate::auth_headers(&cfg.api_key, &Default::default())?).json(&body).send().await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_embedding_response(json)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(Value::as_array)
		.ok_or_else(|| Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() })?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index =
			item.get("index").and_then(Value::as_u64).map(|value| value as usize).unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(Value::as_array).ok_or_else(|| Error::InvalidResponse {
			message: "Embedding item missing embedding array.".to_string(),
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value
				.as_f64()
				.ok_or_else(|| Error::InvalidResponse { message: "Embedding value must be numeric.".to_string() })?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn rejects_missing_data_array() {
		let json = serde_json::json!({});

		assert!(parse_embedding_response(json).is_err());
	}
}
