use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub matching: Matching,
	pub lifecycle: Lifecycle,
	pub renewal: Renewal,
	pub tier2: Tier2,
	pub ingestion: Ingestion,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
	pub api_bind: String,
	#[serde(default)]
	pub allow_non_loopback_bind: bool,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
	#[serde(default)]
	pub retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Matching {
	#[serde(default = "default_value_gate_ratio")]
	pub value_gate_ratio: f32,
	#[serde(default = "default_go_threshold")]
	pub go_threshold: f32,
	#[serde(default = "default_national_income_threshold")]
	pub national_income_threshold: i64,
	#[serde(default)]
	pub weights: MatchWeights,
	#[serde(default = "default_risk_keywords")]
	pub risk_keywords: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MatchWeights {
	#[serde(default = "default_weight_semantic")]
	pub semantic: f32,
	#[serde(default = "default_weight_theme")]
	pub theme: f32,
	#[serde(default = "default_weight_domain")]
	pub domain: f32,
	#[serde(default = "default_weight_geo")]
	pub geo: f32,
}

impl Default for MatchWeights {
	fn default() -> Self {
		MatchWeights {
			semantic: default_weight_semantic(),
			theme: default_weight_theme(),
			domain: default_weight_domain(),
			geo: default_weight_geo(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Lifecycle {
	#[serde(default = "default_material_change_value_ratio")]
	pub material_change_value_ratio: f32,
}

#[derive(Debug, Deserialize)]
pub struct Renewal {
	#[serde(default = "default_lookback_limit")]
	pub lookback_limit: u32,
	#[serde(default = "default_cycle_candidates")]
	pub cycle_candidates: Vec<u32>,
	#[serde(default = "default_cycle_tolerance_years")]
	pub cycle_tolerance_years: f32,
	#[serde(default = "default_cycle_years")]
	pub default_cycle_years: u32,
}

#[derive(Debug, Deserialize)]
pub struct Tier2 {
	#[serde(default = "default_tier2_top_k")]
	pub top_k: u32,
}

#[derive(Debug, Deserialize)]
pub struct Ingestion {
	pub sources: Vec<IngestionSource>,
	#[serde(default = "default_http_timeout_ms")]
	pub http_timeout_ms: u64,
	#[serde(default)]
	pub retry: RetryPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionSource {
	pub source_id: String,
	pub base_url: String,
	/// RFC 3339 timestamp used as the incremental watermark when no prior
	/// `IngestionLog` row exists for this source.
	pub epoch: String,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RetryPolicy {
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	#[serde(default = "default_base_backoff_ms")]
	pub base_backoff_ms: u64,
	#[serde(default = "default_max_backoff_ms")]
	pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		RetryPolicy {
			max_attempts: default_max_attempts(),
			base_backoff_ms: default_base_backoff_ms(),
			max_backoff_ms: default_max_backoff_ms(),
		}
	}
}

fn default_value_gate_ratio() -> f32 {
	0.4
}

fn default_go_threshold() -> f32 {
	0.65
}

fn default_national_income_threshold() -> i64 {
	5_000_000
}

fn default_weight_semantic() -> f32 {
	0.40
}

fn default_weight_theme() -> f32 {
	0.30
}

fn default_weight_domain() -> f32 {
	0.20
}

fn default_weight_geo() -> f32 {
	0.10
}

fn default_risk_keywords() -> Vec<String> {
	vec!["tupe".to_string(), "safeguarding".to_string()]
}

fn default_material_change_value_ratio() -> f32 {
	0.10
}

fn default_lookback_limit() -> u32 {
	10
}

fn default_cycle_candidates() -> Vec<u32> {
	vec![1, 2, 3, 5]
}

fn default_cycle_tolerance_years() -> f32 {
	0.75
}

fn default_cycle_years() -> u32 {
	3
}

fn default_tier2_top_k() -> u32 {
	10
}

fn default_http_timeout_ms() -> u64 {
	30_000
}

fn default_max_attempts() -> u32 {
	5
}

fn default_base_backoff_ms() -> u64 {
	500
}

fn default_max_backoff_ms() -> u64 {
	30_000
}
