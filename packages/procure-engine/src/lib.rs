pub mod alerts;
pub mod enrichment;
pub mod feed;
pub mod ingestion;
pub mod matching;
pub mod ocds_client;
pub mod renewal_radar;
pub mod tier2;

mod error;

pub use error::{Error, Result};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use procure_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, RetryPolicy};
use procure_storage::db::Db;
use procure_storage::mesh::InterestMesh;
use serde_json::Value;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		policy: &'a RetryPolicy,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn deep_review<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		policy: &'a RetryPolicy,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<procure_providers::llm_chat::VerdictMap>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, chat: Arc<dyn ChatProvider>) -> Self {
		Self { embedding, chat }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), chat: provider }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		policy: &'a RetryPolicy,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { procure_providers::embedding::embed(cfg, policy, texts).await.map_err(Error::from) })
	}
}

impl ChatProvider for DefaultProviders {
	fn deep_review<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		policy: &'a RetryPolicy,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<procure_providers::llm_chat::VerdictMap>> {
		Box::pin(async move { procure_providers::llm_chat::deep_review(cfg, policy, messages).await.map_err(Error::from) })
	}
}

/// Top-level service bundle: configuration, the database pool, the
/// process-wide Interest Mesh cache, and the embedding/chat provider bundle.
/// Every component module (`ingestion`, `matching`, `tier2`, ...) takes
/// `&ProcureEngine` plus its own request arguments.
pub struct ProcureEngine {
	pub cfg: Config,
	pub db: Db,
	pub mesh: InterestMesh,
	pub providers: Providers,
}

impl ProcureEngine {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db, mesh: InterestMesh::new(), providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, mesh: InterestMesh::new(), providers }
	}
}
