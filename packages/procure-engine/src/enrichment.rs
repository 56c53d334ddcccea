//! Mesh-gated enrichment: produces an embedding and UKCAT
//! activity codes for a notice the Interest Mesh has flagged as relevant,
//! persisting only the two enriched columns.

use pgvector::Vector;
use procure_config::{EmbeddingProviderConfig, RetryPolicy};
use procure_domain::activity_tagger;
use procure_storage::models::NoticeRow;
use procure_storage::queries;
use sqlx::PgExecutor;

use crate::{EmbeddingProvider, Result};

/// Enriches `notice` in place and persists the result, unless both outputs
/// already exist and `force` is false. A notice with empty title+description
/// enriches to an empty embedding and an empty tag set — never an error.
pub async fn enrich(
	executor: impl PgExecutor<'_>,
	embedding_provider: &dyn EmbeddingProvider,
	embedding_cfg: &EmbeddingProviderConfig,
	retry_policy: &RetryPolicy,
	notice: &NoticeRow,
	force: bool,
) -> Result<()> {
	let needs_embedding = force || notice.embedding.is_none();
	let needs_tags = force || notice.inferred_ukcat_codes.is_empty();

	if !needs_embedding && !needs_tags {
		return Ok(());
	}

	let embedding = if needs_embedding {
		embed_description(embedding_provider, embedding_cfg, retry_policy, &notice.description).await?
	} else {
		notice.embedding.clone()
	};
	let tags = if needs_tags {
		activity_tagger::tag(&format!("{} {}", notice.title, notice.description))
	} else {
		notice.inferred_ukcat_codes.clone()
	};

	queries::update_enrichment(executor, &notice.ocid, embedding.as_ref(), &tags).await?;

	Ok(())
}

async fn embed_description(
	provider: &dyn EmbeddingProvider,
	cfg: &EmbeddingProviderConfig,
	policy: &RetryPolicy,
	description: &str,
) -> Result<Option<Vector>> {
	let normalised = description.replace('\n', " ");

	if normalised.trim().is_empty() {
		return Ok(None);
	}

	let mut vectors = provider.embed(cfg, policy, &[normalised]).await?;
	let vector = vectors.pop().unwrap_or_default();

	Ok(Some(Vector::from(vector)))
}
