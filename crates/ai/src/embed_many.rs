use anyhow::anyhow;
use async_openai::{Client, config::OpenAIConfig, types::embeddings::CreateEmbeddingRequestArgs};
use dbdiag_shared::{AppError, Config};
use sea_orm::prelude::PgVector;

/// Embed multiple texts in a single API call.
///
/// Returns one `PgVector` per input, in the same order.
pub async fn embed_many(cfg: &Config, inputs: &[String]) -> Result<Vec<PgVector>, AppError> {
  if inputs.is_empty() {
    return Ok(vec![]);
  }

  let client = Client::with_config(
    OpenAIConfig::new()
      .with_api_key(&cfg.openai_api_key)
      .with_api_base(&cfg.openai_base_url),
  );

  let request = CreateEmbeddingRequestArgs::default()
    .model(&cfg.openai_embedding_model)
    .input(inputs.to_vec())
    .dimensions(cfg.embedding_dim as u32)
    .build()?;

  let response = client.embeddings().create(request).await.map_err(crate::openai_error::classify)?;

  // Sort by index to ensure ordering matches input
  let mut data = response.data;
  data.sort_by_key(|e| e.index);

  if data.len() != inputs.len() {
    return Err(
      anyhow!(
        "embedding count mismatch: expected {}, got {}",
        inputs.len(),
        data.len()
      )
      .into(),
    );
  }

  Ok(
    data
      .into_iter()
      .map(|e| PgVector::from(e.embedding))
      .collect(),
  )
}
