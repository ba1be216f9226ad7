use anyhow::anyhow;
use async_openai::{Client, config::OpenAIConfig, types::embeddings::CreateEmbeddingRequestArgs};
use dbdiag_shared::{AppError, Config};
use sea_orm::prelude::PgVector;

use crate::embed_shared::process_embedding;

/// Embed a single piece of text, normalized to the configured dimension.
pub async fn embed(cfg: &Config, input: &str) -> Result<PgVector, AppError> {
  let client = Client::with_config(
    OpenAIConfig::new()
      .with_api_key(&cfg.openai_api_key)
      .with_api_base(&cfg.openai_base_url),
  );

  let request = CreateEmbeddingRequestArgs::default()
    .model(&cfg.openai_embedding_model)
    .input(input)
    .dimensions(cfg.embedding_dim as u32)
    .build()?;

  let response = client.embeddings().create(request).await.map_err(crate::openai_error::classify)?;

  let embedding = response
    .data
    .into_iter()
    .map(|e| e.embedding)
    .next_back()
    .ok_or_else(|| anyhow!("empty embedding"))?;

  let processed = process_embedding(embedding, cfg.embedding_dim)?;
  Ok(PgVector::from(processed))
}
