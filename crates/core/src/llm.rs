//! The `embed`/`llm_chat` black box, behind a trait so the reasoning
//! components below can be tested against a canned stand-in instead of a
//! live OpenAI-compatible endpoint.

use std::future::Future;
use std::time::Duration;

use dbdiag_ai::ChatCompletionRequestMessage;
use dbdiag_shared::{AppError, Config};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

#[async_trait::async_trait]
pub trait Llm: Send + Sync {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError>;

  async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;

  async fn generate_text(
    &self,
    messages: Vec<ChatCompletionRequestMessage>,
  ) -> Result<String, AppError>;

  async fn generate_object<T>(
    &self,
    messages: Vec<ChatCompletionRequestMessage>,
    schema_name: String,
    schema_description: Option<String>,
  ) -> Result<T, AppError>
  where
    T: DeserializeOwned + JsonSchema;
}

/// Production `Llm` backed by an OpenAI-compatible chat/embedding endpoint.
pub struct OpenAiLlm {
  cfg: Config,
}

impl OpenAiLlm {
  #[must_use]
  pub const fn new(cfg: Config) -> Self {
    Self { cfg }
  }
}

/// Bound a single upstream call to `secs`, mapping an elapsed deadline to
/// `ErrorKind::Capacity` per §5's per-call timeout.
async fn with_call_timeout<T>(secs: u64, fut: impl Future<Output = Result<T, AppError>>) -> Result<T, AppError> {
  match tokio::time::timeout(Duration::from_secs(secs), fut).await {
    Ok(result) => result,
    Err(_elapsed) => Err(AppError::capacity(anyhow::anyhow!("upstream call exceeded {secs}s timeout"))),
  }
}

#[async_trait::async_trait]
impl Llm for OpenAiLlm {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
    let vector = with_call_timeout(self.cfg.call_timeout_secs, dbdiag_ai::embed(&self.cfg, text)).await?;
    Ok(vector.as_slice().to_vec())
  }

  async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
    let vectors = with_call_timeout(self.cfg.call_timeout_secs, dbdiag_ai::embed_many(&self.cfg, texts)).await?;
    Ok(vectors.into_iter().map(|v| v.as_slice().to_vec()).collect())
  }

  async fn generate_text(
    &self,
    messages: Vec<ChatCompletionRequestMessage>,
  ) -> Result<String, AppError> {
    with_call_timeout(self.cfg.call_timeout_secs, dbdiag_ai::generate_text(&self.cfg, messages)).await
  }

  async fn generate_object<T>(
    &self,
    messages: Vec<ChatCompletionRequestMessage>,
    schema_name: String,
    schema_description: Option<String>,
  ) -> Result<T, AppError>
  where
    T: DeserializeOwned + JsonSchema,
  {
    with_call_timeout(
      self.cfg.call_timeout_secs,
      dbdiag_ai::generate_object(&self.cfg, messages, schema_name, schema_description),
    )
    .await
  }
}
