use anyhow::anyhow;
use async_openai::{
  Client,
  config::OpenAIConfig,
  types::chat::{ChatCompletionRequestMessage, CreateChatCompletionRequestArgs},
};
use dbdiag_shared::{AppError, Config};

/// Free-form chat completion, used wherever a plain text response suffices
/// and no JSON schema is supplied.
pub async fn generate_text(
  cfg: &Config,
  messages: Vec<ChatCompletionRequestMessage>,
) -> Result<String, AppError> {
  let client = Client::with_config(
    OpenAIConfig::new()
      .with_api_key(&cfg.openai_api_key)
      .with_api_base(&cfg.openai_base_url),
  );

  let request = CreateChatCompletionRequestArgs::default()
    .model(&cfg.openai_chat_model)
    .messages(messages)
    .build()?;

  let response = client.chat().create(request).await.map_err(crate::openai_error::classify)?;

  response
    .choices
    .into_iter()
    .filter_map(|c| c.message.content)
    .next_back()
    .ok_or_else(|| anyhow!("empty message content").into())
}
