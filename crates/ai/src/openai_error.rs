use async_openai::error::OpenAIError;
use dbdiag_shared::AppError;

/// Classify an `async_openai` client failure so retry/fallback logic
/// upstream (`dbdiag_shared::retry::with_backoff`, the dialogue manager's
/// slow-path repair retry) can tell a worth-retrying connectivity blip from
/// the API having rejected the request outright.
pub(crate) fn classify(err: OpenAIError) -> AppError {
  match &err {
    OpenAIError::Reqwest(_) | OpenAIError::StreamError(_) => AppError::transient(err),
    _ => AppError::permanent_upstream(err),
  }
}
