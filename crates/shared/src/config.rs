use std::env;

use crate::AppError;

/// Immutable configuration, constructed once at startup and handed by
/// `Arc<Config>` into every component that needs it. No module-level
/// singleton — every caller that needs a setting takes a `&Config`.
#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub openai_base_url: String,
  pub openai_api_key: String,
  pub openai_chat_model: String,
  pub openai_embedding_model: String,
  pub embedding_dim: usize,
  /// Cosine similarity threshold for greedy clustering during index build.
  pub cluster_threshold: f32,
  /// Confidence above which the dialogue manager commits to a diagnosis.
  pub diagnosis_threshold: f32,
  /// Confidence above which the dialogue manager force-terminates with its
  /// best guess once the turn budget is exhausted.
  pub forced_diagnosis_threshold: f32,
  /// Max retry attempts for transient upstream (LLM/embedding) failures.
  pub max_retries: u32,
  /// Per-call timeout for LLM/embedding calls, in seconds.
  pub call_timeout_secs: u64,
  /// Overall per-turn budget, in seconds.
  pub turn_budget_secs: u64,
}

fn required_env(key: &str) -> Result<String, AppError> {
  env::var(key).map_err(|_| AppError::new(anyhow::anyhow!("env {key} must be set")))
}

fn optional_env_f32(key: &str, default: f32) -> f32 {
  env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn optional_env_u32(key: &str, default: u32) -> u32 {
  env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn optional_env_u64(key: &str, default: u64) -> u64 {
  env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn optional_env_usize(key: &str, default: usize) -> usize {
  env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
  /// Load configuration from `.env` (if present) and the process environment.
  /// Called exactly once, in each binary's `main`.
  pub fn load() -> Result<Self, AppError> {
    dotenvy::dotenv().ok();

    Ok(Self {
      database_url: required_env("DATABASE_URL")?,
      openai_base_url: required_env("OPENAI_BASE_URL")?,
      openai_api_key: required_env("OPENAI_API_KEY")?,
      openai_chat_model: required_env("OPENAI_CHAT_MODEL")?,
      openai_embedding_model: required_env("OPENAI_EMBEDDING_MODEL")?,
      embedding_dim: optional_env_usize("EMBEDDING_DIM", 1024),
      cluster_threshold: optional_env_f32("CLUSTER_THRESHOLD", 0.85),
      diagnosis_threshold: optional_env_f32("DIAGNOSIS_THRESHOLD", 0.80),
      forced_diagnosis_threshold: optional_env_f32("FORCED_DIAGNOSIS_THRESHOLD", 0.50),
      max_retries: optional_env_u32("MAX_RETRIES", 3),
      call_timeout_secs: optional_env_u64("CALL_TIMEOUT_SECS", 30),
      turn_budget_secs: optional_env_u64("TURN_BUDGET_SECS", 120),
    })
  }

  /// Build a config for tests, without touching the environment.
  #[must_use]
  pub fn for_tests() -> Self {
    Self {
      database_url: "postgres://localhost/dbdiag_test".to_owned(),
      openai_base_url: "http://localhost:0".to_owned(),
      openai_api_key: "test".to_owned(),
      openai_chat_model: "test-chat".to_owned(),
      openai_embedding_model: "test-embed".to_owned(),
      embedding_dim: 8,
      cluster_threshold: 0.85,
      diagnosis_threshold: 0.80,
      forced_diagnosis_threshold: 0.50,
      max_retries: 3,
      call_timeout_secs: 30,
      turn_budget_secs: 120,
    }
  }
}
