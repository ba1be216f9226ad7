//! Exponential backoff for transient upstream (LLM/embedding) failures.
//! The index builder and dialogue manager both wrap individual
//! `embed`/`generate_text` calls with this helper.

use std::{future::Future, time::Duration};

use crate::{AppError, ErrorKind};

const BASE_DELAY: Duration = Duration::from_millis(200);

/// Retry `op` up to `max_attempts` times with exponential backoff
/// (200ms, 400ms, 800ms, ...). Returns the last error, tagged
/// `ErrorKind::TransientUpstream`, once attempts are exhausted.
pub async fn with_backoff<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T, AppError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, AppError>>,
{
  let attempts = max_attempts.max(1);
  let mut last_err = None;

  for attempt in 0..attempts {
    match op().await {
      Ok(value) => return Ok(value),
      Err(err) => {
        if attempt + 1 < attempts {
          let delay = BASE_DELAY * 2u32.pow(attempt);
          tracing::warn!(attempt, ?delay, error = %err, "retrying after transient failure");
          tokio::time::sleep(delay).await;
        }
        last_err = Some(err);
      }
    }
  }

  Err(AppError::transient(anyhow::anyhow!(
    "{}",
    last_err.map(|e| e.to_string()).unwrap_or_else(|| "operation failed".to_owned())
  )))
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;

  #[tokio::test]
  async fn succeeds_after_transient_failures() {
    let calls = AtomicU32::new(0);
    let result = with_backoff(3, || async {
      let n = calls.fetch_add(1, Ordering::SeqCst);
      if n < 2 {
        Err(AppError::transient(anyhow::anyhow!("boom")))
      } else {
        Ok(42)
      }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn exhausts_attempts_and_reports_transient() {
    let result: Result<(), AppError> =
      with_backoff(2, || async { Err(AppError::transient(anyhow::anyhow!("boom"))) }).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientUpstream);
  }
}
