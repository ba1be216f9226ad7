use std::{
  backtrace::{Backtrace, BacktraceStatus},
  fmt::Display,
};

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};

/// Error taxonomy. Not a type hierarchy — a tag carried alongside the
/// underlying `anyhow::Error` so callers (in particular the dialogue
/// manager) can decide how to react without downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
  /// LLM/embedding network error or timeout. Retried with backoff upstream;
  /// reaching this point means retries were exhausted.
  #[error("transient upstream failure")]
  TransientUpstream,
  /// LLM refused or returned schema-violating output after a repair retry.
  #[error("permanent upstream failure")]
  PermanentUpstream,
  /// Corrupt session blob, orphan foreign key, or similar — no recovery attempted.
  #[error("data integrity violation")]
  DataIntegrity,
  /// A turn exceeded its time budget.
  #[error("capacity exceeded")]
  Capacity,
  /// A mutation would violate a documented invariant (e.g. confirm+deny overlap).
  #[error("invariant violation")]
  InvariantViolation,
  /// Anything else — mapped to HTTP 500, not part of the documented taxonomy.
  #[error("internal error")]
  Internal,
}

#[derive(Debug)]
pub struct AppError {
  err: anyhow::Error,
  status_code: StatusCode,
  kind: ErrorKind,
}

impl AppError {
  /// Create with 500 status and `ErrorKind::Internal`.
  pub fn new<E: Into<anyhow::Error>>(err: E) -> Self {
    Self {
      err: err.into(),
      status_code: StatusCode::INTERNAL_SERVER_ERROR,
      kind: ErrorKind::Internal,
    }
  }

  /// Create with custom status and `ErrorKind::Internal`.
  pub fn with_status<E: Into<anyhow::Error>>(status: StatusCode, err: E) -> Self {
    Self {
      err: err.into(),
      status_code: status,
      kind: ErrorKind::Internal,
    }
  }

  /// Create tagged with a specific `ErrorKind` and status.
  pub fn with_kind<E: Into<anyhow::Error>>(kind: ErrorKind, status: StatusCode, err: E) -> Self {
    Self { err: err.into(), status_code: status, kind }
  }

  pub fn transient<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::TransientUpstream, StatusCode::SERVICE_UNAVAILABLE, err)
  }

  pub fn permanent_upstream<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::PermanentUpstream, StatusCode::BAD_GATEWAY, err)
  }

  pub fn data_integrity<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::DataIntegrity, StatusCode::INTERNAL_SERVER_ERROR, err)
  }

  pub fn capacity<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::Capacity, StatusCode::REQUEST_TIMEOUT, err)
  }

  pub fn invariant<E: Into<anyhow::Error>>(err: E) -> Self {
    Self::with_kind(ErrorKind::InvariantViolation, StatusCode::CONFLICT, err)
  }

  #[must_use]
  pub const fn status_code(&self) -> StatusCode {
    self.status_code
  }

  #[must_use]
  pub const fn kind(&self) -> ErrorKind {
    self.kind
  }

  /// Get backtrace from anyhow (requires `RUST_BACKTRACE=1` to capture)
  pub fn backtrace(&self) -> &Backtrace {
    self.err.backtrace()
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let body = if cfg!(debug_assertions) {
      let bt = self.err.backtrace();
      if bt.status() == BacktraceStatus::Captured {
        format!("{}\nBacktrace:\n{}", self.err, bt)
      } else {
        format!(
          "{}\n(hint: set RUST_BACKTRACE=1 to enable backtrace)",
          self.err
        )
      }
    } else {
      self.err.to_string()
    };
    (self.status_code, body).into_response()
  }
}

impl Display for AppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}] {}", self.status_code, self.err)
  }
}

impl<E> From<E> for AppError
where
  E: Into<anyhow::Error>,
{
  fn from(err: E) -> Self {
    Self::new(err)
  }
}
