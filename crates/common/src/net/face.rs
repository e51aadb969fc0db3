use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::wire::{BlobCommand, Interest, SignedData};

/// Outcome code of a single expressed interest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestResult {
    Data,
    Nack,
    Timeout,
    Cancelled,
    Error,
}

impl fmt::Display for InterestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            InterestResult::Data => "data",
            InterestResult::Nack => "nack",
            InterestResult::Timeout => "timeout",
            InterestResult::Cancelled => "cancelled",
            InterestResult::Error => "error",
        };
        f.write_str(code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FaceError {
    #[error("interest was nacked")]
    Nack,
    #[error("interest timed out")]
    Timeout,
    #[error("interest was cancelled")]
    Cancelled,
    #[error("no peers to forward the interest to")]
    NoRoute,
    #[error("reply {0} does not satisfy the interest")]
    Mismatch(String),
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

impl FaceError {
    /// The result code this error reports to callers
    pub fn result(&self) -> InterestResult {
        match self {
            FaceError::Nack | FaceError::NoRoute => InterestResult::Nack,
            FaceError::Timeout => InterestResult::Timeout,
            FaceError::Cancelled => InterestResult::Cancelled,
            FaceError::Mismatch(_) | FaceError::Transport(_) => InterestResult::Error,
        }
    }
}

/// A request/reply connection to the rest of the group
///
/// `express` makes exactly one attempt; retrying is the caller's business.
#[async_trait]
pub trait Face: Send + Sync + fmt::Debug {
    async fn express(&self, interest: &Interest) -> Result<SignedData, FaceError>;
}

/// Storage relay that keeps data available while its producer is offline
#[async_trait]
pub trait BlobRelay: Send + Sync + fmt::Debug {
    async fn submit(&self, command: BlobCommand) -> Result<(), FaceError>;
}

/// Express `interest` up to `attempts` times
///
/// Each attempt is bounded by the interest lifetime. Only timeouts are
/// retried; a nack or transport error ends the exchange immediately.
pub async fn express_with_retries(
    face: &dyn Face,
    interest: &Interest,
    attempts: u32,
) -> Result<SignedData, FaceError> {
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(interest.lifetime, face.express(interest)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FaceError::Timeout),
        };
        match outcome {
            Ok(data) if interest.matches(&data.name) => return Ok(data),
            Ok(data) => return Err(FaceError::Mismatch(data.name.to_string())),
            Err(FaceError::Timeout) if attempt < attempts => {
                tracing::debug!(name = %interest.name, attempt, "interest timed out, retrying");
            }
            Err(e) => {
                tracing::debug!(name = %interest.name, attempt, result = %e.result(), "interest failed");
                return Err(e);
            }
        }
    }
}

/// Lifetime of `attempts` back-to-back interests
pub fn retry_budget(lifetime: Duration, attempts: u32) -> Duration {
    lifetime * attempts.max(1)
}
