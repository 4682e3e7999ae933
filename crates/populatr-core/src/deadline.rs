use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::error::{PopulatrError, Result};

/// Optional wall-clock limit for a whole run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    timeout: Duration,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Some(Instant::now() + timeout),
            timeout,
        }
    }

    pub fn none() -> Self {
        Self {
            at: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn from_option(timeout: Option<Duration>) -> Self {
        timeout.map(Self::after).unwrap_or_else(Self::none)
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn exceeded(&self, stage: &str) -> PopulatrError {
        PopulatrError::DeadlineExceeded {
            stage: stage.to_string(),
            timeout_secs: self.timeout.as_secs(),
        }
    }

    /// Fail fast if the deadline has already passed.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_expired() {
            return Err(self.exceeded(stage));
        }
        Ok(())
    }

    /// Run `fut`, cancelling it if the deadline passes first.
    pub async fn run<F: Future>(&self, stage: &str, fut: F) -> Result<F::Output> {
        match self.at {
            Some(at) => timeout_at(at, fut).await.map_err(|_| self.exceeded(stage)),
            None => Ok(fut.await),
        }
    }
}
