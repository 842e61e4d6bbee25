//! Score Submission
//!
//! When the local player dies the final score is handed to an external
//! collaborator. The submission runs as a detached task: the reconciler
//! never waits for it, failures are logged and dropped, and nothing retries.

use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A score to submit for a player (or the anonymous alias).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreClaim {
    /// Player id or anonymous alias
    pub alias: String,
    /// Final score
    pub score: u32,
}

/// Score submission errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The backend could not be reached.
    #[error("score service unavailable: {0}")]
    Unavailable(String),
}

/// External score sink.
///
/// `submit` is called synchronously from the update path; only the
/// returned future runs in the background.
pub trait ScoreSubmitter: Send + Sync {
    /// Start submitting a score.
    fn submit(&self, alias: &str, score: u32) -> BoxFuture<'static, Result<(), SubmitError>>;
}

/// Spawn a submission without awaiting it.
///
/// Returns the task handle for callers that want to observe completion
/// (tests); the reconciler drops it.
pub fn submit_detached(
    submitter: &Arc<dyn ScoreSubmitter>,
    claim: ScoreClaim,
) -> Option<JoinHandle<()>> {
    let future = submitter.submit(&claim.alias, claim.score);

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn(async move {
            match future.await {
                Ok(()) => info!("Posted score of {} for PlayerId: {}", claim.score, claim.alias),
                Err(e) => error!("Failed to post score for {}: {}", claim.alias, e),
            }
        })),
        Err(_) => {
            warn!("No async runtime, score for {} not posted", claim.alias);
            None
        }
    }
}

/// Submitter that only logs. Default for the standalone client.
#[derive(Debug, Default, Clone)]
pub struct LoggingSubmitter;

impl ScoreSubmitter for LoggingSubmitter {
    fn submit(&self, alias: &str, score: u32) -> BoxFuture<'static, Result<(), SubmitError>> {
        info!("Score {} ready for {}", score, alias);
        Box::pin(async { Ok(()) })
    }
}

/// Submitter that keeps every claim in memory.
///
/// Claims are recorded when `submit` is called, before the background
/// future runs. Can be told to fail to exercise the error path.
#[derive(Debug, Default, Clone)]
pub struct RecordingSubmitter {
    claims: Arc<Mutex<Vec<ScoreClaim>>>,
    failure: Option<SubmitError>,
}

impl RecordingSubmitter {
    /// Create a submitter that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a submitter that always fails with `err`.
    pub fn failing(err: SubmitError) -> Self {
        Self {
            claims: Arc::default(),
            failure: Some(err),
        }
    }

    /// Claims seen so far.
    pub fn claims(&self) -> Vec<ScoreClaim> {
        self.claims.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ScoreSubmitter for RecordingSubmitter {
    fn submit(&self, alias: &str, score: u32) -> BoxFuture<'static, Result<(), SubmitError>> {
        if let Ok(mut claims) = self.claims.lock() {
            claims.push(ScoreClaim {
                alias: alias.to_string(),
                score,
            });
        }
        let result = match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        };
        Box::pin(async move { result })
    }
}
