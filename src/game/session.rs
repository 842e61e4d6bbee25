//! Session Lifecycle
//!
//! Tracks where the local session is:
//!
//! ```text
//! Unconfigured --config--> WaitingRoom --start--> Playing --local death--> Over
//!                                         ^  |
//!                                         +--+ start (idempotent)
//! ```
//!
//! `Playing` is entered optimistically when the local user presses start;
//! the server never acknowledges it. `Over` is terminal and only entered
//! from `Playing`; a local death before start still posts the score.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::ids::PlayerId;
use crate::game::score::{submit_detached, ScoreClaim, ScoreSubmitter};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No `config` received yet.
    Unconfigured,
    /// Configured, waiting for the local start action.
    WaitingRoom,
    /// Local player has started.
    Playing,
    /// Local player died. Terminal.
    Over,
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,
    /// Local player id
    pub player_id: PlayerId,
    /// Local display name
    pub display_name: String,
    /// Submit scores under the anonymous alias
    pub anonymous: bool,
    /// Background selected by the server's `config`, for the renderer
    pub background: Option<u32>,
}

impl SessionState {
    /// `config` has been applied.
    pub fn game_configured(&self) -> bool {
        self.phase != SessionPhase::Unconfigured
    }

    /// Local player has pressed start (and not died yet).
    pub fn game_started(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    /// Local player has died.
    pub fn game_over(&self) -> bool {
        self.phase == SessionPhase::Over
    }
}

/// Lifecycle errors.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// Start requested before `config` arrived.
    #[error("game is not configured yet")]
    NotConfigured,
    /// Session already over.
    #[error("game is over")]
    GameOver,
}

/// Owns the session state and the score-submission side effect.
pub struct LifecycleController {
    state: SessionState,
    submitter: Arc<dyn ScoreSubmitter>,
}

impl LifecycleController {
    /// Create an unconfigured session.
    pub fn new(
        player_id: PlayerId,
        display_name: impl Into<String>,
        anonymous: bool,
        submitter: Arc<dyn ScoreSubmitter>,
    ) -> Self {
        Self {
            state: SessionState {
                phase: SessionPhase::Unconfigured,
                player_id,
                display_name: display_name.into(),
                anonymous,
                background: None,
            },
            submitter,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// Whether `id` is the local player.
    pub fn is_local(&self, id: &PlayerId) -> bool {
        self.state.player_id == *id
    }

    /// Apply the first `config`. Returns false if already configured.
    pub fn mark_configured(&mut self, background: Option<u32>) -> bool {
        if self.state.phase != SessionPhase::Unconfigured {
            return false;
        }
        self.state.phase = SessionPhase::WaitingRoom;
        self.state.background = background;
        info!("Session configured");
        true
    }

    /// Local start action. Enters `Playing` without waiting for the server.
    pub fn start_game(&mut self) -> Result<(), LifecycleError> {
        match self.state.phase {
            SessionPhase::Unconfigured => Err(LifecycleError::NotConfigured),
            SessionPhase::Over => Err(LifecycleError::GameOver),
            SessionPhase::WaitingRoom | SessionPhase::Playing => {
                self.state.phase = SessionPhase::Playing;
                Ok(())
            }
        }
    }

    /// Movement keys are only forwarded while playing.
    pub fn accepts_movement(&self) -> bool {
        self.state.phase == SessionPhase::Playing
    }

    /// The local snake went through its death transition.
    ///
    /// Spawns the score submission for `claim` and, when playing, moves to
    /// `Over`. Returns whether the session ended. Nothing is submitted once
    /// the session is over.
    pub fn on_local_death(&mut self, claim: Option<ScoreClaim>) -> bool {
        if self.state.phase == SessionPhase::Over {
            debug!("Local death reported twice, ignoring");
            return false;
        }

        if let Some(claim) = claim {
            // Detached: the handle is intentionally dropped.
            let _ = submit_detached(&self.submitter, claim);
        }

        if self.state.phase != SessionPhase::Playing {
            info!("Local snake died in {:?}, session continues", self.state.phase);
            return false;
        }
        self.state.phase = SessionPhase::Over;
        info!("Game over for {}", self.state.player_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::score::RecordingSubmitter;

    fn controller(recorder: &RecordingSubmitter) -> LifecycleController {
        LifecycleController::new(
            PlayerId::new("me"),
            "Me",
            false,
            Arc::new(recorder.clone()),
        )
    }

    #[test]
    fn test_configure_once() {
        let recorder = RecordingSubmitter::new();
        let mut lc = controller(&recorder);
        assert!(lc.mark_configured(Some(3)));
        assert!(!lc.mark_configured(Some(7)));
        assert_eq!(lc.phase(), SessionPhase::WaitingRoom);
        assert_eq!(lc.state().background, Some(3));
    }

    #[test]
    fn test_start_requires_config() {
        let recorder = RecordingSubmitter::new();
        let mut lc = controller(&recorder);
        assert_eq!(lc.start_game(), Err(LifecycleError::NotConfigured));

        lc.mark_configured(None);
        assert!(lc.start_game().is_ok());
        assert!(lc.state().game_started());
        // Pressing start again stays in Playing.
        assert!(lc.start_game().is_ok());
        assert!(lc.accepts_movement());
    }

    #[tokio::test]
    async fn test_death_is_terminal_and_submits_once() {
        let recorder = RecordingSubmitter::new();
        let mut lc = controller(&recorder);
        lc.mark_configured(None);
        lc.start_game().unwrap();

        let claim = ScoreClaim {
            alias: "me".into(),
            score: 4,
        };
        assert!(lc.on_local_death(Some(claim.clone())));
        assert!(!lc.on_local_death(Some(claim)));

        assert!(lc.state().game_over());
        assert!(!lc.accepts_movement());
        assert_eq!(lc.start_game(), Err(LifecycleError::GameOver));
        assert_eq!(recorder.claims().len(), 1);
    }

    #[tokio::test]
    async fn test_death_before_start_keeps_waiting_room() {
        let recorder = RecordingSubmitter::new();
        let mut lc = controller(&recorder);
        lc.mark_configured(None);

        let claim = ScoreClaim {
            alias: "me".into(),
            score: 0,
        };
        assert!(!lc.on_local_death(Some(claim)));
        assert_eq!(lc.phase(), SessionPhase::WaitingRoom);
        assert_eq!(recorder.claims().len(), 1);
        assert!(lc.start_game().is_ok());
    }

    #[test]
    fn test_is_local() {
        let recorder = RecordingSubmitter::new();
        let lc = controller(&recorder);
        assert!(lc.is_local(&PlayerId::new("me")));
        assert!(!lc.is_local(&PlayerId::new("you")));
    }
}
