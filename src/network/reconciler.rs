//! Reconciler
//!
//! Applies decoded server events to the mirrored world under per-event
//! merge rules:
//!
//! | Event               | Rule                                                   |
//! |---------------------|--------------------------------------------------------|
//! | `verified`          | register local player, start latency probes            |
//! | `config`            | first write wins; seeds food                           |
//! | `waitingRoomStatus` | full replace per player id, including dead snakes      |
//! | `snake_update_v2`   | patch existing live snakes only; may trigger death     |
//! | `updateFood`        | move/re-type an existing item; never creates food      |
//!
//! Every call runs to completion on the caller's thread. The store is
//! published through a `watch` channel so readers always see the last
//! committed state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::core::grid::Direction;
use crate::core::ids::PlayerId;
use crate::game::score::{ScoreClaim, ScoreSubmitter};
use crate::game::session::{LifecycleController, LifecycleError, SessionPhase, SessionState};
use crate::game::snake::SnakeColors;
use crate::game::store::{EntityStore, PatchOutcome};
use crate::network::latency::{LatencyMonitor, ProbeTimer};
use crate::network::protocol::{
    decode_frame, ClientCommand, ConfigPayload, FoodUpdatePayload, InboundFrame, RosterPayload,
    ServerEvent, SnakeUpdatePayload,
};
use crate::network::transport::Transport;

/// Sinks for the values a UI shows. All methods default to no-ops.
pub trait SessionHost: Send + Sync {
    /// Local player's score changed.
    fn on_score(&self, _score: u32) {}

    /// Local display name is known.
    fn on_player_name(&self, _name: &str) {}

    /// New round-trip measurement.
    fn on_latency(&self, _latency: Duration) {}

    /// Session phase changed.
    fn on_phase(&self, _phase: SessionPhase) {}
}

/// External pieces the reconciler talks to.
pub struct Collaborators {
    /// Outbound connection
    pub transport: Box<dyn Transport>,
    /// One-shot timer for latency probes
    pub timer: Box<dyn ProbeTimer>,
    /// Score sink used on local death
    pub submitter: Arc<dyn ScoreSubmitter>,
    /// UI sinks
    pub host: Arc<dyn SessionHost>,
}

/// Applies inbound events to the entity store and drives the session.
pub struct Reconciler {
    store: watch::Sender<EntityStore>,
    lifecycle: LifecycleController,
    latency: LatencyMonitor,
    colours: SnakeColors,
    transport: Box<dyn Transport>,
    timer: Box<dyn ProbeTimer>,
    host: Arc<dyn SessionHost>,
    last_score: Option<u32>,
}

impl Reconciler {
    /// Create a reconciler for the local player described by `config`.
    pub fn new(config: &ClientConfig, collaborators: Collaborators) -> Self {
        let (store, _) = watch::channel(EntityStore::new());
        let lifecycle = LifecycleController::new(
            config.player_id.clone(),
            config.display_name.clone(),
            config.anonymous,
            collaborators.submitter,
        );

        Self {
            store,
            lifecycle,
            latency: LatencyMonitor::new(config.probe_interval),
            colours: config.colours.clone(),
            transport: collaborators.transport,
            timer: collaborators.timer,
            host: collaborators.host,
            last_score: None,
        }
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    /// Subscribe to store snapshots.
    pub fn subscribe(&self) -> watch::Receiver<EntityStore> {
        self.store.subscribe()
    }

    /// Copy of the current store.
    pub fn snapshot(&self) -> EntityStore {
        self.store.borrow().clone()
    }

    /// Session state.
    pub fn session(&self) -> &SessionState {
        self.lifecycle.state()
    }

    /// Local player id.
    pub fn player_id(&self) -> &PlayerId {
        &self.lifecycle.state().player_id
    }

    /// Last measured round trip.
    pub fn latency(&self) -> Option<Duration> {
        self.latency.last_latency()
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Handle one inbound text frame. Never fails: bad frames are logged
    /// and dropped without touching the store.
    pub fn handle_frame(&mut self, text: &str, now: Instant) {
        #[cfg(feature = "debug-tracing")]
        tracing::trace!("<- {}", text);

        match decode_frame(text) {
            Ok(InboundFrame::ProbeEcho) => self.on_echo(now),
            Ok(InboundFrame::Event(event)) => self.apply(event, now),
            Err(e) => warn!("Dropping frame: {} ({})", e, truncate(text)),
        }
    }

    /// Apply a decoded event.
    pub fn apply(&mut self, event: ServerEvent, now: Instant) {
        match event {
            ServerEvent::Verified => self.on_verified(now),
            ServerEvent::Config(payload) => self.on_config(payload),
            ServerEvent::WaitingRoomStatus(payload) => self.on_roster(payload),
            ServerEvent::SnakeUpdate(payload) => self.on_snake_update(payload),
            ServerEvent::UpdateFood(payload) => self.on_update_food(payload),
            ServerEvent::Unknown { .. } => info!("Unhandled event: {}", event.tag()),
        }
    }

    fn on_verified(&mut self, now: Instant) {
        let state = self.lifecycle.state();
        if state.game_configured() || state.game_over() {
            debug!("Ignoring verified, session already {:?}", state.phase);
            return;
        }
        info!("Verified connection. Server is ready.");

        let command = ClientCommand::NewPlayer {
            name: state.display_name.clone(),
            id: state.player_id.clone(),
            colours: self.colours.clone(),
        };
        self.send(command);
        self.host.on_player_name(&self.lifecycle.state().display_name);

        if self.latency.start(now) {
            self.send(ClientCommand::Probe);
        }
    }

    fn on_config(&mut self, payload: ConfigPayload) {
        let background = payload.config.and_then(|c| c.background_number);
        if !self.lifecycle.mark_configured(background) {
            debug!("Ignoring repeated config");
            return;
        }

        let count = payload.food.len();
        self.store.send_modify(|store| store.seed_food(payload.food));
        info!("Configured with {} food items", count);
        self.host.on_phase(self.lifecycle.phase());
    }

    fn on_roster(&mut self, payload: RosterPayload) {
        let local_id = self.lifecycle.state().player_id.clone();
        let mut local_score = None;

        self.store.send_modify(|store| {
            for entry in payload.players {
                let (id, snake) = entry.into_snake();
                if id == local_id {
                    local_score = Some(snake.score);
                }
                store.replace_snake(id, snake);
            }
        });

        if let Some(score) = local_score {
            self.report_score(score);
        }
    }

    fn on_snake_update(&mut self, payload: SnakeUpdatePayload) {
        let lifecycle = &self.lifecycle;
        let anonymous = lifecycle.state().anonymous;
        let mut local_score = None;
        let mut local_death: Option<Option<ScoreClaim>> = None;

        self.store.send_if_modified(|store| {
            let mut modified = false;
            for diff in payload.snakes {
                let (id, patch) = diff.into_patch();
                match store.apply_patch(&id, patch) {
                    PatchOutcome::UnknownEntity => {
                        debug!("Skipping update for unknown player {}", id);
                    }
                    PatchOutcome::Frozen => {
                        debug!("Skipping update for dead player {}", id);
                    }
                    PatchOutcome::Applied { died } => {
                        modified = true;
                        let local = lifecycle.is_local(&id);
                        if local {
                            local_score = store.snake(&id).map(|s| s.score);
                        }
                        if died {
                            let claim = store.stop_snake(&id, anonymous);
                            if local {
                                local_death = Some(claim);
                            } else {
                                info!("Player {} died", id);
                            }
                        }
                    }
                }
            }
            modified
        });

        if let Some(score) = local_score {
            self.report_score(score);
        }
        if let Some(claim) = local_death {
            if self.lifecycle.on_local_death(claim) {
                self.timer.cancel();
                self.host.on_phase(SessionPhase::Over);
            }
        }
    }

    fn on_update_food(&mut self, payload: FoodUpdatePayload) {
        let mut tuples = payload.food.into_iter();
        let Some(tuple) = tuples.next() else {
            debug!("updateFood without food");
            return;
        };
        let extra = tuples.count();
        if extra > 0 {
            debug!("updateFood carried {} extra tuples, ignored", extra);
        }

        if !self.store.send_if_modified(|store| store.update_food(tuple)) {
            debug!("updateFood for unknown food id {}", tuple.id());
        }
    }

    fn on_echo(&mut self, now: Instant) {
        let Some(rtt) = self.latency.on_echo(now) else {
            debug!("Probe echo without outstanding probe");
            return;
        };
        debug!("Latency: {} ms", rtt.as_millis());
        self.host.on_latency(rtt);

        if !self.lifecycle.state().game_over() {
            self.timer.arm(self.latency.interval());
        }
    }

    /// The probe timer fired.
    pub fn on_probe_due(&mut self, now: Instant) {
        if self.lifecycle.state().game_over() {
            debug!("Probe timer fired after game over");
            return;
        }
        if self.latency.on_timer(now) {
            self.send(ClientCommand::Probe);
        }
    }

    // =========================================================================
    // LOCAL ACTIONS
    // =========================================================================

    /// Local start action. Enters `Playing` immediately and tells the server.
    pub fn start_game(&mut self) -> Result<(), LifecycleError> {
        if let Err(e) = self.lifecycle.start_game() {
            warn!("Cannot start game: {}", e);
            return Err(e);
        }
        self.send(ClientCommand::StartGame);
        self.host.on_phase(self.lifecycle.phase());
        Ok(())
    }

    /// Steer the local snake. Returns whether the command was sent.
    pub fn steer(&mut self, direction: Direction) -> bool {
        if !self.lifecycle.accepts_movement() {
            debug!("Ignoring {:?} outside of play", direction);
            return false;
        }
        let command = ClientCommand::Move {
            player_id: self.player_id().clone(),
            direction,
        };
        self.send(command)
    }

    /// Stop probing and close the connection. Safe to call twice.
    pub fn shutdown(&mut self) {
        self.timer.cancel();
        self.transport.close();
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn send(&self, command: ClientCommand) -> bool {
        let frame = match command.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}", e);
                return false;
            }
        };
        match self.transport.send(frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("[WebSocket] Dropping {}: {}", command.name(), e);
                false
            }
        }
    }

    fn report_score(&mut self, score: u32) {
        if self.last_score != Some(score) {
            self.last_score = Some(score);
            self.host.on_score(score);
        }
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(64) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
