//! Sync Client
//!
//! Runs the [`Reconciler`] on a single tokio task that owns all mutable
//! state. Inbound frames, local controls and probe timer firings are
//! serialized through one `select!` loop:
//!
//! ```text
//!   socket ──frames──┐
//!   handle ──control─┼──► engine task ──► Reconciler ──► watch<EntityStore>
//!   timer ───due─────┘                                └─► WatchHost (score, latency, phase)
//! ```
//!
//! The engine stops when the connection is lost or on [`ClientHandle::shutdown`].
//! There is no reconnection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{ClientConfig, ConfigError};
use crate::core::grid::Direction;
use crate::game::score::ScoreSubmitter;
use crate::game::session::SessionPhase;
use crate::game::store::EntityStore;
use crate::network::latency::{ProbeDue, TokioProbeTimer};
use crate::network::reconciler::{Collaborators, Reconciler, SessionHost};
use crate::network::transport::{Transport, TransportError, WsConnection};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The engine task has exited.
    #[error("engine stopped")]
    EngineStopped,

    /// Configuration could not produce a connect URL.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Local actions delivered to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Enter `Playing`.
    StartGame,
    /// Steer the local snake.
    Steer(Direction),
    /// Stop the engine.
    Shutdown,
}

// =============================================================================
// HOST
// =============================================================================

/// [`SessionHost`] that publishes every value on a watch channel.
#[derive(Debug)]
pub struct WatchHost {
    score: watch::Sender<Option<u32>>,
    name: watch::Sender<Option<String>>,
    latency: watch::Sender<Option<Duration>>,
    phase: watch::Sender<SessionPhase>,
}

impl Default for WatchHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchHost {
    /// Create a host with nothing published yet.
    pub fn new() -> Self {
        Self {
            score: watch::channel(None).0,
            name: watch::channel(None).0,
            latency: watch::channel(None).0,
            phase: watch::channel(SessionPhase::Unconfigured).0,
        }
    }
}

impl SessionHost for WatchHost {
    fn on_score(&self, score: u32) {
        self.score.send_replace(Some(score));
    }

    fn on_player_name(&self, name: &str) {
        self.name.send_replace(Some(name.to_string()));
    }

    fn on_latency(&self, latency: Duration) {
        self.latency.send_replace(Some(latency));
    }

    fn on_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cheap, cloneable handle to a running engine.
#[derive(Clone)]
pub struct ClientHandle {
    control: mpsc::UnboundedSender<Control>,
    store: watch::Receiver<EntityStore>,
    host: Arc<WatchHost>,
}

impl ClientHandle {
    /// Request the start of the game.
    pub fn start_game(&self) -> Result<(), ClientError> {
        self.send(Control::StartGame)
    }

    /// Steer the local snake.
    pub fn steer(&self, direction: Direction) -> Result<(), ClientError> {
        self.send(Control::Steer(direction))
    }

    /// Stop the engine and close the connection.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.send(Control::Shutdown)
    }

    /// Copy of the last committed store.
    pub fn snapshot(&self) -> EntityStore {
        self.store.borrow().clone()
    }

    /// Receiver notified on every committed store change.
    pub fn subscribe(&self) -> watch::Receiver<EntityStore> {
        self.store.clone()
    }

    /// Local player's score, once known.
    pub fn score(&self) -> Option<u32> {
        *self.host.score.borrow()
    }

    /// Local display name, once registered.
    pub fn player_name(&self) -> Option<String> {
        self.host.name.borrow().clone()
    }

    /// Last round trip.
    pub fn latency(&self) -> Option<Duration> {
        *self.host.latency.borrow()
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        *self.host.phase.borrow()
    }

    /// Receiver notified on phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.host.phase.subscribe()
    }

    fn send(&self, control: Control) -> Result<(), ClientError> {
        self.control
            .send(control)
            .map_err(|_| ClientError::EngineStopped)
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Engine constructor.
pub struct SyncClient;

impl SyncClient {
    /// Connect to the configured server and start the engine.
    pub async fn connect(
        config: &ClientConfig,
        submitter: Arc<dyn ScoreSubmitter>,
    ) -> Result<(ClientHandle, JoinHandle<()>), ClientError> {
        let url = config.connect_url()?;
        let (connection, inbound) = WsConnection::connect(&url).await?;
        Ok(Self::spawn(config, Box::new(connection), inbound, submitter))
    }

    /// Start the engine on an existing transport.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        config: &ClientConfig,
        transport: Box<dyn Transport>,
        inbound: mpsc::UnboundedReceiver<String>,
        submitter: Arc<dyn ScoreSubmitter>,
    ) -> (ClientHandle, JoinHandle<()>) {
        let (timer, probes) = TokioProbeTimer::new();
        let host = Arc::new(WatchHost::new());

        let reconciler = Reconciler::new(
            config,
            Collaborators {
                transport,
                timer: Box::new(timer),
                submitter,
                host: host.clone(),
            },
        );
        let store = reconciler.subscribe();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_engine(reconciler, inbound, control_rx, probes));

        (
            ClientHandle {
                control: control_tx,
                store,
                host,
            },
            task,
        )
    }
}

async fn run_engine(
    mut reconciler: Reconciler,
    mut inbound: mpsc::UnboundedReceiver<String>,
    mut control: mpsc::UnboundedReceiver<Control>,
    mut probes: mpsc::UnboundedReceiver<ProbeDue>,
) {
    info!("Engine started for {}", reconciler.player_id());

    loop {
        tokio::select! {
            frame = inbound.recv() => match frame {
                Some(text) => reconciler.handle_frame(&text, Instant::now()),
                None => {
                    info!("Connection lost, session ended");
                    break;
                }
            },
            Some(cmd) = control.recv() => match cmd {
                Control::StartGame => {
                    let _ = reconciler.start_game();
                }
                Control::Steer(direction) => {
                    reconciler.steer(direction);
                }
                Control::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            },
            Some(ProbeDue) = probes.recv() => reconciler.on_probe_due(Instant::now()),
        }
    }

    reconciler.shutdown();
    debug!("Engine stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::PlayerId;
    use crate::game::score::RecordingSubmitter;
    use crate::network::transport::MemoryTransport;

    fn start() -> (
        ClientHandle,
        JoinHandle<()>,
        mpsc::UnboundedSender<String>,
        MemoryTransport,
    ) {
        let config = ClientConfig::default().with_player(PlayerId::new("A"), "Ann");
        let transport = MemoryTransport::new();
        let (frames, inbound) = mpsc::unbounded_channel();
        let (handle, task) = SyncClient::spawn(
            &config,
            Box::new(transport.clone()),
            inbound,
            Arc::new(RecordingSubmitter::new()),
        );
        (handle, task, frames, transport)
    }

    #[tokio::test]
    async fn test_engine_applies_frames() {
        let (handle, _task, frames, _transport) = start();
        let mut store = handle.subscribe();

        frames
            .send(r#"{"event":"config","food":[[1,2,3,"cherry"]]}"#.to_string())
            .unwrap();
        store.changed().await.unwrap();

        assert_eq!(handle.snapshot().food().len(), 1);
        assert_eq!(handle.phase(), SessionPhase::WaitingRoom);
    }

    #[tokio::test]
    async fn test_engine_forwards_controls() {
        let (handle, _task, frames, transport) = start();
        let mut phase = handle.watch_phase();

        frames
            .send(r#"{"event":"config","food":[]}"#.to_string())
            .unwrap();
        phase.changed().await.unwrap();

        handle.start_game().unwrap();
        handle.steer(Direction::Right).unwrap();
        phase.changed().await.unwrap();
        assert_eq!(*phase.borrow(), SessionPhase::Playing);

        // Steering is queued after start, so give the engine a turn.
        while transport.sent().len() < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.sent(), vec![r#"{"event":"startGame"}"#, "m:A:r"]);
    }

    #[tokio::test]
    async fn test_connection_loss_stops_engine() {
        let (handle, task, frames, transport) = start();
        drop(frames);
        task.await.unwrap();

        assert!(!transport.is_connected());
        assert!(matches!(handle.start_game(), Err(ClientError::EngineStopped)));
    }

    #[tokio::test]
    async fn test_shutdown_stops_engine() {
        let (handle, task, _frames, transport) = start();
        handle.shutdown().unwrap();
        task.await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_verified_publishes_name() {
        let (handle, _task, frames, transport) = start();
        frames.send(r#"{"event":"verified"}"#.to_string()).unwrap();

        while transport.sent().len() < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(handle.player_name().as_deref(), Some("Ann"));
        assert_eq!(transport.sent()[1], "p");
    }
}
