//! Network Layer
//!
//! Wire codec, transport, latency probing and the engine that applies
//! server events to the local mirror. Every mutation of mirrored state
//! happens on the engine task.

pub mod protocol;
pub mod transport;
pub mod latency;
pub mod reconciler;
pub mod client;

pub use protocol::{decode_frame, ClientCommand, InboundFrame, ProtocolError, ServerEvent};
pub use transport::{MemoryTransport, Transport, TransportError, WsConnection};
pub use latency::{LatencyMonitor, ProbeTimer, RecordingProbeTimer, TokioProbeTimer, PROBE_INTERVAL};
pub use reconciler::{Collaborators, Reconciler, SessionHost};
pub use client::{ClientError, ClientHandle, Control, SyncClient, WatchHost};
