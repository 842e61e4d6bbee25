//! Transport
//!
//! A persistent bidirectional text connection. The engine owns exactly one
//! transport, created explicitly and injected; there is no global socket.
//!
//! Inbound frames are delivered on a channel, one frame per message, and
//! the engine handles each to completion before reading the next.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Send attempted while not connected. Frames are never queued.
    #[error("not connected")]
    NotConnected,

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Outbound half of a connection as seen by the engine.
pub trait Transport: Send {
    /// Send one text frame.
    fn send(&self, frame: String) -> Result<(), TransportError>;

    /// Close the connection. Safe to call more than once.
    fn close(&mut self);

    /// Whether frames can currently be sent.
    fn is_connected(&self) -> bool;
}

// =============================================================================
// WEBSOCKET
// =============================================================================

/// WebSocket connection backed by a reader task and a writer task.
pub struct WsConnection {
    outbound: Option<mpsc::UnboundedSender<Message>>,
    connected: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl WsConnection {
    /// Connect and start the I/O tasks.
    ///
    /// Returns the connection and the receiver of inbound text frames.
    /// The receiver closes when the server closes or the socket fails.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>), TransportError> {
        info!("Connecting to {}...", url);
        let (ws_stream, _) = connect_async(url).await?;
        info!("[WebSocket] Connected");

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let connected = Arc::new(AtomicBool::new(true));

        let reader_connected = connected.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        debug!("[WebSocket] Message: {}", text);
                        if inbound_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Server closed connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("[WebSocket] Error: {}", e);
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            debug!("Reader task ended");
        });

        let writer_connected = connected.clone();
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    error!("Failed to send message: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            writer_connected.store(false, Ordering::SeqCst);
            debug!("Writer loop ended");
        });

        Ok((
            Self {
                outbound: Some(outbound_tx),
                connected,
                reader: Some(reader),
            },
            inbound_rx,
        ))
    }
}

impl Transport for WsConnection {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let outbound = self.outbound.as_ref().ok_or(TransportError::NotConnected)?;
        outbound
            .send(Message::Text(frame))
            .map_err(|_| TransportError::NotConnected)
    }

    fn close(&mut self) {
        let Some(outbound) = self.outbound.take() else {
            return;
        };
        self.connected.store(false, Ordering::SeqCst);
        let _ = outbound.send(Message::Close(None));
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        info!("[WebSocket] Closed");
    }

    fn is_connected(&self) -> bool {
        self.outbound.is_some() && self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// In-process transport that records every frame it is asked to send.
///
/// Clones share the same buffer, so a test can keep one clone while the
/// engine owns another.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<String>>>,
    connected: Arc<AtomicBool>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Create a connected transport.
    pub fn new() -> Self {
        Self {
            sent: Arc::default(),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Frames sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Drain the frames sent so far.
    pub fn take_sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|mut s| std::mem::take(&mut *s))
            .unwrap_or_default()
    }

    /// Simulate the peer dropping the connection.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Transport for MemoryTransport {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(frame);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
