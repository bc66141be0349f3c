//! WebSocket transport for live channels.
//!
//! Provides [`Socket`] which handles WebSocket I/O for text frames. This is a
//! thin layer that just sends/receives frames; reconnect policy and protocol
//! logic remain in the Sans-IO views.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::AbortHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Capacity of the inbound and outbound frame queues.
const QUEUE_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The socket is closed.
    #[error("socket closed")]
    Closed,
}

impl TransportError {
    /// Returns true if the channel had been established before failing.
    ///
    /// A failed handshake may be a rejected token and is logged louder.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Handle to an open channel.
///
/// Frames are sent/received via the channels, and internal tasks handle the
/// WebSocket I/O. `from_server` yields `None` once the socket has closed.
pub struct Socket {
    /// Send text frames to the server.
    pub to_server: mpsc::Sender<String>,
    /// Receive text frames from the server.
    pub from_server: mpsc::Receiver<String>,
    reader: AbortHandle,
    writer: AbortHandle,
}

impl Socket {
    /// Queue a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the writer task has stopped.
    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        self.to_server.send(text).await.map_err(|_| TransportError::Closed)
    }

    /// Stop both I/O tasks. Dropping the writer closes the socket.
    pub fn stop(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open a WebSocket channel.
///
/// Returns a [`Socket`] once the upgrade handshake completes.
pub async fn connect(url: &str) -> Result<Socket, TransportError> {
    let (stream, _response) =
        connect_async(url).await.map_err(|e| TransportError::Connection(e.to_string()))?;
    let (mut sink, mut source) = stream.split();

    let (to_server_tx, mut to_server_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(text) = to_server_rx.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                warn!(error = %e, "channel write failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let reader = tokio::spawn(async move {
        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if from_server_tx.send(text).await.is_err() {
                        break;
                    }
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "server closed channel");
                    break;
                },
                Ok(_) => {},
                Err(e) => {
                    debug!(error = %e, "channel read failed");
                    break;
                },
            }
        }
    });

    Ok(Socket {
        to_server: to_server_tx,
        from_server: from_server_rx,
        reader: reader.abort_handle(),
        writer: writer.abort_handle(),
    })
}
