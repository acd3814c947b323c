//! The bidirectional frame channel abstraction.
//!
//! A [`Channel`] is the boundary between the protocol layer and whatever
//! carries its frames. The gateway exposes two such channels, one for API
//! request/response exchanges and one for server-pushed events; both sides of
//! the protocol layer only ever see this trait.
//!
//! [`MemoryChannel`] is an in-process implementation used by the test suites
//! to stand in for a gateway, and by embedders that drive the protocol layer
//! from their own I/O loop.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{TransportError, TransportResult};

/// A bidirectional, frame-oriented message channel.
///
/// Frames are opaque byte payloads; ordering is preserved in both directions.
/// `recv` blocks until a frame arrives or the peer goes away.
#[async_trait]
pub trait Channel: Send {
    /// Sends one frame to the peer.
    async fn send(&mut self, frame: Vec<u8>) -> TransportResult<()>;

    /// Receives the next frame from the peer.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionClosed`] once the peer side is
    /// gone; any other error is a transport fault.
    async fn recv(&mut self) -> TransportResult<Vec<u8>>;
}

#[async_trait]
impl Channel for Box<dyn Channel> {
    async fn send(&mut self, frame: Vec<u8>) -> TransportResult<()> {
        (**self).send(frame).await
    }

    async fn recv(&mut self) -> TransportResult<Vec<u8>> {
        (**self).recv().await
    }
}

/// An in-memory [`Channel`] built from a pair of bounded mpsc queues.
pub struct MemoryChannel {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl MemoryChannel {
    /// Creates two connected endpoints.
    ///
    /// Whatever one endpoint sends, the other receives, in order. Dropping an
    /// endpoint makes the peer's `recv` return `ConnectionClosed`.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel(64);
        let (b_tx, b_rx) = mpsc::channel(64);
        (
            Self { tx: a_tx, rx: b_rx },
            Self { tx: b_tx, rx: a_rx },
        )
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn send(&mut self, frame: Vec<u8>) -> TransportResult<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> TransportResult<Vec<u8>> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| TransportError::closed("peer endpoint dropped"))
    }
}
