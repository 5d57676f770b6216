//! Transport abstraction layer for Quizhall.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network protocol carrying lobby traffic. A connection starts out as
//! a single bidirectional handle and is later [split](Connection::split)
//! into a [`FrameReader`] and a [`FrameWriter`] so that reading and
//! writing can run in independent tasks.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketReader, WebSocketTransport, WebSocketWriter,
};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A unit of inbound traffic.
///
/// Application payloads and liveness responses are surfaced separately so
/// the reader can extend its deadline on either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An application message.
    Data(Vec<u8>),
    /// The peer answered a liveness probe.
    Pong,
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A single connection that can send and receive bytes.
pub trait Connection: Send + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;
    /// Read half produced by [`split`](Self::split).
    type Reader: FrameReader<Error = Self::Error>;
    /// Write half produced by [`split`](Self::split).
    type Writer: FrameWriter<Error = Self::Error>;

    /// Sends data to the remote peer.
    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&mut self) -> Result<Option<Frame>, Self::Error>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), Self::Error>;

    /// Splits the connection into independently owned halves.
    fn split(self) -> (Self::Reader, Self::Writer);

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// The receiving half of a split connection.
pub trait FrameReader: Send + 'static {
    /// The error type for read operations.
    type Error: std::error::Error + Send + Sync;

    /// Receives the next frame. `Ok(None)` means the peer closed.
    async fn recv(&mut self) -> Result<Option<Frame>, Self::Error>;
}

/// The sending half of a split connection.
///
/// Exactly one task should own a writer; every other context hands its
/// outbound bytes to that task.
pub trait FrameWriter: Send + 'static {
    /// The error type for write operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends an application message.
    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Sends a liveness probe.
    async fn ping(&mut self) -> Result<(), Self::Error>;

    /// Sends a close frame and shuts the write side down.
    async fn close(&mut self) -> Result<(), Self::Error>;
}
