//! WebSocket transport implementation using `tokio-tungstenite`.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{
    Connection, ConnectionId, Frame, FrameReader, FrameWriter, Transport,
    TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    config: WebSocketConfig,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            config: WebSocketConfig::default(),
        })
    }

    /// Caps the size of any inbound message on connections accepted
    /// from now on.
    ///
    /// An oversized frame is refused as soon as its header is read; the
    /// payload is never buffered and `recv` reports
    /// [`TransportError::FrameTooLarge`].
    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.config = self
            .config
            .max_message_size(Some(limit))
            .max_frame_size(Some(limit));
        self
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async_with_config(stream, Some(self.config))
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(ws_io_error(
                    io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        Ok(WebSocketConnection { id, ws })
    }

    fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
        self.listener
            .local_addr()
            .map_err(TransportError::BindFailed)
    }
}

/// A single WebSocket connection, before it is split.
pub struct WebSocketConnection {
    id: ConnectionId,
    ws: WsStream,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;
    type Reader = WebSocketReader;
    type Writer = WebSocketWriter;

    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.ws
            .send(Message::Binary(data.to_vec().into()))
            .await
            .map_err(send_failed)
    }

    async fn recv(&mut self) -> Result<Option<Frame>, Self::Error> {
        loop {
            match self.ws.next().await {
                Some(msg) => match read_frame(msg)? {
                    Some(frame) => return Ok(frame),
                    None => continue,
                },
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.ws.close(None).await.map_err(send_failed)
    }

    fn split(self) -> (Self::Reader, Self::Writer) {
        let (sink, stream) = self.ws.split();
        (
            WebSocketReader {
                id: self.id,
                stream,
            },
            WebSocketWriter { id: self.id, sink },
        )
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Read half of a [`WebSocketConnection`].
pub struct WebSocketReader {
    id: ConnectionId,
    stream: SplitStream<WsStream>,
}

impl WebSocketReader {
    /// Returns the id of the connection this half came from.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl FrameReader for WebSocketReader {
    type Error = TransportError;

    async fn recv(&mut self) -> Result<Option<Frame>, Self::Error> {
        loop {
            match self.stream.next().await {
                Some(msg) => match read_frame(msg)? {
                    Some(frame) => return Ok(frame),
                    None => continue,
                },
                None => return Ok(None),
            }
        }
    }
}

/// Write half of a [`WebSocketConnection`].
pub struct WebSocketWriter {
    id: ConnectionId,
    sink: SplitSink<WsStream, Message>,
}

impl WebSocketWriter {
    /// Returns the id of the connection this half came from.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl FrameWriter for WebSocketWriter {
    type Error = TransportError;

    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.sink
            .send(Message::Binary(data.to_vec().into()))
            .await
            .map_err(send_failed)
    }

    async fn ping(&mut self) -> Result<(), Self::Error> {
        self.sink
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(send_failed)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.sink.close().await.map_err(send_failed)
    }
}

/// Maps one tungstenite read result onto a [`Frame`].
///
/// The outer `Option` is `None` for frames the caller should skip
/// (pings are answered by tungstenite itself); the inner `Option` is
/// `None` once the peer has closed.
fn read_frame(
    msg: Result<Message, tungstenite::Error>,
) -> Result<Option<Option<Frame>>, TransportError> {
    match msg {
        Ok(Message::Binary(data)) => Ok(Some(Some(Frame::Data(data.into())))),
        Ok(Message::Text(text)) => {
            Ok(Some(Some(Frame::Data(text.as_bytes().to_vec()))))
        }
        Ok(Message::Pong(_)) => Ok(Some(Some(Frame::Pong))),
        Ok(Message::Close(_)) => Ok(Some(None)),
        Ok(_) => Ok(None),
        Err(tungstenite::Error::Capacity(e)) => {
            Err(TransportError::FrameTooLarge(e.to_string()))
        }
        Err(e) => Err(TransportError::ReceiveFailed(ws_io_error(
            io::ErrorKind::ConnectionReset,
            e,
        ))),
    }
}

fn send_failed(e: tungstenite::Error) -> TransportError {
    TransportError::SendFailed(ws_io_error(io::ErrorKind::BrokenPipe, e))
}

fn ws_io_error(kind: io::ErrorKind, e: tungstenite::Error) -> io::Error {
    io::Error::new(kind, e)
}
