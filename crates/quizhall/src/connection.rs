//! Member connection loops.
//!
//! Once a socket joins a lobby it is split in two. The inbound half
//! reads frames, enforces the role's frame ceiling and the pong deadline,
//! and dispatches decoded events through the registry. The outbound half
//! drains the member's event queue onto the socket and pings on a fixed
//! interval. The lobby never writes to the socket directly; it only
//! enqueues, and closing the queue is what closes the socket.

use std::sync::Arc;

use quizhall_lobby::{LobbyError, MemberContext};
use quizhall_protocol::{ClientEvent, Codec, ServerEvent};
use quizhall_transport::{
    Connection, Frame, FrameReader, FrameWriter, TransportError,
    WebSocketConnection, WebSocketReader, WebSocketWriter,
};
use tokio::sync::mpsc;

use crate::QuizhallError;
use crate::server::ServerState;

enum Outgoing {
    Event(Option<ServerEvent>),
    Ping,
}

/// Runs a joined connection until it is closed by either side.
///
/// `replies` is a second handle onto the member's own queue, used for
/// error replies; it is dropped on exit so the writer can finish once
/// the lobby lets go of its end.
pub(crate) async fn run_member<C: Codec>(
    conn: WebSocketConnection,
    member: MemberContext,
    replies: mpsc::UnboundedSender<ServerEvent>,
    outbound: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) -> Result<(), QuizhallError> {
    let conn_id = conn.id();
    let (reader, writer) = conn.split();

    let writer_task = tokio::spawn(write_loop(writer, outbound, Arc::clone(&state)));

    let reason = read_loop(reader, &member, &replies, &state).await;
    tracing::info!(
        %conn_id,
        lobby_id = %member.lobby_id,
        name = %member.name,
        reason,
        "member connection closing"
    );

    state.registry.leave(&member).await;
    drop(replies);
    let _ = writer_task.await;
    Ok(())
}

/// Reads until the client goes away, misbehaves, or the lobby closes
/// this member. Returns why it stopped.
async fn read_loop<C: Codec>(
    mut reader: WebSocketReader,
    member: &MemberContext,
    replies: &mpsc::UnboundedSender<ServerEvent>,
    state: &ServerState<C>,
) -> &'static str {
    let max_frame = state.config.lobby.max_frame_for(member.is_owner);
    let pong_wait = state.config.lobby.pong_wait;

    loop {
        let read = tokio::select! {
            _ = member.closer.cancelled() => None,
            read = tokio::time::timeout(pong_wait, reader.recv()) => Some(read),
        };

        let data = match read {
            None => return "closed by lobby",
            Some(Err(_)) => return "pong wait elapsed",
            Some(Ok(Err(TransportError::FrameTooLarge(detail)))) => {
                tracing::debug!(conn_id = %reader.id(), %detail, "oversized frame refused");
                return "frame too large";
            }
            Some(Ok(Err(e))) => {
                tracing::debug!(conn_id = %reader.id(), error = %e, "recv error");
                return "read failed";
            }
            Some(Ok(Ok(None))) => return "closed by client",
            Some(Ok(Ok(Some(Frame::Pong)))) => continue,
            Some(Ok(Ok(Some(Frame::Data(data))))) => data,
        };

        if data.len() > max_frame {
            let err = LobbyError::Malformed(format!(
                "frame of {} bytes exceeds the {max_frame} byte limit",
                data.len()
            ));
            report(replies, member, &err);
            return "frame too large";
        }

        let event = match ClientEvent::decode(&state.codec, &data) {
            Ok(event) => event,
            Err(e) => {
                report(replies, member, &LobbyError::from(e));
                continue;
            }
        };

        let kind = event.kind();
        match state.registry.dispatch(member, event).await {
            Ok(outcome) => {
                tracing::debug!(name = %member.name, %kind, ?outcome, "event handled");
            }
            Err(e) => report(replies, member, &e),
        }
    }
}

/// Drains the member's queue onto the socket and keeps it alive with
/// pings. Closes the socket once the queue is closed and empty.
async fn write_loop<C: Codec>(
    mut writer: WebSocketWriter,
    mut outbound: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = writer.id();
    let mut ping = tokio::time::interval(state.config.lobby.ping_interval);
    // The first tick completes immediately.
    ping.tick().await;

    loop {
        let next = tokio::select! {
            event = outbound.recv() => Outgoing::Event(event),
            _ = ping.tick() => Outgoing::Ping,
        };

        match next {
            Outgoing::Event(Some(event)) => {
                let bytes = match state.codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = writer.send(&bytes).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    break;
                }
            }
            Outgoing::Event(None) => break,
            Outgoing::Ping => {
                if let Err(e) = writer.ping().await {
                    tracing::debug!(%conn_id, error = %e, "ping failed");
                    break;
                }
            }
        }
    }

    let _ = writer.close().await;
    tracing::debug!(%conn_id, "writer closed");
}

/// Queues a client-visible error for this member, or logs an internal one.
fn report(
    replies: &mpsc::UnboundedSender<ServerEvent>,
    member: &MemberContext,
    err: &LobbyError,
) {
    if err.is_internal() {
        tracing::warn!(
            lobby_id = %member.lobby_id,
            name = %member.name,
            error = %err,
            "internal error handling member event"
        );
        return;
    }
    tracing::debug!(name = %member.name, error = %err, "member event rejected");
    let _ = replies.send(ServerEvent::error(err.status_code(), err.to_string()));
}
