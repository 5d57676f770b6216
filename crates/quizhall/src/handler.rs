//! Per-connection handler: the pre-join control exchange.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Loop: receive control events (create, login, status) and reply
//!   2. On a successful `join`, hand the socket to the member loops
//!
//! A socket that stays silent for `handshake_timeout` before joining is
//! closed.

use std::sync::Arc;

use quizhall_lobby::LobbyError;
use quizhall_protocol::{ClientEvent, Codec, ServerEvent};
use quizhall_transport::{Connection, Frame, TransportError, WebSocketConnection};
use tokio::sync::mpsc;

use crate::QuizhallError;
use crate::connection::run_member;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    mut conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), QuizhallError> {
    let conn_id = conn.id();
    let max_frame = state.config.lobby.player_max_frame;
    tracing::debug!(%conn_id, "handling new connection");

    loop {
        let data = match tokio::time::timeout(
            state.config.handshake_timeout,
            conn.recv(),
        )
        .await
        {
            Ok(Ok(Some(Frame::Data(data)))) => data,
            Ok(Ok(Some(Frame::Pong))) => continue,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "closed before joining");
                return Ok(());
            }
            Ok(Err(TransportError::FrameTooLarge(detail))) => {
                tracing::info!(%conn_id, %detail, "oversized frame before joining");
                return Ok(());
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(%conn_id, "handshake timed out");
                let _ = conn.close().await;
                return Ok(());
            }
        };

        if data.len() > max_frame {
            let err = LobbyError::Malformed(format!(
                "frame of {} bytes exceeds the {max_frame} byte limit",
                data.len()
            ));
            report(&mut conn, &state.codec, &err).await?;
            let _ = conn.close().await;
            return Ok(());
        }

        let event = match ClientEvent::decode(&state.codec, &data) {
            Ok(event) => event,
            Err(e) => {
                report(&mut conn, &state.codec, &LobbyError::from(e)).await?;
                continue;
            }
        };
        tracing::debug!(%conn_id, kind = %event.kind(), "control event");

        match event {
            ClientEvent::CreateLobby { name } => {
                let lobby_id = state.registry.create_lobby(name).await;
                send(&mut conn, &state.codec, &ServerEvent::LobbyCreated {
                    lobby_id,
                })
                .await?;
            }

            ClientEvent::Login {
                lobby_id,
                username,
                password,
            } => match state.registry.login(&lobby_id, username, password).await {
                Ok(grant) => {
                    send(&mut conn, &state.codec, &ServerEvent::LoginAccepted {
                        token: grant.token,
                        is_owner: grant.is_owner,
                    })
                    .await?;
                }
                Err(e) => report(&mut conn, &state.codec, &e).await?,
            },

            ClientEvent::LobbyStatus { lobby_id } => {
                let status = state.registry.lobby_status(&lobby_id).await;
                send(&mut conn, &state.codec, &ServerEvent::LobbyStatus {
                    lobby_id,
                    status,
                })
                .await?;
            }

            ClientEvent::Join { lobby_id, token } => {
                let (tx, rx) = mpsc::unbounded_channel();
                match state.registry.join(&lobby_id, &token, tx.clone()).await {
                    Ok(member) => {
                        tracing::info!(
                            %conn_id,
                            lobby_id = %member.lobby_id,
                            name = %member.name,
                            "connection joined lobby"
                        );
                        return run_member(conn, member, tx, rx, state).await;
                    }
                    Err(e) => report(&mut conn, &state.codec, &e).await?,
                }
            }

            other => {
                let err = LobbyError::Unauthorized(format!(
                    "join a lobby before sending {}",
                    other.kind()
                ));
                report(&mut conn, &state.codec, &err).await?;
            }
        }
    }
}

async fn send(
    conn: &mut WebSocketConnection,
    codec: &impl Codec,
    event: &ServerEvent,
) -> Result<(), QuizhallError> {
    let bytes = codec.encode(event)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends a client-visible error, or logs an internal one.
async fn report(
    conn: &mut WebSocketConnection,
    codec: &impl Codec,
    err: &LobbyError,
) -> Result<(), QuizhallError> {
    if err.is_internal() {
        tracing::warn!(conn_id = %conn.id(), error = %err, "internal error during control exchange");
        return Ok(());
    }
    tracing::debug!(conn_id = %conn.id(), error = %err, "control event rejected");
    send(conn, codec, &ServerEvent::error(err.status_code(), err.to_string())).await
}
