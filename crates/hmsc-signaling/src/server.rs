use std::borrow::Cow;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use hmsc_decoder::TransactionCodec;
use hmsc_manager::SessionManager;
use hmsc_types::{ParticipantId, SessionId};

use crate::events::session_info_for;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{new_outbox, CloseSignal, ConnectionHandle, ConnectionRegistry};
use crate::{close, timing};

/// The signaling server: accepts WebSocket connections, authenticates them
/// against a session, and bridges their messages to a `SessionManager`.
pub struct SignalingServer<C: TransactionCodec> {
    manager: Arc<SessionManager<C>>,
    registry: Arc<ConnectionRegistry>,
}

impl<C: TransactionCodec + 'static> SignalingServer<C> {
    pub fn new(manager: Arc<SessionManager<C>>, registry: Arc<ConnectionRegistry>) -> Arc<Self> {
        Arc::new(Self { manager, registry })
    }

    /// Binds `addr` and serves connections until the listener errors.
    pub async fn serve(self: &Arc<Self>, addr: impl ToSocketAddrs) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        loop {
            let (stream, peer) = listener.accept().await?;
            let this = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(err) = this.handle_connection(stream).await {
                    tracing::debug!(%peer, error = %err, "connection ended");
                }
            });
        }
    }

    async fn handle_connection(self: &Arc<Self>, stream: TcpStream) -> anyhow::Result<()> {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        let (mut sink, mut stream) = ws.split();

        let (session_id, participant_id) = match self.authenticate(&mut sink, &mut stream).await? {
            Some(ids) => ids,
            None => return Ok(()),
        };

        let (outbox_tx, mut outbox_rx) = new_outbox();
        let close_signal = CloseSignal::new();
        self.registry.register(
            session_id.clone(),
            participant_id.clone(),
            ConnectionHandle {
                outbox: outbox_tx,
                close_signal: close_signal.clone(),
            },
        );

        let mut ping_interval = tokio::time::interval(timing::PING_INTERVAL);
        ping_interval.tick().await;
        let mut missed_pings: u32 = 0;

        let close_code = loop {
            tokio::select! {
                biased;

                code = close_signal.wait() => {
                    break code;
                }

                _ = ping_interval.tick() => {
                    if missed_pings >= timing::MAX_MISSED_PINGS {
                        break close::KEEPALIVE_TIMEOUT;
                    }
                    missed_pings += 1;
                    if sink.send(Message::Ping(Vec::new())).await.is_err() {
                        break close::GOING_AWAY;
                    }
                }

                outgoing = outbox_rx.recv() => {
                    let Some(message) = outgoing else { break close::NORMAL; };
                    let text = serde_json::to_string(&message).unwrap_or_default();
                    if sink.send(Message::Text(text)).await.is_err() {
                        break close::GOING_AWAY;
                    }
                }

                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(Message::Pong(_))) => {
                            missed_pings = 0;
                        }
                        Some(Ok(Message::Text(text))) => {
                            self.dispatch(&session_id, &participant_id, &text, &mut sink).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            break close::NORMAL;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::debug!(error = %err, "websocket read error");
                            break close::GOING_AWAY;
                        }
                    }
                }
            }
        };

        self.manager
            .disconnect_participant(&session_id, &participant_id)
            .await;
        self.registry.unregister(&session_id, &participant_id);
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::from(close_code),
                reason: Cow::Borrowed(""),
            })))
            .await;
        Ok(())
    }

    /// Waits up to `timing::AUTH_TIMEOUT` for an `Auth` message and resolves
    /// it against the `SessionManager`. `Ok(None)` means the connection was
    /// already closed by this function.
    async fn authenticate(
        &self,
        sink: &mut (impl futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
        stream: &mut (impl futures_util::Stream<
            Item = Result<Message, tokio_tungstenite::tungstenite::Error>,
        > + Unpin),
    ) -> anyhow::Result<Option<(SessionId, ParticipantId)>> {
        let first = tokio::time::timeout(timing::AUTH_TIMEOUT, stream.next()).await;

        let text = match first {
            Ok(Some(Ok(Message::Text(text)))) => text,
            _ => {
                let _ = close_with(sink, close::AUTH_TIMEOUT).await;
                return Ok(None);
            }
        };

        let parsed: Result<ClientMessage, _> = serde_json::from_str(&text);
        let ClientMessage::Auth {
            session_id,
            pin,
            role,
            label,
        } = (match parsed {
            Ok(msg) => msg,
            Err(_) => {
                let _ = close_with(sink, close::AUTH_TIMEOUT).await;
                return Ok(None);
            }
        })
        else {
            let _ = close_with(sink, close::AUTH_TIMEOUT).await;
            return Ok(None);
        };

        let session_id = SessionId::from(session_id);
        match self
            .manager
            .authenticate(&session_id, pin.as_deref().unwrap_or(""), role, label)
            .await
        {
            Ok(participant_id) => {
                let session_info = session_info_for(self.manager.store(), &session_id);
                if let Some(session_info) = session_info {
                    let _ = sink
                        .send(Message::Text(
                            serde_json::to_string(&ServerMessage::AuthSuccess {
                                participant_id: participant_id.to_string(),
                                session_info,
                            })
                            .unwrap_or_default(),
                        ))
                        .await;
                }
                Ok(Some((session_id, participant_id)))
            }
            Err(err) => {
                let _ = sink
                    .send(Message::Text(
                        serde_json::to_string(&ServerMessage::AuthFailed {
                            message: err.to_string(),
                        })
                        .unwrap_or_default(),
                    ))
                    .await;
                let _ = close_with(sink, close::AUTH_TIMEOUT).await;
                Ok(None)
            }
        }
    }

    async fn dispatch(
        &self,
        session_id: &SessionId,
        participant_id: &ParticipantId,
        text: &str,
        sink: &mut (impl futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
    ) {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(_) => {
                let _ = sink
                    .send(Message::Text(
                        serde_json::to_string(&ServerMessage::error(
                            &hmsc_types::ProtocolError::UnknownMessage,
                        ))
                        .unwrap_or_default(),
                    ))
                    .await;
                return;
            }
        };

        match message {
            ClientMessage::Auth { .. } => {
                let _ = sink
                    .send(Message::Text(
                        serde_json::to_string(&ServerMessage::error(
                            &hmsc_types::ProtocolError::UnknownMessage,
                        ))
                        .unwrap_or_default(),
                    ))
                    .await;
            }
            ClientMessage::ParticipantReady { public_key } => {
                if let Err(err) = self
                    .manager
                    .set_ready(session_id, participant_id, public_key)
                    .await
                {
                    let _ = sink
                        .send(Message::Text(
                            serde_json::to_string(&ServerMessage::error(&err)).unwrap_or_default(),
                        ))
                        .await;
                }
            }
            ClientMessage::SignatureSubmit {
                public_key,
                signature,
            } => {
                if let Err(err) = self
                    .manager
                    .submit_signature(session_id, public_key, signature)
                    .await
                {
                    let _ = sink
                        .send(Message::Text(
                            serde_json::to_string(&ServerMessage::SignatureRejected {
                                message: err.to_string(),
                                public_key: Some(public_key.to_hex()),
                            })
                            .unwrap_or_default(),
                        ))
                        .await;
                }
            }
            ClientMessage::TransactionRejected { reason } => {
                if let Err(err) = self
                    .manager
                    .reject_transaction(session_id, participant_id, reason)
                    .await
                {
                    let _ = sink
                        .send(Message::Text(
                            serde_json::to_string(&ServerMessage::error(&err)).unwrap_or_default(),
                        ))
                        .await;
                }
            }
            ClientMessage::Ping {} => {
                let _ = sink
                    .send(Message::Text(
                        serde_json::to_string(&ServerMessage::Pong {}).unwrap_or_default(),
                    ))
                    .await;
            }
        }
    }
}

async fn close_with(
    sink: &mut (impl futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
    code: u16,
) -> anyhow::Result<()> {
    sink.send(Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: Cow::Borrowed(""),
    })))
    .await?;
    Ok(())
}
