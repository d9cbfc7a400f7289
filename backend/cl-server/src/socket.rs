//! Boundary between axum's WebSocket and the in-process event protocol.

use cl_core::{Message, Scope, close_code, event, message_type};
use cl_ws::{Application, CONNECTION_ID_KEY, Peer, Transport};

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message as Frame, WebSocket};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::Value;
use uuid::Uuid;

/// What an outgoing application event turns into on the wire.
#[derive(Debug)]
pub enum Outgoing {
    /// Nothing to write
    Skip,
    Frame(Frame),
    /// Write, then stop writing
    Close(Frame),
}

/// Translate a peer frame into an inbound event.
///
/// Ping and pong are answered by axum and never reach the application.
pub fn inbound_event(frame: Frame) -> Option<Message> {
    match frame {
        Frame::Text(text) => Some(event::receive_text(text.as_str())),
        Frame::Binary(bytes) => Some(event::receive_bytes(&bytes)),
        Frame::Close(close) => Some(event::disconnect(
            close.map(|close| close.code).unwrap_or(close_code::NORMAL),
        )),
        Frame::Ping(_) | Frame::Pong(_) => None,
    }
}

/// Translate an outbound application event into a frame.
///
/// The upgrade has already happened by the time the application runs, so
/// `websocket.accept` has nothing left to do.
pub fn outgoing_frame(message: &Message) -> Outgoing {
    match message_type(message) {
        Some(event::SEND) => {
            if let Some(text) = event::text(message) {
                Outgoing::Frame(Frame::Text(text.into()))
            } else if let Some(bytes) = event::bytes(message) {
                Outgoing::Frame(Frame::Binary(Bytes::from(bytes)))
            } else {
                warn!("websocket.send without text or bytes dropped");
                Outgoing::Skip
            }
        }
        Some(event::CLOSE) => Outgoing::Close(Frame::Close(Some(CloseFrame {
            code: event::code(message).unwrap_or(close_code::NORMAL),
            reason: event::reason(message).unwrap_or_default().into(),
        }))),
        Some(event::ACCEPT) => Outgoing::Skip,
        other => {
            debug!("Unhandled outbound event {:?}", other);
            Outgoing::Skip
        }
    }
}

/// Scope for a fresh connection on `path`.
pub fn connection_scope(path: &str, connection_id: Uuid) -> Scope {
    Scope::websocket(path).with_value(CONNECTION_ID_KEY, Value::from(connection_id.to_string()))
}

/// Run `application` over `socket` until both sides are done.
pub async fn handle_socket(socket: WebSocket, application: Arc<dyn Application>, scope: Scope) {
    let label = scope
        .str_value(CONNECTION_ID_KEY)
        .unwrap_or("-")
        .to_string();
    info!("Connection {} opened", label);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (transport, peer) = Transport::pair();
    let Peer {
        sender,
        mut receiver,
    } = peer;

    let send_task = tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            match outgoing_frame(&message) {
                Outgoing::Skip => {}
                Outgoing::Frame(frame) => {
                    if ws_sender.send(frame).await.is_err() {
                        break;
                    }
                }
                Outgoing::Close(frame) => {
                    let _ = ws_sender.send(frame).await;
                    break;
                }
            }
        }
    });

    let mut app_task = tokio::spawn(async move { application.run(scope, transport).await });

    if sender.send(event::connect()).is_err() {
        warn!("Connection {} application gone before connect", label);
    }

    let app_result = loop {
        tokio::select! {
            result = &mut app_task => break result,
            frame = ws_receiver.next() => {
                let inbound = match frame {
                    Some(Ok(frame)) => inbound_event(frame),
                    Some(Err(e)) => {
                        warn!("Connection {} socket error: {}", label, e);
                        Some(event::disconnect(close_code::ABNORMAL))
                    }
                    None => Some(event::disconnect(close_code::ABNORMAL)),
                };
                let Some(inbound) = inbound else {
                    continue;
                };
                let last = message_type(&inbound) == Some(event::DISCONNECT);
                if sender.send(inbound).is_err() || last {
                    drop(sender);
                    break (&mut app_task).await;
                }
            }
        }
    };

    match app_result {
        Ok(Ok(())) => info!("Connection {} closed", label),
        Ok(Err(e)) => error!("Connection {} failed [{}]: {}", label, e.error_code(), e),
        Err(e) => error!("Connection {} application panicked: {}", label, e),
    }

    if let Err(e) = send_task.await {
        debug!("Connection {} writer ended abnormally: {}", label, e);
    }
}
