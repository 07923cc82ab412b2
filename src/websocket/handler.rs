use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::{
    extract::{Query, State, ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade}},
    http::HeaderMap,
    response::Response,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::AppState;
use crate::errors::{CollabError, ValidationError};
use crate::models::ReceivedMessage;
use crate::services::auth_service;
use crate::utils::leave_guard::LeaveGuard;
use crate::websocket::msg_comment_handler::handle_comment_message;
use crate::websocket::msg_edit_handler::handle_edit_message;
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::websocket::msg_select_handler::handle_select_message;
use crate::ws::{connctx::ConnCtx, registry::RoomHandle};

/// Close code sent when the connect-time credential is rejected.
pub const AUTH_FAILURE_CLOSE_CODE: u16 = 4401;
/// Close code sent when no room id was given.
pub const MISSING_ROOM_CLOSE_CODE: u16 = 4400;

const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection parameters, passed on the upgrade request's query string.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
    pub room: Option<String>,
    #[serde(rename = "fileUrn")]
    pub file_urn: Option<String>,
    #[serde(rename = "fileId")]
    pub file_id: Option<String>,
}

impl ConnectParams {
    /// The room to join: `room` wins over `fileUrn`, which wins over `fileId`.
    /// Blank values are skipped.
    pub fn room_id(&self) -> Option<String> {
        [&self.room, &self.file_urn, &self.file_id]
            .into_iter()
            .flatten()
            .map(|r| r.trim())
            .find(|r| !r.is_empty())
            .map(str::to_string)
    }
}

/// WebSocket handler
pub async fn websocket_handler(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    debug!("New WebSocket connection attempt");

    // The credential may also come from the Authorization header or auth_token cookie
    let room_id = params.room_id();
    let credential = params
        .token
        .or_else(|| auth_service::get_auth_token(&headers).ok());
    let verdict = auth_service::authenticate(
        credential.as_deref(),
        state.config.cloud_auth_jwt_secret.as_deref(),
    );

    ws.on_upgrade(move |socket| async move {
        match (verdict, room_id) {
            (Err(e), _) => {
                warn!("Refusing WebSocket connection: {}", e);
                close_with(socket, AUTH_FAILURE_CLOSE_CODE, "authentication failed").await;
            }
            (Ok(identity), None) => {
                warn!("Refusing WebSocket connection for user {}: no room id", identity.user_id);
                close_with(socket, MISSING_ROOM_CLOSE_CODE, "missing room id").await;
            }
            (Ok(identity), Some(room_id)) => {
                handle_socket(socket, ConnCtx::new(identity, room_id), state).await;
            }
        }
    })
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame { code, reason: Cow::Borrowed(reason) };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!("Failed to send close frame: {}", e);
    }
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, conn: ConnCtx, state: AppState) {
    info!(
        "WebSocket connection established for room {} with connection_id {} (user {})",
        conn.room_id, conn.connection_id, conn.identity.user_id
    );

    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.outbound_buffer.max(1));
    let room = match state.registry.join(&conn, outbound_tx).await {
        Ok(room) => room,
        Err(e) => {
            error!("Failed to join room {} for connection {}: {}", conn.room_id, conn.connection_id, e);
            return;
        }
    };

    // From here on, every way out of this function ends in exactly one leave
    let guard = LeaveGuard::new(state.registry.clone(), conn.clone());

    // Split the socket into sender and receiver
    let (sender, receiver) = socket.split();

    let started = Instant::now();
    let last_seen = Arc::new(AtomicU64::new(0));
    let heartbeat = state.config.heartbeat_interval();
    let idle_timeout = state.config.idle_timeout();

    // Set by the reader when the client closes, so the writer can answer the handshake
    let (close_tx, close_rx) = oneshot::channel();

    // Drain queued events to the socket and keep pinging the client
    let mut send_task = tokio::spawn(write_loop(sender, outbound_rx, close_rx, heartbeat));

    // Listen to the websocket for incoming messages
    let mut recv_task = tokio::spawn(read_loop(receiver, room, conn.clone(), last_seen.clone(), started, close_tx));

    // Wait for either task to finish or the client to go quiet, then stop both
    tokio::select! {
        _ = (&mut send_task) => debug!("Writer for {} finished", conn.connection_id),
        _ = (&mut recv_task) => {
            debug!("Reader for {} finished", conn.connection_id);
            // Give the writer a moment to flush the close reply
            if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
                debug!("Writer for {} did not finish in time", conn.connection_id);
            }
        }
        idle = idle_watchdog(last_seen, started, idle_timeout) => {
            warn!(
                "Connection {} in room {} silent for {:?}, dropping",
                conn.connection_id, conn.room_id, idle
            );
        }
    };
    send_task.abort();
    recv_task.abort();

    guard.leave().await;
    info!("WebSocket connection {} terminated", conn.connection_id);
}

async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Arc<str>>,
    mut close_rx: oneshot::Receiver<()>,
    heartbeat: Duration,
) {
    let mut ticker = tokio::time::interval(heartbeat);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                if sender.send(Message::Text(frame.to_string())).await.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            closed = &mut close_rx => {
                // A dropped sender means the reader ended without a close handshake
                if closed.is_ok() {
                    if let Err(e) = sender.send(Message::Close(None)).await {
                        debug!("Failed to answer close frame: {}", e);
                    }
                }
                break;
            }
        }
    }
}

async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    room: Arc<RoomHandle>,
    conn: ConnCtx,
    last_seen: Arc<AtomicU64>,
    started: Instant,
    close_tx: oneshot::Sender<()>,
) {
    while let Some(frame) = receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!("WebSocket error on connection {}: {}", conn.connection_id, e);
                break;
            }
        };

        // Any frame, pongs included, counts as a sign of life
        last_seen.store(started.elapsed().as_millis() as u64, Ordering::Relaxed);

        match msg {
            Message::Text(text) => {
                if let Err(e) = dispatch(&text, &room, &conn).await {
                    report(&e, &conn);
                }
            }
            Message::Close(_) => {
                let _ = close_tx.send(());
                return;
            }
            Message::Binary(_) => debug!("Ignoring binary frame from {}", conn.connection_id),
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

async fn dispatch(text: &str, room: &RoomHandle, conn: &ConnCtx) -> Result<(), CollabError> {
    let msg: ReceivedMessage = serde_json::from_str(text)
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    match msg {
        ReceivedMessage::ObjectEdit(edit_msg) => handle_edit_message(edit_msg, room, conn).await,
        ReceivedMessage::ObjectSelect(select_msg) => handle_select_message(select_msg, room, conn).await,
        ReceivedMessage::Comment(comment_msg) => handle_comment_message(comment_msg, room, conn).await,
        ReceivedMessage::Ping(ping_msg) => handle_ping_message(&ping_msg, room, conn).await,
    }
}

fn report(e: &CollabError, conn: &ConnCtx) {
    match e {
        CollabError::Validation(v) => warn!(
            "Dropping message from {} in room {}: {}",
            conn.connection_id, conn.room_id, v
        ),
        CollabError::Internal(i) => error!(
            "Internal error handling message from {} in room {}: {}",
            conn.connection_id, conn.room_id, i
        ),
        CollabError::Auth(a) => warn!(
            "Auth error on connection {} in room {}: {}",
            conn.connection_id, conn.room_id, a
        ),
    }
}

/// Resolves once nothing has been heard from the client for `idle_timeout`.
async fn idle_watchdog(last_seen: Arc<AtomicU64>, started: Instant, idle_timeout: Duration) -> Duration {
    let mut ticker = tokio::time::interval(idle_timeout / 4);
    loop {
        ticker.tick().await;
        let seen_at = Duration::from_millis(last_seen.load(Ordering::Relaxed));
        let idle = started.elapsed().saturating_sub(seen_at);
        if idle >= idle_timeout {
            return idle;
        }
    }
}
