use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::models::Message;
use super::session::{ConnectionId, Session};

/// Time allowed to write a frame to the peer.
pub const WRITE_WAIT: Duration = Duration::from_secs(10);
/// Time allowed between frames from the peer before it is considered dead.
pub const PONG_WAIT: Duration = Duration::from_secs(60);
/// Ping interval, kept below PONG_WAIT so pings land before the deadline.
pub const PING_PERIOD: Duration = Duration::from_secs(PONG_WAIT.as_secs() * 9 / 10);

/// One socket bound to one session.
pub struct ClientConnection {
    pub id: ConnectionId,
    pub user_id: String,
    pub color: String,
    session: Arc<Session>,
    outbound: mpsc::Receiver<Message>,
}

impl ClientConnection {
    pub fn new(
        id: ConnectionId,
        user_id: String,
        color: String,
        session: Arc<Session>,
        outbound: mpsc::Receiver<Message>,
    ) -> Self {
        Self { id, user_id, color, session, outbound }
    }

    /// Pump frames both ways until either side fails, then leave the session.
    pub async fn run(self, socket: WebSocket) {
        let (sink, stream) = socket.split();
        let ClientConnection { id, user_id, color, session, outbound } = self;

        let mut write_task = tokio::spawn(write_pump(sink, outbound, PING_PERIOD));

        let write_finished = tokio::select! {
            _ = read_pump(stream, &session, &user_id, &color, PONG_WAIT) => false,
            _ = &mut write_task => true,
        };

        session.unregister(id).await;

        // The session closed our mailbox, so the writer sends a close frame and stops
        if !write_finished {
            if let Err(e) = write_task.await {
                error!("Write pump for {} panicked: {}", user_id, e);
            }
        }
        info!("Connection {} for {} in session {} closed", id, user_id, session.code());
    }
}

/// Forward decoded frames to the session until the socket errors, closes or
/// stays silent past `pong_wait`.
pub async fn read_pump<S, E>(mut stream: S, session: &Session, user_id: &str, color: &str, pong_wait: Duration)
where
    S: Stream<Item = Result<WsMessage, E>> + Unpin,
    E: std::fmt::Display,
{
    loop {
        // Any frame, pongs included, pushes the deadline out
        let frame = match timeout(pong_wait, stream.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                warn!("Read error for {}: {}", user_id, e);
                return;
            }
            Ok(None) => return,
            Err(_) => {
                warn!("No frames from {} within {:?}, dropping connection", user_id, pong_wait);
                return;
            }
        };

        let text = match frame {
            WsMessage::Text(text) => text,
            WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => continue,
            },
            WsMessage::Close(_) => return,
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
        };

        let mut msg: Message = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Discarding malformed frame from {}: {}", user_id, e);
                continue;
            }
        };

        msg.stamp(user_id, color);
        session.broadcast(msg).await;
    }
}

/// Drain the outbound mailbox to the socket, pinging every `ping_period`.
/// Returns once the mailbox closes or a write fails.
pub async fn write_pump<W>(mut sink: W, mut outbound: mpsc::Receiver<Message>, ping_period: Duration)
where
    W: Sink<WsMessage> + Unpin,
    W::Error: std::fmt::Display,
{
    let mut ticker = interval_at(Instant::now() + ping_period, ping_period);

    loop {
        let frame = tokio::select! {
            msg = outbound.recv() => match msg {
                Some(msg) => match serde_json::to_string(&msg) {
                    Ok(text) => WsMessage::Text(text),
                    Err(e) => {
                        error!("Failed to encode {} message: {}", msg.msg_type, e);
                        continue;
                    }
                },
                None => {
                    let _ = timeout(WRITE_WAIT, sink.send(WsMessage::Close(None))).await;
                    return;
                }
            },
            _ = ticker.tick() => WsMessage::Ping(Vec::new()),
        };

        match timeout(WRITE_WAIT, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Write failed: {}", e);
                return;
            }
            Err(_) => {
                warn!("Write timed out after {:?}", WRITE_WAIT);
                return;
            }
        }
    }
}
