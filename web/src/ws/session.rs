//! Lifecycle of one upgraded WebSocket, from admission to cleanup.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use events::InboundMessage;
use futures::{Sink, SinkExt, StreamExt};
use log::*;
use realtime::admission::{Admission, POLICY_VIOLATION};
use realtime::connection::{ConnectionId, Outbound};
use realtime::Manager;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Run a WebSocket session for a connecting client.
///
/// 1. Admits the connection, or closes it with a policy violation
/// 2. Writes frames queued by the manager (events, probes, close) to the socket
/// 3. Records pongs and subscribe notices from the client
/// 4. Unregisters the connection when either side closes
///
/// A write that does not complete within `write_timeout` ends the session.
pub(crate) async fn run(
    mut socket: WebSocket,
    manager: Arc<Manager>,
    credential: Option<String>,
    write_timeout: Duration,
) {
    let Admission {
        connection_id,
        identity,
        mut receiver,
    } = match manager.admit(credential.as_deref()) {
        Ok(admission) => admission,
        Err(e) => {
            info!("Rejecting WebSocket connection: {e}");
            let close = Message::Close(Some(CloseFrame {
                code: POLICY_VIOLATION,
                reason: e.close_reason().to_string().into(),
            }));
            if let Err(e) = write_frame(&mut socket, close, write_timeout).await {
                debug!("Failed to send close frame to rejected client: {e}");
            }
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            frame = receiver.recv() => {
                // The registry dropped the connection without a close frame
                let Some(frame) = frame else { break };

                let closing = matches!(frame, Outbound::Close { .. });
                if let Err(e) = write_frame(&mut ws_tx, into_ws_message(frame), write_timeout).await {
                    debug!("WebSocket send to connection {connection_id} failed: {e}");
                    break;
                }
                if closing {
                    break;
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_text(&manager, &connection_id, text.as_str());
                    }
                    Some(Ok(Message::Pong(_))) => {
                        manager.confirm_alive(&connection_id);
                    }
                    // Pings are answered by the protocol layer
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Binary(data))) => {
                        debug!(
                            "Ignoring {} byte binary frame from connection {connection_id}",
                            data.len()
                        );
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("WebSocket read from connection {connection_id} failed: {e}");
                        break;
                    }
                }
            }
        }
    }

    manager.unregister(&connection_id);
    info!(
        "WebSocket connection {connection_id} closed for user {}",
        identity.subject_id
    );
}

#[derive(Debug)]
enum WriteError<E> {
    TimedOut(Duration),
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for WriteError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WriteError::TimedOut(limit) => write!(f, "write timed out after {limit:?}"),
            WriteError::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// Sends one frame, giving up once `limit` elapses. A peer that stops reading
/// fills its TCP window and would otherwise block the session forever.
async fn write_frame<S>(
    sink: &mut S,
    message: Message,
    limit: Duration,
) -> Result<(), WriteError<S::Error>>
where
    S: Sink<Message> + Unpin,
{
    match timeout(limit, sink.send(message)).await {
        Ok(result) => result.map_err(WriteError::Failed),
        Err(_) => Err(WriteError::TimedOut(limit)),
    }
}

fn into_ws_message(frame: Outbound) -> Message {
    match frame {
        Outbound::Text(text) => Message::Text(text.to_string().into()),
        Outbound::Ping => Message::Ping(Default::default()),
        Outbound::Close { code, reason } => Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })),
    }
}

fn handle_text(manager: &Manager, connection_id: &ConnectionId, text: &str) {
    match InboundMessage::parse(text) {
        Ok(InboundMessage::Subscribe { resource }) => {
            manager.record_subscription(connection_id, &resource);
        }
        Err(e) => {
            warn!("Ignoring malformed message from connection {connection_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_frames_map_to_websocket_messages() {
        let text = into_ws_message(Outbound::Text(Arc::from("{\"type\":\"connected\"}")));
        assert!(matches!(text, Message::Text(ref t) if t.as_str() == "{\"type\":\"connected\"}"));

        assert!(matches!(into_ws_message(Outbound::Ping), Message::Ping(ref p) if p.is_empty()));

        let close = into_ws_message(Outbound::Close {
            code: 1001,
            reason: "bye".to_string(),
        });
        match close {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.code, 1001);
                assert_eq!(frame.reason.as_str(), "bye");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    /// Accepts nothing, like a peer whose receive window is full.
    struct StalledSink;

    impl Sink<Message> for StalledSink {
        type Error = std::convert::Infallible;

        fn poll_ready(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::task::Poll::Pending
        }

        fn start_send(self: std::pin::Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::task::Poll::Pending
        }

        fn poll_close(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::task::Poll::Pending
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_times_out() {
        let limit = Duration::from_secs(30);
        let result = write_frame(&mut StalledSink, Message::Ping(Default::default()), limit).await;

        assert!(matches!(result, Err(WriteError::TimedOut(elapsed)) if elapsed == limit));
    }

    #[tokio::test]
    async fn test_write_to_ready_sink_succeeds() {
        let (mut tx, mut rx) = futures::channel::mpsc::unbounded::<Message>();

        write_frame(&mut tx, Message::Ping(Default::default()), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(matches!(rx.try_next(), Ok(Some(Message::Ping(_)))));
    }
}
