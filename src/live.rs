//! Push channel client for live incidents
//!
//! One session per [`LiveClient::spawn`]: `Disconnected -> Connecting ->
//! Connected -> Disconnected`. A dropped connection is not retried; the owner
//! starts a new session if it wants one.

use crate::models::PushMessage;
use crate::view::LiveWriter;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What happened to one inbound text frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageDisposition {
    /// Incident added to the feed
    Accepted,
    /// Valid message that does not touch the feed
    Ignored,
    /// Unparseable frame, dropped
    Malformed,
}

/// Connection state machine and message filter for one session
#[derive(Debug)]
pub struct LiveFeed {
    writer: LiveWriter,
    state: ConnectionState,
}

impl LiveFeed {
    pub fn new(writer: LiveWriter) -> Self {
        Self {
            writer,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connecting(&mut self) {
        self.transition(ConnectionState::Connecting);
    }

    pub fn opened(&mut self) {
        self.transition(ConnectionState::Connected);
    }

    pub fn closed(&mut self) {
        self.transition(ConnectionState::Disconnected);
    }

    /// Handle one text frame
    pub fn receive(&mut self, text: &str) -> MessageDisposition {
        match PushMessage::parse(text) {
            Ok(PushMessage::Incident(incident)) => {
                debug!("Live incident for {}: {}", incident.service, incident.message);
                if self.writer.push_incident(incident) {
                    MessageDisposition::Accepted
                } else {
                    MessageDisposition::Ignored
                }
            }
            Ok(PushMessage::Heartbeat { timestamp }) => {
                debug!("Push channel heartbeat at {:?}", timestamp);
                MessageDisposition::Ignored
            }
            Ok(PushMessage::Other(kind)) => {
                debug!("Ignoring push message of type {:?}", kind);
                MessageDisposition::Ignored
            }
            Err(e) => {
                debug!("Discarding malformed push message: {}", e);
                MessageDisposition::Malformed
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!("Push channel {} -> {}", self.state, next);
        }
        self.state = next;
        self.writer.set_connection(next);
    }
}

/// Starts push channel sessions
#[derive(Debug, Clone)]
pub struct LiveClient {
    url: String,
    connect_timeout: Duration,
}

impl LiveClient {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }

    /// Open the channel in the background and feed incidents into `writer`
    pub fn spawn(&self, writer: LiveWriter) -> LiveHandle {
        let shutdown = Arc::new(Notify::new());
        let feed = LiveFeed::new(writer.clone());

        let task = tokio::spawn(run_session(
            self.clone(),
            feed,
            Arc::clone(&shutdown),
        ));

        LiveHandle {
            writer,
            shutdown,
            task,
        }
    }
}

async fn run_session(client: LiveClient, mut feed: LiveFeed, shutdown: Arc<Notify>) {
    feed.connecting();
    info!("Connecting to push channel {}", client.url);

    let connect = tokio::select! {
        result = timeout(client.connect_timeout, connect_async(client.url.as_str())) => result,
        _ = shutdown.notified() => {
            debug!("Push channel torn down before connecting");
            feed.closed();
            return;
        }
    };

    let mut socket = match connect {
        Ok(Ok((socket, _))) => socket,
        Ok(Err(e)) => {
            warn!("Failed to connect to push channel {}: {}", client.url, e);
            feed.closed();
            return;
        }
        Err(_) => {
            warn!("Timed out connecting to push channel {}", client.url);
            feed.closed();
            return;
        }
    };

    feed.opened();
    info!("Push channel connected");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                if let Err(e) = socket.close(None).await {
                    debug!("Error closing push channel: {}", e);
                }
                break;
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    feed.receive(&text);
                }
                Some(Ok(Message::Close(frame))) => {
                    // Keep reading so the close reply is flushed; the stream
                    // ends once the handshake completes.
                    debug!("Push channel closed by peer: {:?}", frame);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Push channel failed: {}", e);
                    break;
                }
                None => break,
            }
        }
    }

    feed.closed();
    info!("Push channel disconnected");
}

/// Owned handle to a live session; stopping or dropping it ends all writes
#[derive(Debug)]
pub struct LiveHandle {
    writer: LiveWriter,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl LiveHandle {
    pub fn is_running(&self) -> bool {
        self.writer.scope().is_open() && !self.task.is_finished()
    }

    /// Mark the channel disconnected, suppress further callbacks and ask the
    /// session to send a close frame. Does not wait for the close to finish.
    pub fn stop(&self) {
        if self.writer.scope().is_open() {
            self.writer.shut();
            info!("Stopped push channel client");
        }
        self.shutdown.notify_one();
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewModel;
    use futures::SinkExt;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn incident_frame(service: &str) -> String {
        json!({
            "type": "incident",
            "service": service,
            "severity": "critical",
            "message": format!("{} is experiencing issues", service),
            "timestamp": 1700000000.0
        })
        .to_string()
    }

    async fn wait_for(view: &mut ViewModel, done: impl Fn(&ViewModel) -> bool) {
        timeout(Duration::from_secs(5), async {
            while !done(view) {
                view.changed().await;
            }
        })
        .await
        .expect("view never reached the expected state");
    }

    #[test]
    fn test_feed_keeps_only_incidents_in_arrival_order() {
        let (view, producers) = ViewModel::new(10);
        let mut feed = LiveFeed::new(producers.live);

        assert_eq!(feed.receive(&incident_frame("A")), MessageDisposition::Accepted);
        assert_eq!(
            feed.receive(r#"{"type": "heartbeat", "timestamp": 1700000001.0}"#),
            MessageDisposition::Ignored
        );
        assert_eq!(feed.receive(r#"{"type": "heartbeat"}"#), MessageDisposition::Ignored);
        assert_eq!(feed.receive(&incident_frame("C")), MessageDisposition::Accepted);

        let services: Vec<String> = view.incidents().into_iter().map(|i| i.service).collect();
        assert_eq!(services, vec!["C", "A"]);
    }

    #[test]
    fn test_malformed_frames_change_nothing() {
        let (view, producers) = ViewModel::new(10);
        let mut feed = LiveFeed::new(producers.live);
        feed.opened();

        assert_eq!(feed.receive("{{{"), MessageDisposition::Malformed);
        assert_eq!(
            feed.receive(r#"{"type": "incident", "message": "no service"}"#),
            MessageDisposition::Malformed
        );

        assert!(view.incidents().is_empty());
        assert_eq!(view.connection(), ConnectionState::Connected);
    }

    #[test]
    fn test_feed_state_transitions() {
        let (view, producers) = ViewModel::new(10);
        let mut feed = LiveFeed::new(producers.live);
        assert_eq!(feed.state(), ConnectionState::Disconnected);

        feed.connecting();
        assert_eq!(view.connection(), ConnectionState::Connecting);
        assert!(!view.is_connected());

        feed.opened();
        assert!(view.is_connected());

        feed.closed();
        assert_eq!(view.connection(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_buffer_cap_through_feed() {
        let (view, producers) = ViewModel::new(10);
        let mut feed = LiveFeed::new(producers.live);

        for i in 0..11 {
            feed.receive(&incident_frame(&format!("svc-{}", i)));
        }

        let incidents = view.incidents();
        assert_eq!(incidents.len(), 10);
        assert_eq!(incidents[0].service, "svc-10");
        assert_eq!(incidents[9].service, "svc-1");
    }

    #[tokio::test]
    async fn test_session_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/alerts", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::text(incident_frame("payment-api"))).await.unwrap();
            ws.send(Message::text(r#"{"type": "heartbeat", "timestamp": 1.0}"#)).await.unwrap();
            ws.send(Message::text("definitely not json")).await.unwrap();
            ws.send(Message::text(incident_frame("database"))).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let (mut view, producers) = ViewModel::new(10);
        let handle = LiveClient::new(url, Duration::from_secs(2)).spawn(producers.live);

        wait_for(&mut view, |v| v.incidents().len() == 2).await;
        let services: Vec<String> = view.incidents().into_iter().map(|i| i.service).collect();
        assert_eq!(services, vec!["database", "payment-api"]);

        wait_for(&mut view, |v| v.connection() == ConnectionState::Disconnected).await;
        server.await.unwrap();
        assert_eq!(view.incidents().len(), 2);
        drop(handle);
    }

    #[tokio::test]
    async fn test_peer_close_is_acknowledged() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/alerts", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::text(incident_frame("user-service"))).await.unwrap();
            ws.close(None).await.unwrap();

            // A clean handshake delivers the client's close reply.
            while let Some(frame) = ws.next().await {
                match frame {
                    Ok(Message::Close(_)) => return true,
                    Ok(_) => {}
                    Err(_) => return false,
                }
            }
            false
        });

        let (mut view, producers) = ViewModel::new(10);
        let _handle = LiveClient::new(url, Duration::from_secs(2)).spawn(producers.live);

        let acknowledged = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        assert!(acknowledged);

        wait_for(&mut view, |v| v.connection() == ConnectionState::Disconnected).await;
        assert_eq!(view.incidents().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_closes_channel_and_suppresses_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/alerts", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            // Wait for the client's close frame; anything sent afterwards is lost.
            while let Some(frame) = ws.next().await {
                match frame {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            let _ = ws.send(Message::text(incident_frame("late"))).await;
        });

        let (mut view, producers) = ViewModel::new(10);
        let handle = LiveClient::new(url, Duration::from_secs(2)).spawn(producers.live);
        wait_for(&mut view, |v| v.is_connected()).await;

        handle.stop();
        assert_eq!(view.connection(), ConnectionState::Disconnected);

        timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        assert!(view.incidents().is_empty());
        assert!(!view.is_connected());
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_refused_connection_ends_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/alerts", listener.local_addr().unwrap());
        drop(listener);

        let (view, producers) = ViewModel::new(10);
        let handle = LiveClient::new(url, Duration::from_secs(2)).spawn(producers.live);

        timeout(Duration::from_secs(5), async {
            while !handle.task.is_finished() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("session never ended");

        assert_eq!(view.connection(), ConnectionState::Disconnected);
        assert!(view.incidents().is_empty());
    }
}
