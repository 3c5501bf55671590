use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use super::keepalive;
use super::router::{MessageRouter, StreamEvent, Topic};
use crate::error::TransportError;
use crate::model::StreamMessage;

/// Inbound half of an open socket: text frames until the peer goes away.
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// An established socket as seen by [`Connection`].
///
/// Dropping `outbound` closes the socket from the client side.
pub struct Socket {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: FrameStream,
}

/// Opens sockets. Production uses [`WsConnector`]; tests swap in
/// [`super::memory::MemoryConnector`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &str) -> Result<Socket, TransportError>;
}

/// WebSocket connector over tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<Socket, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let (mut sink, stream) = ws.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::text(text)).await {
                    debug!(error = %e, "socket writer stopped");
                    return;
                }
            }
            // Every sender dropped: client-side close
            let _ = sink.close().await;
        });

        let inbound = stream
            .filter_map(|frame| async move {
                match frame {
                    Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => Some(Ok(text)),
                        Err(_) => {
                            debug!("dropping non-utf8 binary frame");
                            None
                        }
                    },
                    // Control frames are handled by tungstenite; Close ends the stream
                    Ok(_) => None,
                    Err(e) => Some(Err(TransportError::from(e))),
                }
            })
            .boxed();

        Ok(Socket { outbound, inbound })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Shared {
    state: ConnectionState,
    url: Option<String>,
    /// Bumped on every connect and close; work tagged with an older epoch
    /// belongs to a superseded socket and must not touch anything.
    epoch: u64,
    intentional_close: bool,
    outbound: Option<mpsc::UnboundedSender<String>>,
    driver: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    attempts: u64,
}

impl Shared {
    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }

    fn drop_socket(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        self.outbound = None;
    }
}

struct Inner {
    connector: Arc<dyn Connector>,
    router: MessageRouter,
    reconnect_interval: Duration,
    shared: Mutex<Shared>,
}

/// One logical streaming connection with automatic reconnection.
///
/// After an unintentional close the connection retries the last URL every
/// `reconnect_interval`, forever, until [`Connection::close`] is called. At
/// most one socket and one pending reconnect exist at any time. Dropping the
/// connection closes it.
pub struct Connection {
    inner: Arc<Inner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.inner.shared.lock();
        f.debug_struct("Connection")
            .field("state", &shared.state)
            .field("url", &shared.url)
            .field("attempts", &shared.attempts)
            .finish()
    }
}

impl Connection {
    pub fn new(
        connector: Arc<dyn Connector>,
        router: MessageRouter,
        reconnect_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                router,
                reconnect_interval,
                shared: Mutex::new(Shared {
                    state: ConnectionState::Idle,
                    url: None,
                    epoch: 0,
                    intentional_close: false,
                    outbound: None,
                    driver: None,
                    reconnect_timer: None,
                    attempts: 0,
                }),
            }),
        }
    }

    /// Open a socket to `url`, replacing any socket that is already open.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, url: impl Into<String>) {
        self.inner.start(url.into());
    }

    /// Send a text frame. Fails with [`TransportError::NotConnected`] unless open.
    pub fn send(&self, payload: impl Into<String>) -> Result<(), TransportError> {
        self.inner.send(payload.into())
    }

    /// Close intentionally and stop reconnecting. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn url(&self) -> Option<String> {
        self.inner.shared.lock().url.clone()
    }

    /// Number of socket open attempts so far, reconnects included.
    pub fn attempts(&self) -> u64 {
        self.inner.shared.lock().attempts
    }

    pub fn router(&self) -> &MessageRouter {
        &self.inner.router
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl Inner {
    fn start(self: &Arc<Self>, url: String) {
        let mut shared = self.shared.lock();
        if shared.state == ConnectionState::Open {
            debug!(url = shared.url.as_deref().unwrap_or_default(), "replacing open socket");
        }
        shared.drop_socket();
        shared.cancel_reconnect();
        shared.intentional_close = false;
        shared.epoch += 1;
        shared.attempts += 1;
        shared.state = ConnectionState::Connecting;
        shared.url = Some(url.clone());

        let epoch = shared.epoch;
        let inner = Arc::clone(self);
        shared.driver = Some(tokio::spawn(async move { inner.drive(url, epoch).await }));
    }

    async fn drive(self: Arc<Self>, url: String, epoch: u64) {
        let socket = match self.connector.open(&url).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(%url, error = %e, "stream connect failed");
                self.finish(epoch, false, Some(e));
                return;
            }
        };

        let Socket {
            outbound,
            mut inbound,
        } = socket;
        {
            let mut shared = self.shared.lock();
            if shared.epoch != epoch {
                return;
            }
            shared.state = ConnectionState::Open;
            shared.outbound = Some(outbound);
            shared.cancel_reconnect();
        }
        info!(%url, "stream connected");
        self.router.emit(Topic::Connected, &StreamEvent::Connected);

        let mut failure = None;
        while let Some(frame) = inbound.next().await {
            if !self.is_current(epoch) {
                trace!("dropping frame from superseded socket");
                return;
            }
            match frame {
                Ok(text) => self.handle_frame(&text),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        info!(%url, "stream disconnected");
        self.finish(epoch, true, failure);
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.shared.lock().epoch == epoch
    }

    fn handle_frame(&self, text: &str) {
        let message = match StreamMessage::decode(text) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("ignoring frame of unknown kind");
                return;
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return;
            }
        };

        let answered = keepalive::intercept(&message, |ack| {
            if let Err(e) = self.send(ack.to_string()) {
                debug!(error = %e, "keepalive reply not sent");
            }
        });
        if !answered {
            self.router.dispatch(message);
        }
    }

    fn send(&self, payload: String) -> Result<(), TransportError> {
        let shared = self.shared.lock();
        match (&shared.state, &shared.outbound) {
            (ConnectionState::Open, Some(tx)) => {
                tx.send(payload).map_err(|_| TransportError::NotConnected)
            }
            _ => {
                warn!("stream is not open; frame dropped");
                Err(TransportError::NotConnected)
            }
        }
    }

    /// Socket for `epoch` ended, by failure or by the peer.
    fn finish(self: &Arc<Self>, epoch: u64, was_open: bool, error: Option<TransportError>) {
        let reconnect = {
            let mut shared = self.shared.lock();
            if shared.epoch != epoch {
                return;
            }
            shared.state = ConnectionState::Closed;
            shared.outbound = None;
            // This task is the driver; dropping its handle just detaches it
            shared.driver = None;
            !shared.intentional_close
        };

        if let Some(e) = error {
            self.router
                .emit(Topic::Error, &StreamEvent::TransportError(e.to_string()));
        }
        if was_open {
            self.router.emit(Topic::Disconnected, &StreamEvent::Disconnected);
        }
        if reconnect {
            self.schedule_reconnect(epoch);
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, epoch: u64) {
        let mut shared = self.shared.lock();
        if shared.epoch != epoch || shared.intentional_close {
            return;
        }
        shared.cancel_reconnect();

        let delay = self.reconnect_interval;
        debug!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        let inner = Arc::clone(self);
        shared.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.reconnect(epoch);
        }));
    }

    fn reconnect(self: &Arc<Self>, epoch: u64) {
        let url = {
            let mut shared = self.shared.lock();
            // Running inside the timer task; forget it without aborting
            shared.reconnect_timer = None;
            if shared.epoch != epoch || shared.intentional_close {
                return;
            }
            match shared.url.clone() {
                Some(url) => url,
                None => return,
            }
        };
        info!(%url, "attempting to reconnect");
        self.start(url);
    }

    fn close(&self) {
        let was_open = {
            let mut shared = self.shared.lock();
            shared.intentional_close = true;
            shared.epoch += 1;
            shared.cancel_reconnect();
            shared.drop_socket();
            let was_open = shared.state == ConnectionState::Open;
            if shared.state != ConnectionState::Idle {
                shared.state = ConnectionState::Closed;
            }
            was_open
        };

        if was_open {
            info!("stream closed");
            self.router.emit(Topic::Disconnected, &StreamEvent::Disconnected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::memory::{settle, MemoryConnector};

    const INTERVAL: Duration = Duration::from_millis(5_000);

    fn connection(connector: &MemoryConnector) -> Connection {
        Connection::new(Arc::new(connector.clone()), MessageRouter::new(), INTERVAL)
    }

    #[test]
    fn new_connection_is_idle() {
        let connector = MemoryConnector::new();
        let conn = connection(&connector);
        assert_eq!(conn.state(), ConnectionState::Idle);
        assert_eq!(conn.attempts(), 0);
        assert!(conn.url().is_none());
    }

    #[test]
    fn send_before_open_is_not_connected() {
        let connector = MemoryConnector::new();
        let conn = connection(&connector);
        assert_eq!(conn.send("hello"), Err(TransportError::NotConnected));
    }

    #[test]
    fn close_while_idle_stays_idle() {
        let connector = MemoryConnector::new();
        let conn = connection(&connector);
        conn.close();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn connect_opens_and_sends() {
        let connector = MemoryConnector::new();
        let conn = connection(&connector);

        conn.connect("ws://test/ws/task/t1");
        let server = connector.socket(0).await;
        settle().await;

        assert_eq!(conn.state(), ConnectionState::Open);
        conn.send("hello").unwrap();
        assert_eq!(server.received(), vec!["hello".to_string()]);
        assert_eq!(connector.urls(), vec!["ws://test/ws/task/t1".to_string()]);
    }

    #[tokio::test]
    async fn close_releases_socket() {
        let connector = MemoryConnector::new();
        let conn = connection(&connector);
        conn.connect("ws://test");
        let server = connector.socket(0).await;
        settle().await;

        conn.close();
        settle().await;

        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(server.closed_by_client());
        assert_eq!(conn.send("late"), Err(TransportError::NotConnected));
    }

    #[tokio::test]
    async fn dropping_connection_closes_socket() {
        let connector = MemoryConnector::new();
        let conn = connection(&connector);
        conn.connect("ws://test");
        let server = connector.socket(0).await;
        settle().await;

        drop(conn);
        settle().await;

        assert!(server.closed_by_client());
    }
}
