//! In-process [`Connector`] used by the integration tests.
//!
//! Each `open` hands the client a [`Socket`] and keeps the far end as a
//! [`ServerSocket`] that can push frames, fail, or hang up.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use super::transport::{Connector, Socket};
use crate::error::TransportError;
use crate::model::StreamMessage;

type Inbound = mpsc::UnboundedSender<Result<String, TransportError>>;

struct ServerInner {
    inbound: Mutex<Option<Inbound>>,
    outbound: Mutex<mpsc::UnboundedReceiver<String>>,
    received: Mutex<Vec<String>>,
}

/// Server end of one in-memory socket.
#[derive(Clone)]
pub struct ServerSocket {
    inner: Arc<ServerInner>,
}

impl ServerSocket {
    /// Push a raw text frame. Returns false once the client has gone away.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        match self.inner.inbound.lock().as_ref() {
            Some(tx) => tx.send(Ok(text.into())).is_ok(),
            None => false,
        }
    }

    pub fn send_message(&self, message: &StreamMessage) -> bool {
        self.send_text(message.to_frame())
    }

    /// Fail the socket with a transport error; the client sees the stream end.
    pub fn fail(&self, reason: &str) {
        if let Some(tx) = self.inner.inbound.lock().take() {
            let _ = tx.send(Err(TransportError::Socket(reason.to_string())));
        }
    }

    /// Hang up without an error.
    pub fn hang_up(&self) {
        self.inner.inbound.lock().take();
    }

    /// Frames the client has sent so far.
    pub fn received(&self) -> Vec<String> {
        let mut outbound = self.inner.outbound.lock();
        let mut received = self.inner.received.lock();
        while let Ok(frame) = outbound.try_recv() {
            received.push(frame);
        }
        received.clone()
    }

    /// Whether the client dropped its sending half.
    pub fn closed_by_client(&self) -> bool {
        self.inner.outbound.lock().is_closed()
    }
}

#[derive(Default)]
struct ConnectorState {
    urls: Vec<String>,
    sockets: Vec<ServerSocket>,
    refusals: VecDeque<String>,
}

/// Records every open attempt and keeps the server ends in order.
#[derive(Clone)]
pub struct MemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
    opened: watch::Sender<usize>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        let (opened, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(ConnectorState::default())),
            opened,
        }
    }

    /// Make the next open attempt fail with `reason`.
    pub fn refuse_next(&self, reason: &str) {
        self.state.lock().refusals.push_back(reason.to_string());
    }

    /// URLs of every attempt, refused ones included.
    pub fn urls(&self) -> Vec<String> {
        self.state.lock().urls.clone()
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().urls.len()
    }

    /// Number of sockets actually opened.
    pub fn opened(&self) -> usize {
        self.state.lock().sockets.len()
    }

    /// Wait until the `index`-th socket (zero-based) has been opened.
    pub async fn socket(&self, index: usize) -> ServerSocket {
        let mut rx = self.opened.subscribe();
        // Sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|count| *count > index).await;
        self.state.lock().sockets[index].clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, url: &str) -> Result<Socket, TransportError> {
        let mut state = self.state.lock();
        state.urls.push(url.to_string());
        if let Some(reason) = state.refusals.pop_front() {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason,
            });
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        state.sockets.push(ServerSocket {
            inner: Arc::new(ServerInner {
                inbound: Mutex::new(Some(inbound_tx)),
                outbound: Mutex::new(outbound_rx),
                received: Mutex::new(Vec::new()),
            }),
        });
        let count = state.sockets.len();
        drop(state);
        self.opened.send_replace(count);

        let inbound = futures::stream::unfold(inbound_rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        })
        .boxed();

        Ok(Socket {
            outbound: outbound_tx,
            inbound,
        })
    }
}

/// Yield enough times for spawned connection tasks to run to their next
/// suspension point on a current-thread runtime.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
