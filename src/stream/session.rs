use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::router::{MessageRouter, StreamEvent, Subscription, Topic};
use super::transport::{Connection, ConnectionState, Connector};
use crate::api::TaskApi;
use crate::config::Settings;
use crate::error::ApiError;
use crate::model::{StreamMessage, Task, TaskAction, TaskId, TaskStatus};

#[derive(Default)]
struct LogBuffer {
    text: String,
    snapshot_len: usize,
    chunks: usize,
    frozen: bool,
}

/// Shared, append-only view of a task's output.
///
/// Starts from the REST snapshot and grows with live chunks in arrival
/// order. Once frozen it never changes again; clones stay readable after the
/// owning session is gone.
#[derive(Clone, Default)]
pub struct OutputLog {
    buffer: Arc<Mutex<LogBuffer>>,
}

impl fmt::Debug for OutputLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.buffer.lock();
        f.debug_struct("OutputLog")
            .field("len", &buffer.text.len())
            .field("chunks", &buffer.chunks)
            .field("frozen", &buffer.frozen)
            .finish()
    }
}

impl OutputLog {
    pub fn from_snapshot(snapshot: impl Into<String>) -> Self {
        let text = snapshot.into();
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer {
                snapshot_len: text.len(),
                text,
                chunks: 0,
                frozen: false,
            })),
        }
    }

    /// A log that will never change, e.g. the final output of a finished task.
    pub fn frozen(text: impl Into<String>) -> Self {
        let log = Self::from_snapshot(text);
        log.freeze();
        log
    }

    /// Append a live chunk. Returns false, leaving the log untouched, once frozen.
    pub fn append(&self, chunk: &str) -> bool {
        let mut buffer = self.buffer.lock();
        if buffer.frozen {
            return false;
        }
        buffer.text.push_str(chunk);
        buffer.chunks += 1;
        true
    }

    pub fn freeze(&self) {
        self.buffer.lock().frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.buffer.lock().frozen
    }

    pub fn text(&self) -> String {
        self.buffer.lock().text.clone()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().text.is_empty()
    }

    /// Byte length of the initial snapshot prefix.
    pub fn snapshot_len(&self) -> usize {
        self.buffer.lock().snapshot_len
    }

    /// Live chunks appended after the snapshot.
    pub fn chunk_count(&self) -> usize {
        self.buffer.lock().chunks
    }

    pub fn lines(&self) -> Vec<String> {
        self.buffer.lock().text.lines().map(str::to_owned).collect()
    }

    pub fn line_count(&self) -> usize {
        self.buffer.lock().text.lines().count()
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.text())
    }
}

/// Everything a session needs from the outside world.
#[derive(Clone)]
pub struct SessionDeps {
    pub api: Arc<dyn TaskApi>,
    pub connector: Arc<dyn Connector>,
    pub settings: Settings,
}

/// Live output view of one running task: REST snapshot plus streamed chunks.
///
/// Closing (explicitly, on a terminal status, or on drop) unsubscribes every
/// handler, stops reconnection and freezes the log.
pub struct TaskStreamSession {
    task_id: TaskId,
    router: MessageRouter,
    connection: Connection,
    log: OutputLog,
    subscriptions: Vec<Subscription>,
    snapshot_error: Option<ApiError>,
    closed: bool,
}

impl fmt::Debug for TaskStreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStreamSession")
            .field("task_id", &self.task_id)
            .field("connection", &self.connection)
            .field("log", &self.log)
            .field("closed", &self.closed)
            .finish()
    }
}

impl TaskStreamSession {
    /// Open a session for `task`. Returns `None` unless the task is running.
    ///
    /// A failed snapshot fetch is not fatal: the session starts with an empty
    /// log and [`TaskStreamSession::snapshot_error`] reports why.
    pub async fn open(deps: &SessionDeps, task: &Task) -> Option<Self> {
        if !task.allows(TaskAction::ViewLive) {
            debug!(task_id = %task.id, status = %task.status, "task is not running; no live session");
            return None;
        }
        Some(Self::start(deps, task.id.clone()).await)
    }

    async fn start(deps: &SessionDeps, task_id: TaskId) -> Self {
        let (log, snapshot_error) = match deps.api.task_output(&task_id).await {
            Ok(snapshot) => (OutputLog::from_snapshot(snapshot.output), None),
            Err(e) => {
                warn!(%task_id, error = %e, "output snapshot unavailable; showing live output only");
                (OutputLog::default(), Some(e))
            }
        };

        let router = MessageRouter::new();
        let output = {
            let log = log.clone();
            let expected = task_id.clone();
            router.on(Topic::Output, move |event| {
                if let StreamEvent::Message(StreamMessage::Output {
                    task_id, output, ..
                }) = event
                {
                    if task_id.as_ref().is_some_and(|id| *id != expected) {
                        trace!(frame_task = ?task_id, "output for another task ignored");
                        return;
                    }
                    log.append(output);
                }
            })
        };

        let connection = Connection::new(
            Arc::clone(&deps.connector),
            router.clone(),
            deps.settings.reconnect_interval,
        );
        connection.connect(deps.settings.task_channel_url(&task_id));
        info!(%task_id, snapshot_bytes = log.len(), "task stream opened");

        Self {
            task_id,
            router,
            connection,
            log,
            subscriptions: vec![output],
            snapshot_error,
            closed: false,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Handle to the merged log. Stays valid after the session closes.
    pub fn log(&self) -> OutputLog {
        self.log.clone()
    }

    pub fn snapshot_error(&self) -> Option<&ApiError> {
        self.snapshot_error.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Listen to this session's stream, e.g. for connection indicators.
    /// Handlers are deregistered when the session closes.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.router.on(topic, handler)
    }

    /// Feed an authoritative status. Closes the session once the task is no
    /// longer running; returns whether that happened.
    pub fn apply_status(&mut self, status: TaskStatus) -> bool {
        if self.closed || status.allows(TaskAction::ViewLive) {
            return false;
        }
        debug!(task_id = %self.task_id, %status, "task left running; closing stream");
        self.close();
        true
    }

    /// Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Freeze first: a chunk already mid-dispatch must not land afterwards
        self.log.freeze();
        self.subscriptions.clear();
        self.router.clear();
        self.connection.close();
        info!(task_id = %self.task_id, log_bytes = self.log.len(), "task stream closed");
    }
}

impl Drop for TaskStreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// At most one live session per task.
pub struct SessionRegistry {
    deps: SessionDeps,
    sessions: HashMap<TaskId, TaskStreamSession>,
}

impl SessionRegistry {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            deps,
            sessions: HashMap::new(),
        }
    }

    /// Return the live session for `task`, opening one if needed.
    /// A task that is not running gets no session, and any stale one is closed.
    pub async fn open(&mut self, task: &Task) -> Option<&TaskStreamSession> {
        if !task.allows(TaskAction::ViewLive) {
            self.close(&task.id);
            return None;
        }

        let live = self
            .sessions
            .get(&task.id)
            .is_some_and(|session| !session.is_closed());
        if !live {
            self.sessions.remove(&task.id);
            let session = TaskStreamSession::open(&self.deps, task).await?;
            self.sessions.insert(task.id.clone(), session);
        }
        self.sessions.get(&task.id)
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&TaskStreamSession> {
        self.sessions.get(task_id)
    }

    /// Route a fresh status to the task's session, dropping it when it closes.
    pub fn apply_status(&mut self, task_id: &TaskId, status: TaskStatus) -> bool {
        let closed = self
            .sessions
            .get_mut(task_id)
            .is_some_and(|session| session.apply_status(status));
        if closed {
            self.sessions.remove(task_id);
        }
        closed
    }

    /// Close and forget the task's session, handing back its final log.
    pub fn close(&mut self, task_id: &TaskId) -> Option<OutputLog> {
        let mut session = self.sessions.remove(task_id)?;
        session.close();
        Some(session.log())
    }

    pub fn close_all(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.close();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
