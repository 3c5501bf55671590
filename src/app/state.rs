use std::collections::VecDeque;
use std::time::Instant;

use crate::model::{Task, TaskAction, TaskId};
use crate::stream::OutputLog;

/// Maximum retained error/notice messages.
pub const MAX_MESSAGES: usize = 100;

/// Main application state for the task viewer.
/// Updated via pure `update(state, event) -> state` function.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Task being observed
    pub task_id: TaskId,

    /// Latest copy from the service (None until first fetch lands)
    pub task: Option<Task>,

    /// Output currently on screen: live session log, or the task's stored output
    pub log: OutputLog,

    /// A live session is open
    pub live: bool,

    /// An open request for a live session is outstanding
    pub opening_session: bool,

    /// Live socket is currently open
    pub connected: bool,

    /// Service accepted a cancel; status has not caught up yet
    pub cancel_requested: bool,

    /// Action whose REST call is in flight
    pub in_flight: Option<TaskAction>,

    /// Side effects for the event loop to perform, in order
    pub requests: Vec<Request>,

    /// Lines scrolled up from the bottom of the log; 0 follows live output
    pub scroll_back: usize,

    /// Show help overlay
    pub show_help: bool,

    /// Error message ring buffer (for status bar display)
    pub errors: VecDeque<String>,

    /// Informational messages (cancel accepted, log saved)
    pub notices: VecDeque<String>,

    /// Task was deleted; viewer exits
    pub deleted: bool,

    /// Application start time (for elapsed time display)
    pub started_at: Instant,

    /// Signal to quit the application
    pub should_quit: bool,
}

/// Side effect requested by `update`, executed by the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    OpenSession,
    CloseSession,
    Cancel,
    Delete,
    ExportLog,
}

impl AppState {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            task: None,
            log: OutputLog::default(),
            live: false,
            opening_session: false,
            connected: false,
            cancel_requested: false,
            in_flight: None,
            requests: Vec::new(),
            scroll_back: 0,
            show_help: false,
            errors: VecDeque::with_capacity(MAX_MESSAGES),
            notices: VecDeque::with_capacity(MAX_MESSAGES),
            deleted: false,
            started_at: Instant::now(),
            should_quit: false,
        }
    }

    /// Whether `action` is currently offered for the observed task.
    /// Nothing is offered before the task is known.
    pub fn allows(&self, action: TaskAction) -> bool {
        self.task.as_ref().is_some_and(|t| t.allows(action))
    }

    /// Actions shown in the footer.
    pub fn enabled_actions(&self) -> Vec<TaskAction> {
        self.task
            .as_ref()
            .map(|t| t.status.enabled_actions())
            .unwrap_or_default()
    }

    pub fn is_following(&self) -> bool {
        self.scroll_back == 0
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        push_capped(&mut self.errors, message.into());
    }

    pub fn push_notice(&mut self, message: impl Into<String>) {
        push_capped(&mut self.notices, message.into());
    }

    /// Hand the queued side effects to the caller.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }
}

fn push_capped(buffer: &mut VecDeque<String>, message: String) {
    if buffer.len() >= MAX_MESSAGES {
        buffer.pop_front();
    }
    buffer.push_back(message);
}
