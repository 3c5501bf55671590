use std::path::PathBuf;

use crossterm::event::KeyEvent;

use crate::error::ApiError;
use crate::model::{Task, TaskAction};
use crate::stream::OutputLog;

/// All events that can occur in the viewer.
/// Sourced from the keyboard, timers, REST polling and the live stream.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Fresh copy of the observed task from the service
    TaskLoaded(Task),

    /// Polling the task failed (non-fatal)
    TaskFetchFailed(ApiError),

    /// Live session is up; `log` is its merged snapshot + live output
    SessionOpened {
        log: OutputLog,
        snapshot_error: Option<ApiError>,
        connected: bool,
    },

    /// Live session ended (task left running, or the viewer closed it)
    SessionClosed,

    /// Stream socket opened (`true`) or dropped (`false`)
    ConnectionChanged(bool),

    /// Server `error` frame or transport failure on the live stream
    StreamError(String),

    /// Cancel or delete request completed
    ActionFinished {
        action: TaskAction,
        result: Result<String, ApiError>,
    },

    /// Output export finished
    LogExported(Result<PathBuf, String>),

    /// Keyboard input event
    Key(KeyEvent),

    /// Timer tick (for elapsed time updates)
    Tick,
}
