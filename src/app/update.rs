use crate::app::{handle_key, AppState, Request};
use crate::event::AppEvent;
use crate::model::{Task, TaskAction};
use crate::stream::OutputLog;

/// Pure update function following Elm Architecture.
/// Takes current state and event, returns new state.
/// No I/O: side effects are queued in `state.requests` for the event loop.
pub fn update(mut state: AppState, event: AppEvent) -> AppState {
    match event {
        AppEvent::TaskLoaded(task) => task_loaded(state, task),

        AppEvent::TaskFetchFailed(error) => {
            state.push_error(format!("refresh failed: {error}"));
            state
        }

        AppEvent::SessionOpened {
            log,
            snapshot_error,
            connected,
        } => {
            state.live = true;
            state.opening_session = false;
            state.connected = connected;
            state.log = log;
            state.scroll_back = 0;
            if let Some(error) = snapshot_error {
                state.push_error(format!(
                    "output history unavailable ({error}); showing live output only"
                ));
            }
            state
        }

        AppEvent::SessionClosed => {
            state.live = false;
            state.opening_session = false;
            state.connected = false;
            state
        }

        AppEvent::ConnectionChanged(connected) => {
            if state.live {
                state.connected = connected;
            }
            state
        }

        AppEvent::StreamError(message) => {
            state.push_error(format!("stream: {message}"));
            state
        }

        AppEvent::ActionFinished { action, result } => {
            state.in_flight = None;
            match (action, result) {
                (TaskAction::Cancel, Ok(message)) => {
                    // Status stays as reported until the service says otherwise
                    state.cancel_requested = true;
                    state.push_notice(message);
                }
                (TaskAction::Delete, Ok(_)) => {
                    state.deleted = true;
                    state.should_quit = true;
                }
                (TaskAction::ViewLive, Ok(_)) => {}
                (action, Err(error)) => {
                    state.push_error(format!("{} failed: {error}", action.as_str()));
                }
            }
            state
        }

        AppEvent::LogExported(result) => {
            match result {
                Ok(path) => state.push_notice(format!("output saved to {}", path.display())),
                Err(error) => state.push_error(format!("export failed: {error}")),
            }
            state
        }

        AppEvent::Key(key) => {
            // Delegate to navigation handler
            handle_key(state, key)
        }

        AppEvent::Tick => state,
    }
}

fn task_loaded(mut state: AppState, task: Task) -> AppState {
    if let Some(previous) = &state.task {
        // Polls can land out of order; a finished task never moves again
        if !previous.status.can_transition_to(task.status) {
            state.push_error(format!(
                "unexpected status change {} -> {}",
                previous.status, task.status
            ));
            return state;
        }
    }

    if task.status.is_terminal() {
        state.cancel_requested = false;
    }

    let streamable = task.allows(TaskAction::ViewLive);
    let streaming = state.live || state.opening_session;
    if streamable && !streaming {
        state.opening_session = true;
        state.requests.push(Request::OpenSession);
    } else if !streamable && streaming {
        state.opening_session = false;
        state.requests.push(Request::CloseSession);
    } else if !streamable
        && !task.output_log.is_empty()
        && task.output_log.len() >= state.log.len()
    {
        // Stored output is authoritative once nothing is streaming
        state.log = OutputLog::frozen(task.output_log.clone());
    }

    state.task = Some(task);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::model::{TaskId, TaskStatus};

    fn running() -> Task {
        Task::new("t1", "r1", "feature/x", TaskStatus::Running)
    }

    fn state() -> AppState {
        AppState::new(TaskId::new("t1"))
    }

    #[test]
    fn test_running_task_requests_session_once() {
        let state = update(state(), AppEvent::TaskLoaded(running()));
        assert_eq!(state.requests, vec![Request::OpenSession]);
        assert!(state.opening_session);

        let mut state = state;
        state.requests.clear();
        let state = update(state, AppEvent::TaskLoaded(running()));
        assert!(state.requests.is_empty());
    }

    #[test]
    fn test_pending_task_gets_no_session() {
        let task = Task::new("t1", "r1", "b", TaskStatus::Pending);
        let state = update(state(), AppEvent::TaskLoaded(task));
        assert!(state.requests.is_empty());
        assert!(!state.opening_session);
    }

    #[test]
    fn test_leaving_running_closes_session() {
        let mut state = update(state(), AppEvent::TaskLoaded(running()));
        state.requests.clear();
        let state = update(
            state,
            AppEvent::SessionOpened {
                log: OutputLog::from_snapshot("A\n"),
                snapshot_error: None,
                connected: true,
            },
        );
        assert!(state.live);

        let done = Task::new("t1", "r1", "feature/x", TaskStatus::Completed);
        let state = update(state, AppEvent::TaskLoaded(done));
        assert_eq!(state.requests, vec![Request::CloseSession]);
    }

    #[test]
    fn test_terminal_task_shows_stored_output() {
        let task = Task::new("t1", "r1", "b", TaskStatus::Failed).with_output("boom\n");
        let state = update(state(), AppEvent::TaskLoaded(task));
        assert_eq!(state.log.text(), "boom\n");
        assert!(state.log.is_frozen());
    }

    #[test]
    fn test_snapshot_error_is_reported_but_session_is_live() {
        let state = update(
            state(),
            AppEvent::SessionOpened {
                log: OutputLog::default(),
                snapshot_error: Some(ApiError::new("boom").with_status(500)),
                connected: false,
            },
        );
        assert!(state.live);
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].contains("boom"));
    }

    #[test]
    fn test_cancel_success_does_not_change_status() {
        let mut state = update(state(), AppEvent::TaskLoaded(running()));
        state.in_flight = Some(TaskAction::Cancel);
        let state = update(
            state,
            AppEvent::ActionFinished {
                action: TaskAction::Cancel,
                result: Ok("Task cancelled successfully".into()),
            },
        );

        assert!(state.cancel_requested);
        assert!(state.in_flight.is_none());
        assert_eq!(state.task.as_ref().map(|t| t.status), Some(TaskStatus::Running));
        assert_eq!(
            state.notices.back().map(String::as_str),
            Some("Task cancelled successfully")
        );
    }

    #[test]
    fn test_cancel_failure_surfaces_detail() {
        let state = update(
            state(),
            AppEvent::ActionFinished {
                action: TaskAction::Cancel,
                result: Err(ApiError::new("Cannot cancel task in completed status").with_status(400)),
            },
        );
        assert!(!state.cancel_requested);
        assert!(state.errors[0].contains("Cannot cancel task in completed status"));
    }

    #[test]
    fn test_delete_success_quits() {
        let state = update(
            state(),
            AppEvent::ActionFinished {
                action: TaskAction::Delete,
                result: Ok(String::new()),
            },
        );
        assert!(state.deleted);
        assert!(state.should_quit);
    }

    #[test]
    fn test_connection_change_ignored_without_session() {
        let state = update(state(), AppEvent::ConnectionChanged(true));
        assert!(!state.connected);
    }

    #[test]
    fn test_illegal_transition_is_flagged() {
        let done = Task::new("t1", "r1", "b", TaskStatus::Completed);
        let state = update(state(), AppEvent::TaskLoaded(done));
        let mut state = update(state, AppEvent::TaskLoaded(running()));
        assert!(state.errors.iter().any(|e| e.contains("completed -> running")));
        assert_eq!(state.task.as_ref().unwrap().status, TaskStatus::Completed);
        assert!(state.take_requests().is_empty());
    }
}
