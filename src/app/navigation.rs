use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{AppState, Request};
use crate::model::TaskAction;

/// Half-page jump size for Ctrl+D / Ctrl+U
const PAGE_JUMP: usize = 20;

/// Pure navigation state transition function.
/// Takes current state + keyboard event, returns new state.
/// No I/O, no side effects, fully unit testable.
pub fn handle_key(mut state: AppState, key: KeyEvent) -> AppState {
    // Help overlay has priority
    if state.show_help {
        state.show_help = false;
        return state;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.should_quit = true;
            state
        }
        KeyCode::Char('q') | KeyCode::Esc => {
            state.should_quit = true;
            state
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            scroll_down_by(state, PAGE_JUMP)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            scroll_up_by(state, PAGE_JUMP)
        }
        KeyCode::Char('c') => request_action(state, TaskAction::Cancel),
        KeyCode::Char('d') => request_action(state, TaskAction::Delete),
        KeyCode::PageDown => scroll_down_by(state, PAGE_JUMP),
        KeyCode::PageUp => scroll_up_by(state, PAGE_JUMP),
        KeyCode::Char('j') | KeyCode::Down => scroll_down_by(state, 1),
        KeyCode::Char('k') | KeyCode::Up => scroll_up_by(state, 1),
        KeyCode::Char('g') | KeyCode::Home => scroll_up_by(state, usize::MAX),
        KeyCode::Char('G') | KeyCode::End | KeyCode::Char(' ') => {
            state.scroll_back = 0;
            state
        }
        KeyCode::Char('w') => {
            state.requests.push(Request::ExportLog);
            state
        }
        KeyCode::Char('?') => {
            state.show_help = true;
            state
        }
        _ => state,
    }
}

/// Queue a lifecycle action if the current status offers it.
/// Refusals are reported in the status bar instead of reaching the service.
fn request_action(mut state: AppState, action: TaskAction) -> AppState {
    let Some(status) = state.task.as_ref().map(|t| t.status) else {
        state.push_error("task not loaded yet");
        return state;
    };
    if let Err(error) = action.check(status) {
        state.push_error(error.to_string());
        return state;
    }
    if let Some(pending) = state.in_flight {
        state.push_error(format!("{} already in progress", pending.as_str()));
        return state;
    }

    let request = match action {
        TaskAction::Cancel => Request::Cancel,
        TaskAction::Delete => Request::Delete,
        TaskAction::ViewLive => return state,
    };
    state.in_flight = Some(action);
    state.requests.push(request);
    state
}

/// Move towards the live tail.
fn scroll_down_by(mut state: AppState, lines: usize) -> AppState {
    state.scroll_back = state.scroll_back.saturating_sub(lines);
    state
}

/// Move back through history, stopping at the first line.
fn scroll_up_by(mut state: AppState, lines: usize) -> AppState {
    let max = state.log.line_count().saturating_sub(1);
    state.scroll_back = state.scroll_back.saturating_add(lines).min(max);
    state
}
