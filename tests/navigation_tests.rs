use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use devbud_tui::app::{handle_key, AppState, Request};
use devbud_tui::model::{Task, TaskId, TaskStatus};
use devbud_tui::stream::OutputLog;

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

/// Running task with a log of `lines` lines.
fn state_with_lines(lines: usize) -> AppState {
    let mut state = AppState::new(TaskId::new("t1"));
    state.task = Some(Task::new("t1", "r1", "main", TaskStatus::Running));
    let text: String = (0..lines).map(|i| format!("line {i}\n")).collect();
    state.log = OutputLog::from_snapshot(text);
    state
}

// ============================================================================
// Scrolling
// ============================================================================

#[test]
fn starts_following_tail() {
    assert!(state_with_lines(50).is_following());
}

#[test]
fn k_scrolls_back_and_j_returns() {
    let mut state = state_with_lines(50);
    state = handle_key(state, press(KeyCode::Char('k')));
    state = handle_key(state, press(KeyCode::Up));
    assert_eq!(state.scroll_back, 2);

    state = handle_key(state, press(KeyCode::Char('j')));
    assert_eq!(state.scroll_back, 1);
    state = handle_key(state, press(KeyCode::Down));
    state = handle_key(state, press(KeyCode::Down));
    assert_eq!(state.scroll_back, 0);
}

#[test]
fn ctrl_u_and_ctrl_d_page() {
    let mut state = state_with_lines(100);
    state = handle_key(state, ctrl('u'));
    assert_eq!(state.scroll_back, 20);
    state = handle_key(state, press(KeyCode::PageUp));
    assert_eq!(state.scroll_back, 40);

    state = handle_key(state, ctrl('d'));
    assert_eq!(state.scroll_back, 20);
    state = handle_key(state, press(KeyCode::PageDown));
    assert_eq!(state.scroll_back, 0);
}

#[test]
fn scrolling_back_stops_at_first_line() {
    let mut state = state_with_lines(5);
    for _ in 0..10 {
        state = handle_key(state, press(KeyCode::Char('k')));
    }
    assert_eq!(state.scroll_back, 4);

    let state = handle_key(state_with_lines(30), press(KeyCode::Char('g')));
    assert_eq!(state.scroll_back, 29);
}

#[test]
fn empty_log_cannot_scroll() {
    let state = handle_key(state_with_lines(0), press(KeyCode::Home));
    assert_eq!(state.scroll_back, 0);
}

#[test]
fn tail_keys_resume_following() {
    for code in [KeyCode::Char('G'), KeyCode::End, KeyCode::Char(' ')] {
        let mut state = handle_key(state_with_lines(40), ctrl('u'));
        state = handle_key(state, press(code));
        assert!(state.is_following(), "{code:?}");
    }
}

// ============================================================================
// Actions & Overlay
// ============================================================================

#[test]
fn ctrl_d_pages_instead_of_deleting() {
    let mut state = state_with_lines(40);
    state.task = Some(Task::new("t1", "r1", "main", TaskStatus::Completed));
    state.scroll_back = 30;

    let state = handle_key(state, ctrl('d'));

    assert_eq!(state.scroll_back, 10);
    assert!(state.requests.is_empty());
}

#[test]
fn actions_refused_before_task_loads() {
    let state = handle_key(AppState::new(TaskId::new("t1")), press(KeyCode::Char('c')));
    assert!(state.requests.is_empty());
    assert_eq!(state.errors.back().unwrap(), "task not loaded yet");
}

#[test]
fn w_queues_export() {
    let state = handle_key(state_with_lines(3), press(KeyCode::Char('w')));
    assert_eq!(state.requests, vec![Request::ExportLog]);
}

#[test]
fn help_overlay_swallows_next_key() {
    let mut state = handle_key(state_with_lines(3), press(KeyCode::Char('?')));
    assert!(state.show_help);

    state = handle_key(state, press(KeyCode::Char('q')));
    assert!(!state.show_help);
    assert!(!state.should_quit);

    state = handle_key(state, press(KeyCode::Esc));
    assert!(state.should_quit);
}

#[test]
fn unknown_key_is_ignored() {
    let before = state_with_lines(3);
    let after = handle_key(before.clone(), press(KeyCode::Char('z')));

    assert_eq!(after.scroll_back, before.scroll_back);
    assert!(after.requests.is_empty());
    assert!(after.errors.is_empty());
    assert!(!after.should_quit);
}
