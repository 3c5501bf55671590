use ratatui::Frame;

use crate::app::AppState;

pub mod components;
pub mod task_detail;

pub use task_detail::render_task_detail;

/// Main view entry point.
/// Draws the task detail view, with the help overlay on top if active.
pub fn render(state: &AppState, frame: &mut Frame) {
    task_detail::render_task_detail(frame, state, frame.area());

    if state.show_help {
        components::help_overlay::render_help_overlay(frame);
    }
}
