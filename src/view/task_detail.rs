use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use crate::app::AppState;

use super::components::{render_details, render_footer, render_header, render_output_log};

/// Rows taken by the details panel, borders included.
const DETAILS_HEIGHT: u16 = 7;

/// Render the task detail view into the given area.
pub fn render_task_detail(frame: &mut Frame, state: &AppState, area: Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),              // Header
            Constraint::Length(DETAILS_HEIGHT), // Task details
            Constraint::Min(3),                 // Output log
            Constraint::Length(1),              // Footer
        ])
        .split(area);

    render_header(frame, layout[0], state);
    render_details(frame, layout[1], state);
    render_output_log(frame, layout[2], state);
    render_footer(frame, layout[3], state);
}
