use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::AppState;
use crate::model::Theme;

/// Render the output log panel.
/// Follows the tail unless the user has scrolled back.
pub fn render_output_log(frame: &mut Frame, area: Rect, state: &AppState) {
    let lines = state.log.lines();
    // Borders take two rows
    let height = area.height.saturating_sub(2) as usize;

    let body: Vec<Line> = if lines.is_empty() {
        vec![Line::from(Span::styled(
            empty_message(state),
            Style::default().fg(Theme::MUTED_TEXT),
        ))]
    } else {
        let (start, end) = visible_window(lines.len(), height, state.scroll_back);
        lines[start..end]
            .iter()
            .map(|l| Line::from(Span::styled(l.clone(), Style::default().fg(Theme::LOG_TEXT))))
            .collect()
    };

    let border = if state.live {
        Theme::ACTIVE_BORDER
    } else {
        Theme::PANEL_BORDER
    };

    let paragraph = Paragraph::new(body).block(
        Block::default()
            .title(build_title(state, lines.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );

    frame.render_widget(paragraph, area);
}

fn empty_message(state: &AppState) -> &'static str {
    if state.live {
        "Waiting for output…"
    } else {
        "No output"
    }
}

/// Pure function: panel title with mode and scroll position.
pub(crate) fn build_title(state: &AppState, total: usize) -> String {
    let mode = if state.live { "live" } else { "final" };
    if state.is_following() {
        format!(" Output [{mode}] {total} lines ")
    } else {
        format!(" Output [{mode}] {total} lines, -{} ", state.scroll_back)
    }
}

/// Pure function: half-open range of lines to show.
/// `scroll_back` counts lines up from the bottom; the window never runs past
/// either end of the log.
pub(crate) fn visible_window(total: usize, height: usize, scroll_back: usize) -> (usize, usize) {
    if height == 0 || total == 0 {
        return (0, 0);
    }
    let max_back = total.saturating_sub(height);
    let end = total - scroll_back.min(max_back);
    let start = end.saturating_sub(height);
    (start, end)
}
