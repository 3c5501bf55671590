use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::model::Theme;

/// Render the help overlay.
/// Displayed as centered popup when show_help is true.
pub fn render_help_overlay(frame: &mut Frame) {
    let popup_area = centered_rect(60, 70, frame.area());

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text())
        .block(
            Block::default()
                .title(" Help - press any key to close ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Theme::ACTIVE_BORDER)),
        )
        .alignment(Alignment::Left)
        .style(Style::default().bg(Theme::HEADER_BG).fg(Theme::TEXT));

    frame.render_widget(paragraph, popup_area);
}

fn section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        title,
        Style::default().fg(Theme::INFO).add_modifier(Modifier::BOLD),
    ))
}

/// Build help text with keybindings grouped by category.
fn build_help_text() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        section("SCROLLING"),
        Line::from("  j / k       - Scroll down / up"),
        Line::from("  Ctrl+d / u  - Page down / up"),
        Line::from("  g           - Jump to first line"),
        Line::from("  G / Space   - Follow live output"),
        Line::from(""),
        section("TASK"),
        Line::from("  c           - Cancel (pending or running)"),
        Line::from("  d           - Delete (finished tasks)"),
        Line::from("  w           - Save output to task-<id>-output.txt"),
        Line::from(""),
        section("GENERAL"),
        Line::from("  ?           - Toggle help overlay"),
        Line::from("  q / Esc     - Quit"),
    ]
}

/// Helper to create centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(area);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(vertical[1])[1]
}
