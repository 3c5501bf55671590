use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::format::{format_duration, format_timestamp, run_time};
use crate::app::AppState;
use crate::model::{Task, Theme};

/// Render the task details panel: instructions, timestamps, worktree, error.
pub fn render_details(frame: &mut Frame, area: Rect, state: &AppState) {
    let lines = match &state.task {
        Some(task) => build_detail_lines(task),
        None => vec![Line::from(Span::styled(
            "Loading task…",
            Style::default().fg(Theme::MUTED_TEXT),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Task ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Theme::PANEL_BORDER)),
        );

    frame.render_widget(paragraph, area);
}

fn field(label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<11}"), Style::default().fg(Theme::MUTED_TEXT)),
        Span::styled(value, Style::default().fg(Theme::TEXT)),
    ])
}

/// Pure function: detail lines for a task.
pub(crate) fn build_detail_lines(task: &Task) -> Vec<Line<'static>> {
    let mut lines = vec![
        field(
            "Task",
            task.instructions.lines().next().unwrap_or_default().to_string(),
        ),
        field("Started", format_timestamp(task.started_at)),
    ];

    if task.status.is_terminal() {
        lines.push(field("Finished", format_timestamp(task.completed_at)));
    }
    lines.push(field(
        "Run time",
        format_duration(run_time(task.started_at, task.completed_at, Utc::now())),
    ));

    if let Some(path) = &task.worktree_path {
        lines.push(field("Worktree", path.clone()));
    }

    if let Some(error) = &task.error_message {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<11}", "Error"),
                Style::default().fg(Theme::ERROR).add_modifier(Modifier::BOLD),
            ),
            Span::styled(error.clone(), Style::default().fg(Theme::ERROR)),
        ]));
    }

    lines
}
