use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::format::format_elapsed;
use crate::app::AppState;
use crate::model::Theme;

/// Render header bar.
/// Shows: branch, repository, status, connection marker, elapsed time.
pub fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let header_text = build_header_text(state);

    let header = Paragraph::new(header_text).style(
        Style::default()
            .fg(Theme::TEXT)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD),
    );

    frame.render_widget(header, area);
}

/// Pure function: build header text from state.
pub(crate) fn build_header_text(state: &AppState) -> Line<'static> {
    let mut spans = vec![Span::styled("devbud", Style::default().fg(Theme::ACCENT))];

    let Some(task) = &state.task else {
        spans.push(Span::styled(
            format!("  loading {}…", state.task_id),
            Style::default().fg(Theme::MUTED_TEXT),
        ));
        return Line::from(spans);
    };

    spans.push(Span::styled(
        format!("  {}", task.branch_name),
        Style::default().fg(Theme::TEXT),
    ));
    spans.push(Span::styled(
        format!("  {}", task.repository_name()),
        Style::default().fg(Theme::MUTED_TEXT),
    ));
    spans.push(Span::styled(
        format!(
            "  {} {}",
            Theme::task_status_icon(task.status),
            task.status.as_str()
        ),
        Style::default().fg(Theme::task_status_color(task.status)),
    ));

    if state.cancel_requested && !task.status.is_terminal() {
        spans.push(Span::styled(
            "  cancelling…",
            Style::default().fg(Theme::WARNING),
        ));
    }

    if state.live {
        let (marker, color) = if state.connected {
            ("  ● live", Theme::SUCCESS)
        } else {
            ("  ○ reconnecting", Theme::WARNING)
        };
        spans.push(Span::styled(marker, Style::default().fg(color)));
    }

    spans.push(Span::styled(
        format!("  {}", format_elapsed(state.started_at.elapsed().as_secs() as i64)),
        Style::default().fg(Theme::MUTED_TEXT),
    ));

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, TaskId, TaskStatus};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn render_header_does_not_panic() {
        let backend = TestBackend::new(80, 1);
        let mut terminal = Terminal::new(backend).unwrap();
        let state = AppState::new(TaskId::new("t1"));

        terminal
            .draw(|frame| render_header(frame, frame.area(), &state))
            .unwrap();
    }

    #[test]
    fn header_before_load_shows_id() {
        let state = AppState::new(TaskId::new("t-42"));
        assert!(text(&build_header_text(&state)).contains("loading t-42"));
    }

    #[test]
    fn header_shows_branch_status_and_live_marker() {
        let mut state = AppState::new(TaskId::new("t1"));
        state.task = Some(Task::new("t1", "r1", "feature/login", TaskStatus::Running));
        state.live = true;
        state.connected = true;

        let line = text(&build_header_text(&state));
        assert!(line.contains("feature/login"));
        assert!(line.contains("running"));
        assert!(line.contains("● live"));
    }

    #[test]
    fn header_shows_reconnecting_when_socket_down() {
        let mut state = AppState::new(TaskId::new("t1"));
        state.task = Some(Task::new("t1", "r1", "b", TaskStatus::Running));
        state.live = true;

        assert!(text(&build_header_text(&state)).contains("reconnecting"));
    }

    #[test]
    fn header_marks_pending_cancel() {
        let mut state = AppState::new(TaskId::new("t1"));
        state.task = Some(Task::new("t1", "r1", "b", TaskStatus::Running));
        state.cancel_requested = true;

        let line = text(&build_header_text(&state));
        assert!(line.contains("cancelling"));
        assert!(line.contains("running"));
    }
}
