use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::AppState;
use crate::model::{TaskAction, Theme};

/// Render footer status bar with keybinding hints.
/// Only actions the task's status offers are listed; the newest error or
/// notice is shown after them.
pub fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let footer_text = build_footer_text(state);

    let footer = Paragraph::new(footer_text).style(
        Style::default()
            .fg(Theme::TEXT)
            .bg(Theme::FOOTER_BG)
            .add_modifier(Modifier::DIM),
    );

    frame.render_widget(footer, area);
}

fn key(spans: &mut Vec<Span<'static>>, key: &'static str, label: &'static str) {
    spans.push(Span::styled(key, Style::default().fg(Theme::INFO)));
    spans.push(Span::raw(format!(":{label} ")));
}

/// Pure function: build footer text from state.
pub(crate) fn build_footer_text(state: &AppState) -> Line<'static> {
    let mut spans = Vec::new();

    key(&mut spans, "q", "quit");
    for action in state.enabled_actions() {
        match action {
            TaskAction::Cancel => key(&mut spans, "c", "cancel"),
            TaskAction::Delete => key(&mut spans, "d", "delete"),
            // Live view opens by itself while the task runs
            TaskAction::ViewLive => {}
        }
    }
    key(&mut spans, "j/k", "scroll");
    key(&mut spans, "w", "save");
    key(&mut spans, "?", "help");

    if let Some(action) = state.in_flight {
        spans.push(Span::styled(
            format!(" {}…", action.as_str()),
            Style::default().fg(Theme::ACCENT_WARM),
        ));
    }

    if let Some(error) = state.errors.back() {
        spans.push(Span::styled(
            format!(" {error}"),
            Style::default().fg(Theme::ERROR),
        ));
    } else if let Some(notice) = state.notices.back() {
        spans.push(Span::styled(
            format!(" {notice}"),
            Style::default().fg(Theme::SUCCESS),
        ));
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, TaskId, TaskStatus};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn footer_for(status: Option<TaskStatus>) -> String {
        let mut state = AppState::new(TaskId::new("t1"));
        state.task = status.map(|s| Task::new("t1", "r1", "b", s));
        let line = build_footer_text(&state);
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn render_footer_does_not_panic() {
        let backend = TestBackend::new(80, 1);
        let mut terminal = Terminal::new(backend).unwrap();
        let state = AppState::new(TaskId::new("t1"));

        terminal
            .draw(|frame| render_footer(frame, frame.area(), &state))
            .unwrap();
    }

    #[test]
    fn running_offers_cancel_only() {
        let text = footer_for(Some(TaskStatus::Running));
        assert!(text.contains("c:cancel"));
        assert!(!text.contains("d:delete"));
    }

    #[test]
    fn pending_offers_cancel_only() {
        let text = footer_for(Some(TaskStatus::Pending));
        assert!(text.contains("c:cancel"));
        assert!(!text.contains("d:delete"));
    }

    #[test]
    fn terminal_offers_delete_only() {
        for status in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
            let text = footer_for(Some(status));
            assert!(text.contains("d:delete"), "{status}");
            assert!(!text.contains("c:cancel"), "{status}");
        }
    }

    #[test]
    fn unknown_task_offers_no_actions() {
        let text = footer_for(None);
        assert!(text.contains("q:quit"));
        assert!(!text.contains("cancel"));
        assert!(!text.contains("delete"));
    }

    #[test]
    fn newest_error_is_shown() {
        let mut state = AppState::new(TaskId::new("t1"));
        state.push_error("first");
        state.push_error("second");
        let text: String = build_footer_text(&state)
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert!(text.contains("second"));
        assert!(!text.contains("first"));
    }
}
