use ratatui::style::Color;

use crate::model::TaskStatus;

pub struct Theme;

impl Theme {
    // ── Base palette ────────────────────────────────────────────
    pub const TEXT: Color = Color::Rgb(225, 225, 235);
    pub const MUTED_TEXT: Color = Color::Rgb(100, 105, 120);

    // ── Accent ──────────────────────────────────────────────────
    pub const ACCENT: Color = Color::Rgb(80, 200, 200); // teal
    pub const ACCENT_WARM: Color = Color::Rgb(230, 160, 60); // amber, in-flight actions

    // ── Semantic colors ─────────────────────────────────────────
    pub const SUCCESS: Color = Color::Rgb(80, 210, 120);
    pub const WARNING: Color = Color::Rgb(230, 180, 60);
    pub const ERROR: Color = Color::Rgb(230, 80, 80);
    pub const INFO: Color = Color::Rgb(80, 180, 220);

    // ── UI chrome ───────────────────────────────────────────────
    pub const HEADER_BG: Color = Color::Rgb(24, 24, 32);
    pub const FOOTER_BG: Color = Color::Rgb(24, 24, 32);
    pub const PANEL_BORDER: Color = Color::Rgb(50, 50, 65);
    pub const ACTIVE_BORDER: Color = Color::Rgb(80, 200, 200); // = ACCENT
    pub const LOG_TEXT: Color = Color::Rgb(110, 220, 130);

    // ── Task status ─────────────────────────────────────────────
    pub const TASK_PENDING: Color = Color::Rgb(100, 105, 120); // = MUTED_TEXT
    pub const TASK_RUNNING: Color = Color::Rgb(80, 180, 220);  // = INFO
    pub const TASK_COMPLETED: Color = Color::Rgb(80, 210, 120); // = SUCCESS
    pub const TASK_FAILED: Color = Color::Rgb(230, 80, 80);     // = ERROR
    pub const TASK_CANCELLED: Color = Color::Rgb(230, 180, 60); // = WARNING

    /// Get color for task status
    pub fn task_status_color(status: TaskStatus) -> Color {
        match status {
            TaskStatus::Pending => Self::TASK_PENDING,
            TaskStatus::Running => Self::TASK_RUNNING,
            TaskStatus::Completed => Self::TASK_COMPLETED,
            TaskStatus::Failed => Self::TASK_FAILED,
            TaskStatus::Cancelled => Self::TASK_CANCELLED,
        }
    }

    /// Single-glyph status marker for list views
    pub fn task_status_icon(status: TaskStatus) -> &'static str {
        match status {
            TaskStatus::Pending => "○",
            TaskStatus::Running => "◐",
            TaskStatus::Completed => "●",
            TaskStatus::Failed => "✗",
            TaskStatus::Cancelled => "⊘",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_colors_defined() {
        assert_eq!(Theme::task_status_color(TaskStatus::Pending), Theme::TASK_PENDING);
        assert_eq!(Theme::task_status_color(TaskStatus::Running), Theme::TASK_RUNNING);
        assert_eq!(Theme::task_status_color(TaskStatus::Completed), Theme::TASK_COMPLETED);
        assert_eq!(Theme::task_status_color(TaskStatus::Failed), Theme::TASK_FAILED);
        assert_eq!(Theme::task_status_color(TaskStatus::Cancelled), Theme::TASK_CANCELLED);
    }

    #[test]
    fn every_status_has_distinct_icon() {
        let icons: std::collections::HashSet<_> =
            TaskStatus::ALL.iter().map(|s| Theme::task_status_icon(*s)).collect();
        assert_eq!(icons.len(), TaskStatus::ALL.len());
    }
}
