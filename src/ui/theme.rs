use ratatui::style::{Color, Style};

use crate::board::age::DueStatus;
use crate::board::Priority;

/// Color theme for the board.
///
/// Text and chrome use the terminal's default foreground (Color::Reset).
/// Only signals get color: priority, due dates, the running timer, capacity
/// and tags.
pub struct Theme;

impl Theme {
    pub const FG: Color = Color::Reset;
    pub const DIM: Color = Color::DarkGray;

    // Column
    pub const COLUMN_HEADER: Color = Color::Reset;
    pub const COLUMN_BORDER: Color = Color::Reset;
    pub const FOCUS_MARKER: Color = Color::Cyan;
    pub const DONE_MARKER: Color = Color::Green;

    // Card
    pub const CARD_BORDER: Color = Color::Reset;
    pub const CARD_TITLE: Color = Color::Reset;
    pub const NEW_CARD_TITLE: Color = Color::Green;
    pub const TIMER_RUNNING: Color = Color::Cyan;

    pub const PRIORITY_LOW: Color = Color::Green;
    pub const PRIORITY_HIGH: Color = Color::Red;

    pub const DUE_OVERDUE: Color = Color::Red;
    pub const DUE_TODAY: Color = Color::Yellow;

    // Focus capacity
    pub const CAPACITY_OK: Color = Color::Green;
    pub const CAPACITY_FULL: Color = Color::Yellow;
    pub const CAPACITY_OVER: Color = Color::Red;

    // Status bar
    pub const STATUS_ERROR: Color = Color::Red;

    pub fn dim_style() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn status_style() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn priority_color(priority: Priority) -> Color {
        match priority {
            Priority::Low => Self::PRIORITY_LOW,
            Priority::Medium => Self::FG,
            Priority::High => Self::PRIORITY_HIGH,
        }
    }

    pub fn due_color(status: DueStatus) -> Color {
        match status {
            DueStatus::Overdue => Self::DUE_OVERDUE,
            DueStatus::Today => Self::DUE_TODAY,
            DueStatus::Upcoming => Self::DIM,
        }
    }

    /// Green below the limit, yellow at it, red past it.
    pub fn capacity_color(count: usize, limit: usize) -> Color {
        match count.cmp(&limit) {
            std::cmp::Ordering::Less => Self::CAPACITY_OK,
            std::cmp::Ordering::Equal => Self::CAPACITY_FULL,
            std::cmp::Ordering::Greater => Self::CAPACITY_OVER,
        }
    }

    /// Assign a consistent color to a tag based on its name.
    pub fn tag_color(tag: &str) -> Color {
        let hash = tag
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        const PALETTE: [Color; 8] = [
            Color::Cyan,
            Color::Green,
            Color::Magenta,
            Color::Blue,
            Color::Yellow,
            Color::LightCyan,
            Color::LightMagenta,
            Color::LightBlue,
        ];
        PALETTE[(hash % PALETTE.len() as u32) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_color_is_stable() {
        assert_eq!(Theme::tag_color("ops"), Theme::tag_color("ops"));
    }

    #[test]
    fn capacity_colors() {
        assert_eq!(Theme::capacity_color(4, 5), Theme::CAPACITY_OK);
        assert_eq!(Theme::capacity_color(5, 5), Theme::CAPACITY_FULL);
        assert_eq!(Theme::capacity_color(6, 5), Theme::CAPACITY_OVER);
    }
}
