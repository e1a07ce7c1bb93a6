pub mod board_view;
pub mod status_bar;
pub mod theme;

use chrono::{DateTime, Utc};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{AppState, Mode};
use crate::board::layout::Snapshot;

/// Create a centered rect within `area` using percentage-based sizing with minimums.
pub fn centered_rect(area: Rect, w_pct: u16, h_pct: u16, min_w: u16, min_h: u16) -> Rect {
    let width = (area.width * w_pct / 100).max(min_w).min(area.width);
    let height = (area.height * h_pct / 100).max(min_h).min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

pub fn render(f: &mut Frame, snapshot: &Snapshot, state: &AppState, board_name: &str, now: DateTime<Utc>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());

    board_view::render_board(f, chunks[0], snapshot, state, now);
    status_bar::render_status_bar(f, chunks[1], snapshot, state, board_name, now);

    if let Mode::Confirm { prompt, .. } = &state.mode {
        render_confirm(f, chunks[0], prompt);
    }
}

fn render_confirm(f: &mut Frame, area: Rect, prompt: &str) {
    let popup = centered_rect(area, 40, 20, 30, 5);
    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Span::styled(" Confirm ", Style::default().add_modifier(Modifier::BOLD)));
    let body = vec![
        Line::from(prompt.to_string()),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" yes   "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" no"),
        ]),
    ];
    f.render_widget(
        Paragraph::new(body)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_is_clamped_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect(area, 40, 20, 30, 5);
        assert_eq!(rect, Rect::new(0, 2, 20, 5));
    }

    #[test]
    fn centered_rect_centers() {
        let area = Rect::new(0, 0, 100, 50);
        assert_eq!(centered_rect(area, 50, 50, 10, 10), Rect::new(25, 12, 50, 25));
    }
}
