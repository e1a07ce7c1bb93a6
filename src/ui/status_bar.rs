use chrono::{DateTime, Utc};
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::board_view::truncate;
use super::theme::Theme;
use crate::app::{AppState, Mode, NotificationLevel};
use crate::board::layout::Snapshot;
use crate::board::timer::{format_duration, live_seconds};
use crate::input::keymap::mode_bindings;

pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    snapshot: &Snapshot,
    state: &AppState,
    board_name: &str,
    now: DateTime<Utc>,
) {
    // Text-entry modes take over the entire bar
    if let Some(line) = render_input_line(snapshot, state) {
        f.render_widget(Paragraph::new(line).style(Theme::status_style()), area);
        return;
    }

    let left = build_left_zone(state, board_name);
    let right = build_right_zone(snapshot, state, now);

    let left_width: usize = left.iter().map(|s| s.content.width()).sum();
    let right_width: usize = right.iter().map(|s| s.content.width()).sum();
    let center_avail = (area.width as usize).saturating_sub(left_width + right_width);

    let mut spans = left;
    spans.extend(build_center_zone(state, center_avail));
    spans.extend(right);
    f.render_widget(Paragraph::new(Line::from(spans)).style(Theme::status_style()), area);
}

/// Mode badge, board name and the active search.
fn build_left_zone<'a>(state: &'a AppState, board_name: &'a str) -> Vec<Span<'a>> {
    let badge = if state.tray_focused { " TRAY " } else { " BOARD " };
    let mut spans = vec![
        Span::styled(
            badge,
            Style::default()
                .fg(Theme::FG)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ),
        Span::raw(" "),
        Span::styled(format!("{board_name} "), Theme::dim_style()),
    ];
    if !state.filter.search.trim().is_empty() {
        spans.push(Span::raw(format!("/{} ", state.filter.search)));
    }
    for tag in &state.filter.tags {
        spans.push(Span::styled(format!("#{tag} "), Style::default().fg(Theme::tag_color(tag))));
    }
    spans
}

/// Running timer, or the key hints when nothing runs.
fn build_right_zone<'a>(snapshot: &'a Snapshot, state: &AppState, now: DateTime<Utc>) -> Vec<Span<'a>> {
    if let Some(card) = snapshot.running_card() {
        return vec![
            Span::styled(
                format!("▶ {} ", truncate(&card.title, 20)),
                Style::default().fg(Theme::TIMER_RUNNING),
            ),
            Span::styled(
                format!("{} ", format_duration(live_seconds(card, now))),
                Style::default()
                    .fg(Theme::TIMER_RUNNING)
                    .add_modifier(Modifier::BOLD),
            ),
        ];
    }
    let mut spans = Vec::new();
    for binding in mode_bindings(&state.mode) {
        spans.push(Span::styled(binding.key, Style::default().add_modifier(Modifier::BOLD)));
        spans.push(Span::styled(format!(" {} ", binding.description), Theme::dim_style()));
    }
    spans
}

/// Notification centered in the space left over.
fn build_center_zone(state: &AppState, avail_width: usize) -> Vec<Span<'_>> {
    let Some(ref notif) = state.notification else {
        return vec![Span::raw(" ".repeat(avail_width))];
    };
    let color = match state.notification_level {
        NotificationLevel::Info => Theme::FG,
        NotificationLevel::Error => Theme::STATUS_ERROR,
    };
    if notif.width() >= avail_width {
        return vec![Span::styled(truncate(notif, avail_width), Style::default().fg(color))];
    }
    let pad_total = avail_width - notif.width();
    let pad_left = pad_total / 2;
    vec![
        Span::raw(" ".repeat(pad_left)),
        Span::styled(notif.as_str(), Style::default().fg(color)),
        Span::raw(" ".repeat(pad_total - pad_left)),
    ]
}

fn prompt(label: String) -> Span<'static> {
    Span::styled(
        label,
        Style::default()
            .fg(Theme::FG)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED),
    )
}

fn render_input_line<'a>(snapshot: &Snapshot, state: &'a AppState) -> Option<Line<'a>> {
    let (label, buf) = match &state.mode {
        Mode::QuickCreate { buf, target } => {
            let columns = snapshot.layout().visible_columns();
            let into = target
                .and_then(|i| columns.get(i))
                .map_or_else(|| "draft".to_string(), |c| c.title.clone());
            (format!(" new → {into} "), buf)
        }
        Mode::Search { buf } => (" / ".to_string(), buf),
        Mode::Edit { buf, .. } => (" title ".to_string(), buf),
        Mode::Normal | Mode::Confirm { .. } => return None,
    };
    let mut spans = vec![prompt(label), Span::raw(" ")];
    let (before, after): (String, String) = {
        let split = buf
            .input
            .char_indices()
            .nth(buf.cursor)
            .map_or(buf.input.len(), |(i, _)| i);
        (buf.input[..split].to_string(), buf.input[split..].to_string())
    };
    spans.push(Span::raw(before));
    spans.push(Span::styled("▏", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    spans.push(Span::raw(after));
    if state.notification_level == NotificationLevel::Error {
        if let Some(ref notif) = state.notification {
            spans.push(Span::styled(format!("  {notif}"), Style::default().fg(Theme::STATUS_ERROR)));
        }
    }
    Some(Line::from(spans))
}
