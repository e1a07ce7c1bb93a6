use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Padding, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState,
};
use ratatui::Frame;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use crate::app::{tray_items, visible_cards, AppState, TrayItem};
use crate::board::age::{due_status, format_age};
use crate::board::layout::Snapshot;
use crate::board::timer::{format_duration, live_seconds};
use crate::board::{Card, Column};

const CARD_HEIGHT: u16 = 5;
const TRAY_HEIGHT: u16 = 3;

/// Total display width of an icon list, including one-space separators between items.
pub(crate) fn total_icon_width(icons: &[(&str, Style)]) -> usize {
    icons.iter().map(|(t, _)| t.width()).sum::<usize>() + icons.len().saturating_sub(1)
}

/// Return the subset of `candidates` that fits within `avail_width`.
///
/// Icons are dropped from the left (least important first) until the remaining
/// set fits. Input order is preserved in the output.
pub(crate) fn fit_icons<'a>(candidates: &[(&'a str, Style)], avail_width: usize) -> Vec<(&'a str, Style)> {
    let mut start = 0;
    while start + 1 < candidates.len() && total_icon_width(&candidates[start..]) > avail_width {
        start += 1;
    }
    let remaining = &candidates[start..];
    if total_icon_width(remaining) > avail_width {
        return Vec::new();
    }
    remaining.to_vec()
}

/// Cut `text` to `max_width` display columns on grapheme boundaries, adding
/// `…` when anything was dropped.
pub(crate) fn truncate(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let avail = max_width.saturating_sub(1);
    let mut truncated: String = text
        .graphemes(true)
        .scan(0, |w, g| {
            let gw = g.width();
            (*w + gw <= avail).then(|| {
                *w += gw;
                g
            })
        })
        .collect();
    if max_width > 0 {
        truncated.push('…');
    }
    truncated
}

/// Title color: green for cards created on the same UTC day as `now`.
pub(crate) fn title_color(created: DateTime<Utc>, now: DateTime<Utc>) -> Color {
    if created.date_naive() == now.date_naive() {
        Theme::NEW_CARD_TITLE
    } else {
        Theme::CARD_TITLE
    }
}

pub fn render_board(f: &mut Frame, area: Rect, snapshot: &Snapshot, state: &AppState, now: DateTime<Utc>) {
    let columns = snapshot.layout().visible_columns();
    if columns.is_empty() {
        let msg = Paragraph::new("No visible columns. Add one with `focusboard column add <title>`.");
        f.render_widget(msg, area);
        return;
    }

    let tray = tray_items(snapshot, &state.drafts);
    let tray_height = if tray.is_empty() && !state.tray_focused { 0 } else { TRAY_HEIGHT };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(tray_height)])
        .split(area);

    let constraints: Vec<Constraint> = columns
        .iter()
        .map(|_| Constraint::Ratio(1, columns.len() as u32))
        .collect();
    let col_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(rows[0]);

    for (idx, col) in columns.iter().enumerate() {
        let is_focused = !state.tray_focused && state.focused_column == idx;
        render_column(f, col_areas[idx], snapshot, col, is_focused, state, now);
    }

    if tray_height > 0 {
        render_tray(f, rows[1], snapshot, &tray, state);
    }
}

fn render_column(
    f: &mut Frame,
    area: Rect,
    snapshot: &Snapshot,
    col: &Column,
    is_focused: bool,
    state: &AppState,
    now: DateTime<Utc>,
) {
    let layout = snapshot.layout();
    let all = snapshot.column_cards(&col.id);
    let cards = visible_cards(snapshot, col, &state.filter);

    let card_count = if state.filter.is_active() {
        format!("{}/{}", cards.len(), all.len())
    } else {
        all.len().to_string()
    };

    let mut header = vec![Span::styled(
        format!(" {} ", col.title),
        Style::default()
            .fg(Theme::COLUMN_HEADER)
            .add_modifier(Modifier::BOLD),
    )];
    if layout.is_focus(&col.id) {
        let limit = snapshot.capacity_guard().limit();
        let count = snapshot.focus_count();
        header.push(Span::styled("◎ ", Style::default().fg(Theme::FOCUS_MARKER)));
        header.push(Span::styled(
            format!("[{count}/{limit}]"),
            Style::default().fg(Theme::capacity_color(count, limit)),
        ));
    } else {
        if layout.is_done(&col.id) {
            header.push(Span::styled("✓ ", Style::default().fg(Theme::DONE_MARKER)));
        }
        header.push(Span::styled(format!("({card_count})"), Theme::dim_style()));
    }

    let focused_mod = if is_focused { Modifier::BOLD } else { Modifier::empty() };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Theme::COLUMN_BORDER).add_modifier(focused_mod))
        .border_type(if is_focused { BorderType::Thick } else { BorderType::Rounded })
        .title(Line::from(header))
        .padding(Padding::new(1, 1, 0, 0));

    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let max_visible = (inner.height / CARD_HEIGHT) as usize;
    let selected = if is_focused { state.selected_card } else { 0 };
    let scroll_offset = if cards.len() > max_visible && selected >= max_visible {
        selected + 1 - max_visible
    } else {
        0
    };

    for (pos, card) in cards.iter().enumerate().skip(scroll_offset).take(max_visible) {
        let y = inner.y + ((pos - scroll_offset) as u16 * CARD_HEIGHT);
        let card_area = Rect::new(inner.x, y, inner.width, CARD_HEIGHT);
        let is_selected = is_focused && pos == state.selected_card;
        render_card(f, card_area, card, is_selected, is_focused, now);
    }

    if cards.len() > max_visible {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        let mut scrollbar_state = ScrollbarState::new(cards.len()).position(scroll_offset);
        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn render_card(
    f: &mut Frame,
    area: Rect,
    card: &Card,
    is_selected: bool,
    is_col_focused: bool,
    now: DateTime<Utc>,
) {
    if area.width < 4 || area.height < 3 {
        return;
    }

    let selected_mod = if is_selected { Modifier::BOLD } else { Modifier::empty() };
    let border_color = if card.is_running() {
        Theme::TIMER_RUNNING
    } else if is_col_focused {
        Theme::CARD_BORDER
    } else {
        Theme::DIM
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color).add_modifier(selected_mod))
        .border_type(if is_selected { BorderType::Thick } else { BorderType::Rounded });

    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height == 0 || inner.width < 2 {
        return;
    }
    let width = inner.width as usize;

    // Line 1: id, age ... due date, priority
    let age = format_age(card.created_at, now);
    let left = format!("#{} {age}", card.id);
    let due = card
        .due_date
        .map(|d| (d.format("%b %d").to_string(), due_status(d, now.date_naive())));
    let mut candidates: Vec<(&str, Style)> = Vec::new();
    if let Some((ref text, status)) = due {
        candidates.push((text.as_str(), Style::default().fg(Theme::due_color(status))));
    }
    let symbol = card.priority.symbol();
    if !symbol.is_empty() {
        candidates.push((symbol, Style::default().fg(Theme::priority_color(card.priority))));
    }
    let icons = fit_icons(&candidates, width.saturating_sub(left.width() + 1));
    let icons_width = total_icon_width(&icons);
    let mut line1 = vec![
        Span::styled(left.clone(), Style::default().fg(Theme::DIM).add_modifier(selected_mod)),
        Span::raw(" ".repeat(width.saturating_sub(left.width() + icons_width))),
    ];
    for (i, (text, style)) in icons.into_iter().enumerate() {
        if i > 0 {
            line1.push(Span::raw(" "));
        }
        line1.push(Span::styled(text, style));
    }

    // Line 2: title
    let title = Line::from(Span::styled(
        truncate(&card.title, width),
        Style::default()
            .fg(title_color(card.created_at, now))
            .add_modifier(selected_mod),
    ));

    // Line 3: tags ... tracked time
    let seconds = live_seconds(card, now);
    let time = if card.is_running() {
        format!("▶ {}", format_duration(seconds))
    } else if seconds > 0 {
        format_duration(seconds)
    } else {
        String::new()
    };
    let tag_room = width.saturating_sub(time.width() + 1);
    let tags = truncate(
        &card.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" "),
        tag_room,
    );
    let tag_color = card.tags.first().map_or(Theme::DIM, |t| Theme::tag_color(t));
    let time_color = if card.is_running() { Theme::TIMER_RUNNING } else { Theme::DIM };
    let line3 = Line::from(vec![
        Span::styled(tags.clone(), Style::default().fg(tag_color)),
        Span::raw(" ".repeat(width.saturating_sub(tags.width() + time.width()))),
        Span::styled(time, Style::default().fg(time_color)),
    ]);

    for (row, line) in [Line::from(line1), title, line3].into_iter().enumerate() {
        if (row as u16) < inner.height {
            f.render_widget(
                Paragraph::new(line),
                Rect::new(inner.x, inner.y + row as u16, inner.width, 1),
            );
        }
    }
}

/// Drafts and parked cards, side by side.
fn render_tray(f: &mut Frame, area: Rect, snapshot: &Snapshot, items: &[TrayItem], state: &AppState) {
    let border_mod = if state.tray_focused { Modifier::BOLD } else { Modifier::empty() };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if state.tray_focused { BorderType::Thick } else { BorderType::Rounded })
        .border_style(Style::default().add_modifier(border_mod))
        .title(Span::styled(
            format!(" Tray ({}) ", items.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if items.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled(" nothing parked, no drafts", Theme::dim_style())),
            inner,
        );
        return;
    }

    let mut spans = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let label = match item {
            TrayItem::Draft(id) => state
                .drafts
                .get(id)
                .map(|d| format!("✎ {}", truncate(&d.title, 24))),
            TrayItem::Parked(id) => snapshot
                .card(id)
                .map(|c| format!("⏸ #{} {}", c.id, truncate(&c.title, 24))),
        };
        let Some(label) = label else { continue };
        let style = if state.tray_focused && idx == state.tray_selected {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {label} "), style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn s() -> Style {
        Style::default()
    }

    #[test]
    fn total_icon_width_counts_separators() {
        assert_eq!(total_icon_width(&[]), 0);
        assert_eq!(total_icon_width(&[("!", s())]), 1);
        assert_eq!(total_icon_width(&[("May 10", s()), ("!", s())]), 8);
    }

    #[test]
    fn fit_icons_drops_from_the_left() {
        let icons = [("May 10", s()), ("!", s())];
        assert_eq!(fit_icons(&icons, 8).len(), 2);
        let fitted = fit_icons(&icons, 3);
        assert_eq!(fitted.len(), 1);
        assert_eq!(fitted[0].0, "!");
        assert!(fit_icons(&icons, 0).is_empty());
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn truncate_respects_wide_graphemes() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        // Each CJK char is two columns wide.
        assert_eq!(truncate("日本語テキスト", 6), "日本…");
        assert_eq!(truncate("anything", 0), "");
    }

    #[test]
    fn title_color_marks_same_day_cards() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 18, 0, 0).unwrap();
        let morning = Utc.with_ymd_and_hms(2026, 5, 10, 8, 0, 0).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2026, 5, 9, 23, 0, 0).unwrap();
        assert_eq!(title_color(morning, now), Theme::NEW_CARD_TITLE);
        assert_eq!(title_color(yesterday, now), Theme::CARD_TITLE);
    }
}
