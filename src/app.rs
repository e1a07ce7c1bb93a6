use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;

use crate::board::draft::{Draft, DraftId, DraftTray};
use crate::board::drag::{DragSource, DropTarget};
use crate::board::events::{ActivityLog, BoardEvent, EventBuffer};
use crate::board::filter::CardFilter;
use crate::board::layout::Snapshot;
use crate::board::service::{BoardError, BoardService, CardEdit, CardInput, MoveOutcome, TimerOutcome};
use crate::board::storage::{find_board_dir, load_local_config, FileStore};
use crate::board::store::{Store, UserResolver};
use crate::board::timer::format_duration;
use crate::board::{Card, CardId, Column};
use crate::config::LocalUser;
use crate::input::action::Action;
use crate::input::keymap::map_key;

/// Reusable text editing buffer with cursor.
///
/// `cursor` is a **char index** (not byte index), always in `0..=char_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    pub input: String,
    pub cursor: usize,
}

impl TextBuffer {
    pub fn new(input: String) -> Self {
        let cursor = input.chars().count();
        Self { input, cursor }
    }

    pub fn empty() -> Self {
        Self { input: String::new(), cursor: 0 }
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    pub fn insert(&mut self, c: char) {
        let byte_idx = self.byte_offset(self.cursor);
        self.input.insert(byte_idx, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let byte_idx = self.byte_offset(self.cursor - 1);
            self.input.remove(byte_idx);
            self.cursor -= 1;
        }
    }

    pub fn delete_word(&mut self) {
        let byte_pos = self.byte_offset(self.cursor);
        let trimmed = self.input[..byte_pos].trim_end();
        let start_byte = trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        let start_char = self.input[..start_byte].chars().count();
        self.input.drain(start_byte..byte_pos);
        self.cursor = start_char;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    fn apply(&mut self, action: &Action) {
        match action {
            Action::InputChar(c) => self.insert(*c),
            Action::InputBackspace => self.backspace(),
            Action::InputDeleteWord => self.delete_word(),
            Action::InputLeft => self.move_left(),
            Action::InputRight => self.move_right(),
            Action::InputHome => self.home(),
            Action::InputEnd => self.end(),
            _ => {}
        }
    }
}

/// Current interaction mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// New card title. `target` indexes the visible columns; `None` makes a draft.
    QuickCreate {
        buf: TextBuffer,
        target: Option<usize>,
    },
    Search {
        buf: TextBuffer,
    },
    Edit {
        card_id: CardId,
        buf: TextBuffer,
    },
    Confirm {
        prompt: String,
        card_id: CardId,
    },
}

/// Notification severity for statusbar coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Something that sits in the tray below the columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayItem {
    Draft(DraftId),
    Parked(CardId),
}

impl TrayItem {
    fn drag_source(&self) -> DragSource {
        match self {
            Self::Draft(id) => DragSource::Draft(id.clone()),
            Self::Parked(id) => DragSource::OverflowCard(id.clone()),
        }
    }
}

/// Drafts first, then parked cards.
pub fn tray_items(snapshot: &Snapshot, drafts: &DraftTray) -> Vec<TrayItem> {
    drafts
        .drafts()
        .iter()
        .map(|d| TrayItem::Draft(d.id.clone()))
        .chain(snapshot.overflow_cards().into_iter().map(|c| TrayItem::Parked(c.id.clone())))
        .collect()
}

/// Cards of `column` that pass the active filter, in display order.
pub fn visible_cards<'a>(snapshot: &'a Snapshot, column: &Column, filter: &CardFilter) -> Vec<&'a Card> {
    snapshot
        .column_cards(&column.id)
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect()
}

/// Global application state.
pub struct AppState {
    pub mode: Mode,
    /// Index into the visible columns.
    pub focused_column: usize,
    pub selected_card: usize,
    pub tray_focused: bool,
    pub tray_selected: usize,
    pub filter: CardFilter,
    pub drafts: DraftTray,
    pub notification: Option<String>,
    pub notification_level: NotificationLevel,
    pub notification_expires: Option<Instant>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            focused_column: 0,
            selected_card: 0,
            tray_focused: false,
            tray_selected: 0,
            filter: CardFilter::default(),
            drafts: DraftTray::default(),
            notification: None,
            notification_level: NotificationLevel::Info,
            notification_expires: None,
            should_quit: false,
        }
    }

    pub fn current_column<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Column> {
        snapshot.layout().visible_columns().get(self.focused_column).copied()
    }

    /// The card under the cursor in the focused column.
    pub fn focused_card<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Card> {
        let column = self.current_column(snapshot)?;
        visible_cards(snapshot, column, &self.filter)
            .get(self.selected_card)
            .copied()
    }

    pub fn selected_tray_item(&self, snapshot: &Snapshot) -> Option<TrayItem> {
        tray_items(snapshot, &self.drafts).get(self.tray_selected).cloned()
    }

    /// Show a transient notification.
    pub fn notify(&mut self, msg: impl Into<String>) {
        self.notification = Some(msg.into());
        self.notification_level = NotificationLevel::Info;
        self.notification_expires = Some(Instant::now() + Duration::from_secs(3));
    }

    /// Show a transient error notification (rendered in red).
    pub fn notify_error(&mut self, msg: impl Into<String>) {
        self.notification = Some(msg.into());
        self.notification_level = NotificationLevel::Error;
        self.notification_expires = Some(Instant::now() + Duration::from_secs(5));
    }

    /// Clear expired notifications.
    pub fn tick_notification(&mut self) {
        if let Some(expires) = self.notification_expires {
            if Instant::now() >= expires {
                self.notification = None;
                self.notification_level = NotificationLevel::Info;
                self.notification_expires = None;
            }
        }
    }

    /// Keep the cursors inside the current columns and tray.
    pub fn clamp_selection(&mut self, snapshot: &Snapshot) {
        let columns = snapshot.layout().visible_columns();
        if self.focused_column >= columns.len() {
            self.focused_column = columns.len().saturating_sub(1);
        }
        let cards = columns
            .get(self.focused_column)
            .map_or(0, |col| visible_cards(snapshot, col, &self.filter).len());
        self.selected_card = self.selected_card.min(cards.saturating_sub(1));
        let tray = tray_items(snapshot, &self.drafts).len();
        self.tray_selected = self.tray_selected.min(tray.saturating_sub(1));
    }

    /// Put the cursor on `id` wherever it now sits.
    fn follow_card(&mut self, snapshot: &Snapshot, id: &CardId) {
        for (col_idx, column) in snapshot.layout().visible_columns().into_iter().enumerate() {
            if let Some(pos) = visible_cards(snapshot, column, &self.filter)
                .iter()
                .position(|c| c.id == *id)
            {
                self.focused_column = col_idx;
                self.selected_card = pos;
                self.tray_focused = false;
                return;
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// The service as wired up for the terminal board.
pub type App = BoardService<FileStore, LocalUser>;

/// Open the board above `start_dir` with the activity log attached, seeding
/// the default columns for a user who has none.
pub fn open_board(start_dir: &Path) -> color_eyre::Result<App> {
    let board_dir = find_board_dir(start_dir)?;
    let store = FileStore::open(&board_dir)?;
    let capacity = store.focus_capacity();
    let users = LocalUser::new(load_local_config(&board_dir)?);
    let mut service = BoardService::new(store, users).with_focus_capacity(capacity);
    service.add_sink(ActivityLog::new(&board_dir));
    if service.current_user().is_some() {
        service.ensure_defaults(Utc::now())?;
    }
    Ok(service)
}

/// Main TUI application loop.
pub fn run(terminal: &mut DefaultTerminal, start_dir: &Path) -> color_eyre::Result<()> {
    let mut service = open_board(start_dir)?;
    let board_name = service.store().name().to_string();
    let events = EventBuffer::default();
    service.add_sink(events.clone());

    let mut state = AppState::new();
    if service.current_user().is_some() {
        let stopped = service.reconcile_timers(Utc::now())?;
        if !stopped.is_empty() {
            state.notify(format!("Stopped {} stray timer(s)", stopped.len()));
        }
    } else {
        state.notify_error("No user set. Run `focusboard init --user <name>` or set FOCUSBOARD_USER.");
    }
    events.drain();

    loop {
        state.tick_notification();

        let now = Utc::now();
        let snapshot = service.snapshot()?;
        state.clamp_selection(&snapshot);
        terminal.draw(|f| crate::ui::render(f, &snapshot, &state, &board_name, now))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                let action = map_key(key, &state.mode);
                process_action(&mut service, &events, &mut state, action, Utc::now())?;
                if state.should_quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Apply one action. Rejections become notices; only storage failures
/// propagate.
pub fn process_action<S: Store, R: UserResolver>(
    service: &mut BoardService<S, R>,
    events: &EventBuffer,
    state: &mut AppState,
    action: Action,
    now: DateTime<Utc>,
) -> color_eyre::Result<()> {
    let snapshot = service.snapshot()?;
    let result = match state.mode.clone() {
        Mode::Normal => handle_normal(service, state, &snapshot, action, now),
        Mode::QuickCreate { buf, target } => {
            handle_quick_create(service, state, &snapshot, buf, target, action, now)
        }
        Mode::Search { buf } => {
            handle_search(state, buf, action);
            Ok(())
        }
        Mode::Edit { card_id, buf } => handle_edit(service, state, &snapshot, card_id, buf, action, now),
        Mode::Confirm { card_id, .. } => handle_confirm(service, state, card_id, action, now),
    };

    match result {
        Ok(()) => {}
        Err(BoardError::Store(err)) => return Err(err.into()),
        Err(err) => state.notify_error(err.to_string()),
    }

    for event in events.drain() {
        announce(state, &event);
    }
    let snapshot = service.snapshot()?;
    state.clamp_selection(&snapshot);
    Ok(())
}

/// Turn a board event into a status-bar notice.
fn announce(state: &mut AppState, event: &BoardEvent) {
    match event {
        BoardEvent::Celebrate { title, .. } => state.notify(format!("Done: {title}. Nice work!")),
        BoardEvent::TimerStarted { title, .. } => state.notify(format!("Timer started: {title}")),
        BoardEvent::TimerStopped { title, credited, .. } => {
            state.notify(format!("Timer stopped: {title} (+{})", format_duration(*credited)))
        }
        BoardEvent::Archived { archived: true, .. } => state.notify("Card archived"),
        BoardEvent::Parked { overflowed: true, .. } => state.notify("Card parked in the tray"),
        BoardEvent::Parked { overflowed: false, .. } => state.notify("Card back on the board"),
        BoardEvent::Deleted { .. } => state.notify("Card deleted"),
        _ => {}
    }
}

fn handle_normal<S: Store, R: UserResolver>(
    service: &mut BoardService<S, R>,
    state: &mut AppState,
    snapshot: &Snapshot,
    action: Action,
    now: DateTime<Utc>,
) -> Result<(), BoardError> {
    let columns = snapshot.layout().visible_columns();
    match action {
        Action::FocusPrevColumn => {
            state.tray_focused = false;
            state.focused_column = state.focused_column.saturating_sub(1);
            state.selected_card = 0;
        }
        Action::FocusNextColumn => {
            state.tray_focused = false;
            if state.focused_column + 1 < columns.len() {
                state.focused_column += 1;
                state.selected_card = 0;
            }
        }
        Action::SelectPrevCard if state.tray_focused => {
            state.tray_selected = state.tray_selected.saturating_sub(1);
        }
        Action::SelectNextCard if state.tray_focused => state.tray_selected += 1,
        Action::SelectPrevCard => state.selected_card = state.selected_card.saturating_sub(1),
        Action::SelectNextCard => state.selected_card += 1,
        Action::ToggleTray => state.tray_focused = !state.tray_focused,
        Action::NewCard => {
            let target = (!columns.is_empty()).then_some(state.focused_column);
            state.mode = Mode::QuickCreate { buf: TextBuffer::empty(), target };
        }
        Action::StartSearch => {
            state.mode = Mode::Search { buf: TextBuffer::new(state.filter.search.clone()) };
        }
        Action::FilterByTag => {
            let tag = state
                .focused_card(snapshot)
                .and_then(|c| c.tags.first())
                .cloned();
            if let Some(tag) = tag {
                state.filter.toggle_tag(&tag);
                state.selected_card = 0;
            }
        }
        Action::ClearFilters => {
            if state.filter.is_active() {
                state.filter.clear();
                state.notify("Filters cleared");
            }
        }
        Action::MoveToVisibleColumn(idx) => {
            if state.filter.is_active() {
                state.notify_error("Clear filters (Esc) before moving cards");
                return Ok(());
            }
            let Some(column) = columns.get(idx) else {
                return Ok(());
            };
            let source = if state.tray_focused {
                state.selected_tray_item(snapshot).map(|item| item.drag_source())
            } else {
                state.focused_card(snapshot).map(|c| DragSource::Card(c.id.clone()))
            };
            let Some(source) = source else {
                return Ok(());
            };
            let outcome = match &source {
                DragSource::Card(card_id) => service.move_to_column(card_id, &column.id, now)?,
                _ => {
                    let target = DropTarget::Column(column.id.clone());
                    service.move_card(&mut state.drafts, &source, &target, now)?
                }
            };
            let moved = match outcome {
                MoveOutcome::Moved { card_id, .. } | MoveOutcome::Reordered { card_id, .. } => card_id,
                MoveOutcome::Promoted { card_id, .. } => {
                    state.notify(format!("Draft added to {}", column.title));
                    card_id
                }
                _ => return Ok(()),
            };
            let snapshot = service.snapshot()?;
            state.follow_card(&snapshot, &moved);
        }
        Action::ToggleTimer => {
            let Some(card) = state.focused_card(snapshot) else {
                return Ok(());
            };
            if service.toggle_timer(&card.id, now)? == TimerOutcome::Ineligible {
                state.notify_error("Timers run only on cards in the focus column");
            }
        }
        Action::ArchiveCard => {
            let id = if state.tray_focused {
                match state.selected_tray_item(snapshot) {
                    Some(TrayItem::Parked(id)) => Some(id),
                    _ => None,
                }
            } else {
                state.focused_card(snapshot).map(|c| c.id.clone())
            };
            if let Some(id) = id {
                service.toggle_archive(&id, true, now)?;
            }
        }
        Action::ParkCard if state.tray_focused => {
            if let Some(TrayItem::Parked(id)) = state.selected_tray_item(snapshot) {
                service.set_overflow(&id, false, now)?;
            }
        }
        Action::ParkCard => {
            if let Some(card) = state.focused_card(snapshot) {
                service.set_overflow(&card.id, true, now)?;
            }
        }
        Action::EditTitle if !state.tray_focused => {
            if let Some(card) = state.focused_card(snapshot) {
                state.mode = Mode::Edit {
                    card_id: card.id.clone(),
                    buf: TextBuffer::new(card.title.clone()),
                };
            }
        }
        Action::DeleteCard if state.tray_focused => match state.selected_tray_item(snapshot) {
            Some(TrayItem::Draft(id)) => {
                if state.drafts.discard(&id).is_some() {
                    state.notify("Draft discarded");
                }
            }
            Some(TrayItem::Parked(id)) => confirm_delete(state, snapshot, &id),
            None => {}
        },
        Action::DeleteCard => {
            if let Some(card) = state.focused_card(snapshot) {
                let id = card.id.clone();
                confirm_delete(state, snapshot, &id);
            }
        }
        Action::CyclePriority if !state.tray_focused => {
            if let Some(card) = state.focused_card(snapshot) {
                let edit = CardEdit {
                    priority: Some(card.priority.next()),
                    ..Default::default()
                };
                service.update_card(&card.id, edit, now)?;
            }
        }
        Action::Quit => state.should_quit = true,
        _ => {}
    }
    Ok(())
}

fn confirm_delete(state: &mut AppState, snapshot: &Snapshot, id: &CardId) {
    if let Some(card) = snapshot.card(id) {
        state.mode = Mode::Confirm {
            prompt: format!("Delete \"{}\"?", card.title),
            card_id: id.clone(),
        };
    }
}

fn handle_quick_create<S: Store, R: UserResolver>(
    service: &mut BoardService<S, R>,
    state: &mut AppState,
    snapshot: &Snapshot,
    mut buf: TextBuffer,
    target: Option<usize>,
    action: Action,
    now: DateTime<Utc>,
) -> Result<(), BoardError> {
    let columns = snapshot.layout().visible_columns();
    match action {
        Action::InputCancel => state.mode = Mode::Normal,
        Action::CycleTarget => {
            let target = match target {
                Some(i) if i + 1 < columns.len() => Some(i + 1),
                Some(_) => None,
                None => (!columns.is_empty()).then_some(0),
            };
            state.mode = Mode::QuickCreate { buf, target };
        }
        Action::InputConfirm => {
            let title = buf.input.trim().to_string();
            if title.is_empty() {
                state.mode = Mode::Normal;
                return Ok(());
            }
            match target.and_then(|i| columns.get(i)) {
                Some(column) => {
                    // Stay in the modal when the focus column is full.
                    let id = service.create_card(CardInput::titled(title), &column.id, now)?;
                    state.mode = Mode::Normal;
                    let snapshot = service.snapshot()?;
                    state.follow_card(&snapshot, &id);
                    state.notify(format!("Added to {}", column.title));
                }
                None => {
                    state.drafts.add(Draft::titled(title));
                    state.mode = Mode::Normal;
                    state.notify("Saved as draft (Tab to open the tray)");
                }
            }
        }
        other => {
            buf.apply(&other);
            state.mode = Mode::QuickCreate { buf, target };
        }
    }
    Ok(())
}

/// Search updates the filter live; Enter keeps it, Esc drops it.
fn handle_search(state: &mut AppState, mut buf: TextBuffer, action: Action) {
    match action {
        Action::InputConfirm => state.mode = Mode::Normal,
        Action::InputCancel => {
            state.filter.search.clear();
            state.mode = Mode::Normal;
        }
        other => {
            buf.apply(&other);
            state.filter.search = buf.input.clone();
            state.selected_card = 0;
            state.mode = Mode::Search { buf };
        }
    }
}

fn handle_edit<S: Store, R: UserResolver>(
    service: &mut BoardService<S, R>,
    state: &mut AppState,
    snapshot: &Snapshot,
    card_id: CardId,
    mut buf: TextBuffer,
    action: Action,
    now: DateTime<Utc>,
) -> Result<(), BoardError> {
    match action {
        Action::InputCancel => {
            if snapshot.card(&card_id).is_some_and(Card::is_running) {
                state.notify("Timer is running: press Enter to save the title");
            } else {
                state.mode = Mode::Normal;
            }
        }
        Action::InputConfirm => {
            let edit = CardEdit {
                title: Some(buf.input.clone()),
                ..Default::default()
            };
            service.update_card(&card_id, edit, now)?;
            state.mode = Mode::Normal;
        }
        other => {
            buf.apply(&other);
            state.mode = Mode::Edit { card_id, buf };
        }
    }
    Ok(())
}

fn handle_confirm<S: Store, R: UserResolver>(
    service: &mut BoardService<S, R>,
    state: &mut AppState,
    card_id: CardId,
    action: Action,
    now: DateTime<Utc>,
) -> Result<(), BoardError> {
    match action {
        Action::Confirm => {
            state.mode = Mode::Normal;
            service.delete_cards(&[card_id], now)?;
        }
        Action::Deny => state.mode = Mode::Normal,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::store::{FixedUser, MemoryStore};
    use crate::board::UserId;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    type TestService = BoardService<MemoryStore, FixedUser>;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn setup() -> (TestService, EventBuffer, AppState) {
        let mut service = BoardService::new(MemoryStore::new(), FixedUser(Some(UserId::new("ana"))));
        let events = EventBuffer::default();
        service.add_sink(events.clone());
        service.ensure_defaults(at(0)).unwrap();
        (service, events, AppState::new())
    }

    fn press(service: &mut TestService, events: &EventBuffer, state: &mut AppState, action: Action) {
        process_action(service, events, state, action, at(60)).unwrap();
    }

    fn type_text(service: &mut TestService, events: &EventBuffer, state: &mut AppState, text: &str) {
        for c in text.chars() {
            press(service, events, state, Action::InputChar(c));
        }
    }

    fn column_titles(service: &TestService, column: usize) -> Vec<String> {
        let snapshot = service.snapshot().unwrap();
        let col = snapshot.layout().visible_columns()[column].clone();
        snapshot
            .column_cards(&col.id)
            .iter()
            .map(|c| c.title.clone())
            .collect()
    }

    #[test]
    fn text_buffer_edits_at_cursor() {
        let mut buf = TextBuffer::new("héllo world".into());
        buf.delete_word();
        assert_eq!(buf.input, "héllo ");
        buf.home();
        buf.move_right();
        buf.insert('X');
        assert_eq!(buf.input, "hXéllo ");
        buf.end();
        buf.backspace();
        assert_eq!(buf.input, "hXéllo");
        assert_eq!(buf.cursor, 6);
    }

    #[test]
    fn quick_create_adds_to_focused_column() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::NewCard);
        type_text(&mut service, &events, &mut state, "Write tests");
        press(&mut service, &events, &mut state, Action::InputConfirm);
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(column_titles(&service, 0).last().map(String::as_str), Some("Write tests"));
        assert_eq!(state.selected_card, 1);
    }

    #[test]
    fn quick_create_cycles_to_draft() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::NewCard);
        for _ in 0..4 {
            press(&mut service, &events, &mut state, Action::CycleTarget);
        }
        assert!(matches!(state.mode, Mode::QuickCreate { target: None, .. }));
        type_text(&mut service, &events, &mut state, "Someday");
        press(&mut service, &events, &mut state, Action::InputConfirm);
        assert_eq!(state.drafts.len(), 1);
        assert_eq!(column_titles(&service, 0).len(), 1);
    }

    #[test]
    fn digit_promotes_focused_draft() {
        let (mut service, events, mut state) = setup();
        state.drafts.add(Draft::titled("Idea"));
        press(&mut service, &events, &mut state, Action::ToggleTray);
        press(&mut service, &events, &mut state, Action::MoveToVisibleColumn(2));
        assert!(state.drafts.is_empty());
        assert_eq!(column_titles(&service, 2).last().map(String::as_str), Some("Idea"));
        assert_eq!(state.focused_column, 2);
        assert!(!state.tray_focused);
    }

    #[test]
    fn digit_moves_are_blocked_while_filtering() {
        let (mut service, events, mut state) = setup();
        state.filter.search = "product".into();
        press(&mut service, &events, &mut state, Action::MoveToVisibleColumn(3));
        assert_eq!(column_titles(&service, 0).len(), 1);
        assert_eq!(state.notification_level, NotificationLevel::Error);
    }

    #[test]
    fn digit_for_own_column_leaves_order_untouched() {
        let (mut service, events, mut state) = setup();
        let todo = service.snapshot().unwrap().layout().visible_columns()[0].id.clone();
        service.create_card(CardInput::titled("second"), &todo, at(1)).unwrap();
        state.selected_card = 0;
        let writes = service.store().write_count();
        press(&mut service, &events, &mut state, Action::MoveToVisibleColumn(0));
        assert_eq!(column_titles(&service, 0), vec!["Define product promise", "second"]);
        assert_eq!(service.store().write_count(), writes);
        assert_eq!(state.selected_card, 0);
    }

    #[test]
    fn full_focus_column_rejects_with_notice() {
        let (mut service, events, mut state) = setup();
        let snapshot = service.snapshot().unwrap();
        let focus = snapshot.layout().focus().unwrap().clone();
        for i in 0..4 {
            service.create_card(CardInput::titled(format!("f{i}")), &focus, at(1)).unwrap();
        }
        events.drain();
        press(&mut service, &events, &mut state, Action::MoveToVisibleColumn(1));
        assert_eq!(column_titles(&service, 0), vec!["Define product promise"]);
        assert_eq!(state.notification_level, NotificationLevel::Error);
        assert!(state.notification.as_deref().unwrap_or("").contains("max capacity (5)"));
    }

    #[test]
    fn moving_into_done_celebrates() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::MoveToVisibleColumn(3));
        assert_eq!(state.focused_column, 3);
        assert!(state.notification.as_deref().unwrap_or("").starts_with("Done:"));
    }

    #[test]
    fn escape_is_suppressed_while_timer_runs() {
        let (mut service, events, mut state) = setup();
        state.focused_column = 1;
        press(&mut service, &events, &mut state, Action::ToggleTimer);
        press(&mut service, &events, &mut state, Action::EditTitle);
        press(&mut service, &events, &mut state, Action::InputCancel);
        assert!(matches!(state.mode, Mode::Edit { .. }));

        type_text(&mut service, &events, &mut state, "!");
        press(&mut service, &events, &mut state, Action::InputConfirm);
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(column_titles(&service, 1), vec!["Design the first-run onboarding!"]);
    }

    #[test]
    fn escape_closes_edit_when_idle() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::EditTitle);
        press(&mut service, &events, &mut state, Action::InputCancel);
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn timer_outside_focus_is_refused() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::ToggleTimer);
        assert_eq!(state.notification_level, NotificationLevel::Error);
        assert!(service.snapshot().unwrap().running_card().is_none());
    }

    #[test]
    fn tag_filter_follows_focused_card() {
        let (mut service, events, mut state) = setup();
        let todo = service.snapshot().unwrap().layout().visible_columns()[0].id.clone();
        let mut input = CardInput::titled("Rotate keys");
        input.tags = vec!["ops".into()];
        service.create_card(input, &todo, at(1)).unwrap();
        state.selected_card = 1;

        press(&mut service, &events, &mut state, Action::FilterByTag);
        assert_eq!(state.filter.tags, vec!["ops".to_string()]);
        assert_eq!(column_titles(&service, 0).len(), 2);
        let snapshot = service.snapshot().unwrap();
        let todo = snapshot.layout().visible_columns()[0].clone();
        assert_eq!(visible_cards(&snapshot, &todo, &state.filter).len(), 1);

        press(&mut service, &events, &mut state, Action::ClearFilters);
        assert!(!state.filter.is_active());
    }

    #[test]
    fn search_filters_live_and_escape_clears() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::StartSearch);
        type_text(&mut service, &events, &mut state, "ship");
        assert_eq!(state.filter.search, "ship");
        let snapshot = service.snapshot().unwrap();
        let todo = snapshot.layout().visible_columns()[0].clone();
        assert!(visible_cards(&snapshot, &todo, &state.filter).is_empty());
        press(&mut service, &events, &mut state, Action::InputCancel);
        assert!(!state.filter.is_active());
    }

    #[test]
    fn park_and_unpark_through_tray() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::ParkCard);
        assert!(column_titles(&service, 0).is_empty());
        let snapshot = service.snapshot().unwrap();
        assert_eq!(tray_items(&snapshot, &state.drafts).len(), 1);

        press(&mut service, &events, &mut state, Action::ToggleTray);
        press(&mut service, &events, &mut state, Action::ParkCard);
        assert_eq!(column_titles(&service, 0), vec!["Define product promise"]);
    }

    #[test]
    fn delete_asks_first() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::DeleteCard);
        assert!(matches!(state.mode, Mode::Confirm { .. }));
        press(&mut service, &events, &mut state, Action::Deny);
        assert_eq!(column_titles(&service, 0).len(), 1);

        press(&mut service, &events, &mut state, Action::DeleteCard);
        press(&mut service, &events, &mut state, Action::Confirm);
        assert!(column_titles(&service, 0).is_empty());
        assert_eq!(state.notification.as_deref(), Some("Card deleted"));
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let (mut service, events, mut state) = setup();
        press(&mut service, &events, &mut state, Action::FocusPrevColumn);
        assert_eq!(state.focused_column, 0);
        for _ in 0..6 {
            press(&mut service, &events, &mut state, Action::FocusNextColumn);
        }
        assert_eq!(state.focused_column, 3);
        press(&mut service, &events, &mut state, Action::SelectNextCard);
        assert_eq!(state.selected_card, 0);
    }
}
