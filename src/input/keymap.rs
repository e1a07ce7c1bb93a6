use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::action::Action;
use crate::app::Mode;

/// Map a key event to a semantic action based on current mode.
pub fn map_key(key: KeyEvent, mode: &Mode) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    match mode {
        Mode::Normal => map_normal(key),
        Mode::QuickCreate { .. } => match key.code {
            KeyCode::Tab => Action::CycleTarget,
            _ => map_input(key),
        },
        Mode::Search { .. } | Mode::Edit { .. } => map_input(key),
        Mode::Confirm { .. } => map_confirm(key),
    }
}

fn map_normal(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => Action::FocusPrevColumn,
        KeyCode::Char('l') | KeyCode::Right => Action::FocusNextColumn,
        KeyCode::Char('j') | KeyCode::Down => Action::SelectNextCard,
        KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevCard,
        KeyCode::Tab => Action::ToggleTray,
        KeyCode::Char('n') => Action::NewCard,
        KeyCode::Char('/') => Action::StartSearch,
        KeyCode::Char('#') => Action::FilterByTag,
        KeyCode::Char(c @ '1'..='4') => Action::MoveToVisibleColumn(c as usize - '1' as usize),
        KeyCode::Char('t') => Action::ToggleTimer,
        KeyCode::Char('a') => Action::ArchiveCard,
        KeyCode::Char('o') => Action::ParkCard,
        KeyCode::Char('e') => Action::EditTitle,
        KeyCode::Char('x') => Action::DeleteCard,
        KeyCode::Char('p') => Action::CyclePriority,
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => Action::ClearFilters,
        _ => Action::None,
    }
}

fn map_input(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::InputConfirm,
        KeyCode::Esc => Action::InputCancel,
        KeyCode::Backspace => Action::InputBackspace,
        KeyCode::Left => Action::InputLeft,
        KeyCode::Right => Action::InputRight,
        KeyCode::Home => Action::InputHome,
        KeyCode::End => Action::InputEnd,
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Action::InputDeleteWord
        }
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::InputHome,
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::InputEnd,
        KeyCode::Char(c) => Action::InputChar(c),
        _ => Action::None,
    }
}

fn map_confirm(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => Action::Confirm,
        KeyCode::Char('n') | KeyCode::Esc => Action::Deny,
        _ => Action::None,
    }
}

// ---------------------------------------------------------------------------
// Binding registry: what the status bar advertises.
// ---------------------------------------------------------------------------

/// A documented keybinding for display in hints.
pub struct Binding {
    pub key: &'static str,
    pub description: &'static str,
}

pub const NORMAL_BINDINGS: &[Binding] = &[
    Binding { key: "n", description: "new" },
    Binding { key: "1-4", description: "move" },
    Binding { key: "t", description: "timer" },
    Binding { key: "a", description: "archive" },
    Binding { key: "o", description: "park" },
    Binding { key: "e", description: "edit" },
    Binding { key: "x", description: "delete" },
    Binding { key: "Tab", description: "tray" },
    Binding { key: "/", description: "search" },
    Binding { key: "#", description: "tag" },
    Binding { key: "q", description: "quit" },
];

pub const QUICK_CREATE_BINDINGS: &[Binding] = &[
    Binding { key: "Enter", description: "create" },
    Binding { key: "Tab", description: "column" },
    Binding { key: "Esc", description: "cancel" },
];

pub const INPUT_BINDINGS: &[Binding] = &[
    Binding { key: "Enter", description: "apply" },
    Binding { key: "Esc", description: "cancel" },
];

pub const CONFIRM_BINDINGS: &[Binding] = &[
    Binding { key: "y", description: "yes" },
    Binding { key: "n", description: "no" },
];

/// Bindings to advertise in the given mode.
pub fn mode_bindings(mode: &Mode) -> &'static [Binding] {
    match mode {
        Mode::Normal => NORMAL_BINDINGS,
        Mode::QuickCreate { .. } => QUICK_CREATE_BINDINGS,
        Mode::Search { .. } | Mode::Edit { .. } => INPUT_BINDINGS,
        Mode::Confirm { .. } => CONFIRM_BINDINGS,
    }
}
