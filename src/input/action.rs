/// All possible semantic actions on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Navigation
    FocusPrevColumn,
    FocusNextColumn,
    SelectPrevCard,
    SelectNextCard,
    /// Switch focus between the columns and the tray (drafts, parked cards).
    ToggleTray,

    // Card actions
    NewCard,
    /// Move the focused card, or promote the focused draft, to the Nth
    /// visible column (zero-based).
    MoveToVisibleColumn(usize),
    ToggleTimer,
    ArchiveCard,
    ParkCard,
    EditTitle,
    DeleteCard,
    CyclePriority,

    // Search & filter
    StartSearch,
    /// Toggle the focused card's first tag in the tag filter.
    FilterByTag,
    ClearFilters,

    Quit,

    // Input modal
    InputConfirm,
    InputCancel,
    InputChar(char),
    InputBackspace,
    InputLeft,
    InputRight,
    InputHome,
    InputEnd,
    InputDeleteWord,
    /// Quick-create: next target column, wrapping through "draft".
    CycleTarget,

    // Confirmation
    Confirm,
    Deny,

    // No-op
    None,
}
