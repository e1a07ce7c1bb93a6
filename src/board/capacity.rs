use super::{Card, ColumnId};

/// Default cap on cards holding a slot in the focus column.
pub const DEFAULT_FOCUS_CAPACITY: usize = 5;

/// Decides whether a card may enter the focus column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityGuard {
    focus: Option<ColumnId>,
    limit: usize,
}

impl CapacityGuard {
    pub fn new(focus: Option<ColumnId>, limit: usize) -> Self {
        Self { focus, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether a card coming from `source` may land in `target`.
    ///
    /// `source` is `None` when the card holds no column slot yet (a new card,
    /// a draft, or a card coming back from the overflow/archive tray).
    /// `focus_count` must be counted right before this call.
    pub fn admit(&self, source: Option<&ColumnId>, target: &ColumnId, focus_count: usize) -> bool {
        let Some(ref focus) = self.focus else {
            return true;
        };
        if target != focus || source == Some(target) {
            return true;
        }
        focus_count < self.limit
    }
}

/// Cards currently occupying a slot in `focus`: not archived, not overflowed.
pub fn focus_count<'a>(cards: impl IntoIterator<Item = &'a Card>, focus: &ColumnId) -> usize {
    cards
        .into_iter()
        .filter(|card| card.holds_slot() && card.column_id == *focus)
        .count()
}
