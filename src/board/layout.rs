//! Point-in-time view of one user's board.
//!
//! Commands never work against a live collection: they take a [`Snapshot`],
//! decide, and hand the store a batch.

use super::capacity::{self, CapacityGuard};
use super::ordering::{append_order, Slot};
use super::{Card, CardId, Column, ColumnId, ColumnRole};

/// Only the first columns by order are laid out on the board.
pub const MAX_VISIBLE_COLUMNS: usize = 4;

const FOCUS_POSITION: usize = 1;
const DONE_POSITION: usize = 3;

/// Columns in display order with their roles resolved.
#[derive(Debug, Clone, Default)]
pub struct BoardLayout {
    columns: Vec<Column>,
    focus: Option<ColumnId>,
    done: Option<ColumnId>,
}

impl BoardLayout {
    /// Resolve roles. An explicit role wins; otherwise the focus column is
    /// the 2nd of the base columns and the done column the 4th, unless that
    /// column explicitly holds the other role.
    pub fn resolve(mut columns: Vec<Column>) -> Self {
        columns.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        let by_role = |role: ColumnRole, other: ColumnRole, fallback: usize| {
            columns
                .iter()
                .find(|c| c.role == Some(role))
                .or_else(|| {
                    columns
                        .iter()
                        .take(MAX_VISIBLE_COLUMNS)
                        .nth(fallback)
                        .filter(|c| c.role != Some(other))
                })
                .map(|c| c.id.clone())
        };
        let focus = by_role(ColumnRole::Focus, ColumnRole::Done, FOCUS_POSITION);
        let done = by_role(ColumnRole::Done, ColumnRole::Focus, DONE_POSITION);
        Self { columns, focus, done }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The first [`MAX_VISIBLE_COLUMNS`] columns, hidden ones included.
    pub fn base_columns(&self) -> &[Column] {
        let n = self.columns.len().min(MAX_VISIBLE_COLUMNS);
        &self.columns[..n]
    }

    /// Base columns the user has not hidden. Keys `1`-`4` index this list.
    pub fn visible_columns(&self) -> Vec<&Column> {
        self.base_columns().iter().filter(|c| !c.hidden).collect()
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == *id)
    }

    pub fn focus(&self) -> Option<&ColumnId> {
        self.focus.as_ref()
    }

    pub fn done(&self) -> Option<&ColumnId> {
        self.done.as_ref()
    }

    pub fn is_focus(&self, id: &ColumnId) -> bool {
        self.focus.as_ref() == Some(id)
    }

    pub fn is_done(&self, id: &ColumnId) -> bool {
        self.done.as_ref() == Some(id)
    }

    pub fn role_of(&self, id: &ColumnId) -> Option<ColumnRole> {
        if self.is_focus(id) {
            Some(ColumnRole::Focus)
        } else if self.is_done(id) {
            Some(ColumnRole::Done)
        } else {
            None
        }
    }
}

/// Columns and cards observed at one instant.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    layout: BoardLayout,
    /// Every card of the user, archived ones included.
    cards: Vec<Card>,
    focus_capacity: usize,
}

impl Snapshot {
    pub fn new(columns: Vec<Column>, cards: Vec<Card>, focus_capacity: usize) -> Self {
        Self {
            layout: BoardLayout::resolve(columns),
            cards,
            focus_capacity,
        }
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == *id)
    }

    /// Cards holding a slot in `column`, in position order.
    pub fn column_cards(&self, column: &ColumnId) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self
            .cards
            .iter()
            .filter(|c| c.holds_slot() && c.column_id == *column)
            .collect();
        cards.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        cards
    }

    pub fn column_slots(&self, column: &ColumnId) -> Vec<Slot> {
        self.column_cards(column)
            .into_iter()
            .map(|c| Slot::new(c.id.clone(), c.order))
            .collect()
    }

    /// Parked cards, oldest first.
    pub fn overflow_cards(&self) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self
            .cards
            .iter()
            .filter(|c| c.overflowed && !c.archived)
            .collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        cards
    }

    /// Archived cards, most recently touched first.
    pub fn archived_cards(&self) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.iter().filter(|c| c.archived).collect();
        cards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        cards
    }

    pub fn focus_count(&self) -> usize {
        self.layout
            .focus()
            .map_or(0, |focus| capacity::focus_count(&self.cards, focus))
    }

    pub fn running_card(&self) -> Option<&Card> {
        self.cards
            .iter()
            .filter(|c| c.is_running())
            .max_by_key(|c| c.timer_started_at)
    }

    /// Order key for a card appended to the end of `column`.
    pub fn next_order(&self, column: &ColumnId) -> i64 {
        append_order(self.column_cards(column).into_iter().map(|c| c.order))
    }

    pub fn capacity_guard(&self) -> CapacityGuard {
        CapacityGuard::new(self.layout.focus().cloned(), self.focus_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    fn column(id: &str, order: i64) -> Column {
        Column {
            id: id.into(),
            owner: "me".into(),
            title: id.to_uppercase(),
            order,
            role: None,
            hidden: false,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn card(id: &str, col: &str, order: i64) -> Card {
        Card::new(id.into(), "me".into(), id.into(), col.into(), order, at(0))
    }

    fn ids<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Vec<&'a str> {
        cards.into_iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn roles_fall_back_to_positions() {
        let layout = BoardLayout::resolve(vec![
            column("done", 4000),
            column("todo", 1000),
            column("doing", 2000),
            column("review", 3000),
        ]);
        assert_eq!(layout.focus(), Some(&ColumnId::from("doing")));
        assert_eq!(layout.done(), Some(&ColumnId::from("done")));
    }

    #[test]
    fn explicit_roles_win() {
        let mut wip = column("wip", 3000);
        wip.role = Some(ColumnRole::Focus);
        let layout = BoardLayout::resolve(vec![column("a", 1000), column("b", 2000), wip]);
        assert!(layout.is_focus(&"wip".into()));
        assert_eq!(layout.done(), None);
        assert_eq!(layout.role_of(&"wip".into()), Some(ColumnRole::Focus));
    }

    #[test]
    fn fallback_skips_column_holding_the_other_role() {
        let mut last = column("last", 4000);
        last.role = Some(ColumnRole::Focus);
        let layout = BoardLayout::resolve(vec![column("a", 1000), column("b", 2000), column("c", 3000), last]);
        assert!(layout.is_focus(&"last".into()));
        assert_eq!(layout.done(), None);

        let mut second = column("b", 2000);
        second.role = Some(ColumnRole::Done);
        let layout = BoardLayout::resolve(vec![column("a", 1000), second, column("c", 3000)]);
        assert!(layout.is_done(&"b".into()));
        assert_eq!(layout.focus(), None);
    }

    #[test]
    fn single_column_board_has_no_focus() {
        let layout = BoardLayout::resolve(vec![column("only", 1000)]);
        assert_eq!(layout.focus(), None);
    }

    #[test]
    fn visible_columns_cap_and_skip_hidden() {
        let mut hidden = column("b", 2000);
        hidden.hidden = true;
        let layout = BoardLayout::resolve(vec![
            column("a", 1000),
            hidden,
            column("c", 3000),
            column("d", 4000),
            column("e", 5000),
        ]);
        assert_eq!(layout.base_columns().len(), 4);
        let visible: Vec<&str> = layout.visible_columns().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(visible, vec!["a", "c", "d"]);
        // Hiding does not shift roles.
        assert!(layout.is_focus(&"b".into()));
    }

    #[test]
    fn column_cards_exclude_trays_and_sort_with_ties() {
        let mut parked = card("p", "todo", 500);
        parked.overflowed = true;
        let mut gone = card("g", "todo", 600);
        gone.archived = true;
        let mut late = card("late", "todo", 2000);
        late.created_at = at(10);
        let snapshot = Snapshot::new(
            vec![column("todo", 1000)],
            vec![late, card("early", "todo", 2000), card("first", "todo", 1000), parked, gone],
            5,
        );
        assert_eq!(ids(snapshot.column_cards(&"todo".into())), vec!["first", "early", "late"]);
        assert_eq!(ids(snapshot.overflow_cards()), vec!["p"]);
        assert_eq!(ids(snapshot.archived_cards()), vec!["g"]);
        assert_eq!(snapshot.next_order(&"todo".into()), 3000);
        assert_eq!(snapshot.next_order(&"empty".into()), 1000);
    }

    #[test]
    fn focus_count_and_running_card() {
        let mut running = card("r", "doing", 1000);
        running.timer_started_at = Some(at(5));
        let snapshot = Snapshot::new(
            vec![column("todo", 1000), column("doing", 2000)],
            vec![running, card("x", "doing", 2000), card("y", "todo", 1000)],
            5,
        );
        assert_eq!(snapshot.focus_count(), 2);
        assert_eq!(snapshot.running_card().map(|c| c.id.as_str()), Some("r"));
        assert_eq!(snapshot.capacity_guard().limit(), 5);
    }
}
