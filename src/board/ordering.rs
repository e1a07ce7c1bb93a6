//! Position keys for cards inside a column.
//!
//! Every batch renumbers the affected sequences to `(position + 1) * 1000`,
//! so gaps are always restored and a stale sequence heals on the next write.
//! Nothing here touches storage: callers get a list of [`OrderUpdate`]s and
//! submit them to the store as one batch.

use super::{CardId, ColumnId};

/// Distance between neighbouring order keys after a renumber.
pub const ORDER_STEP: i64 = 1000;

/// A card as it currently sits in a column sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: CardId,
    pub order: i64,
}

impl Slot {
    pub fn new(id: impl Into<CardId>, order: i64) -> Self {
        Self { id: id.into(), order }
    }
}

/// New position for one card; `column_id` is set only when the card changes column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub card_id: CardId,
    pub order: i64,
    pub column_id: Option<ColumnId>,
}

/// A drag/keyboard move, described against the sequences observed right now.
#[derive(Debug, Clone)]
pub struct MovePlan<'a> {
    /// The moving card with its current order key.
    pub card: &'a Slot,
    pub source_column: &'a ColumnId,
    /// Sequence the card is leaving. May not contain the card when it comes
    /// from a tray (overflow or archive) and so holds no slot yet.
    pub source: &'a [Slot],
    pub target_column: &'a ColumnId,
    /// Sequence the card is dropped into. Ignored for a same-column reorder.
    pub target: &'a [Slot],
    /// Insertion index in `target`, clamped to its length.
    pub index: usize,
}

/// Order key for the given zero-based position.
pub fn order_at(position: usize) -> i64 {
    (position as i64 + 1) * ORDER_STEP
}

/// Order key for a card appended after everything currently in a column.
pub fn append_order(existing: impl IntoIterator<Item = i64>) -> i64 {
    existing
        .into_iter()
        .max()
        .map_or(ORDER_STEP, |last| last + ORDER_STEP)
}

/// Compute the batch that realizes `plan`.
///
/// Only cards whose order or column actually changes are included, so a
/// drop that leaves the arrangement untouched yields an empty batch.
pub fn plan_move(plan: &MovePlan<'_>) -> Vec<OrderUpdate> {
    let source_index = plan.source.iter().position(|s| s.id == plan.card.id);

    if let Some(from) = source_index {
        if plan.source_column == plan.target_column {
            return reorder_within(plan.source, from, plan.index);
        }
    }

    let mut updates = Vec::new();
    let mut source: Vec<&Slot> = plan.source.iter().collect();
    if let Some(from) = source_index {
        source.remove(from);
        // Cross-column: the remaining source cards close the gap.
        updates.extend(renumber(&source, &plan.card.id, None));
    }

    let mut target: Vec<&Slot> = plan
        .target
        .iter()
        .filter(|s| s.id != plan.card.id)
        .collect();
    let index = plan.index.min(target.len());
    target.insert(index, plan.card);

    let column_change = (plan.source_column != plan.target_column).then_some(plan.target_column);
    updates.extend(renumber(&target, &plan.card.id, column_change));
    updates
}

fn reorder_within(sequence: &[Slot], from: usize, index: usize) -> Vec<OrderUpdate> {
    let mut to = index.min(sequence.len());
    if from < to {
        to -= 1;
    }
    if to == from {
        return Vec::new();
    }
    let mut seq: Vec<&Slot> = sequence.iter().collect();
    let moved = seq.remove(from);
    seq.insert(to, moved);
    renumber(&seq, &moved.id, None)
}

/// Renumber `seq` by position, keeping only entries that change.
fn renumber(seq: &[&Slot], moving: &CardId, column: Option<&ColumnId>) -> Vec<OrderUpdate> {
    seq.iter()
        .enumerate()
        .filter_map(|(position, slot)| {
            let order = order_at(position);
            let column_id = column.filter(|_| slot.id == *moving).cloned();
            if slot.order == order && column_id.is_none() {
                return None;
            }
            Some(OrderUpdate {
                card_id: slot.id.clone(),
                order,
                column_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spaced(ids: &[&str]) -> Vec<Slot> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Slot::new(*id, order_at(i)))
            .collect()
    }

    /// Apply a batch to a column snapshot and return the resulting (id, order) list, sorted.
    fn apply(seq: &[Slot], column: &ColumnId, all: &[(ColumnId, Slot)], updates: &[OrderUpdate]) -> Vec<(String, i64)> {
        let mut rows: Vec<(ColumnId, Slot)> = all.to_vec();
        for (col, slot) in seq.iter().map(|s| (column.clone(), s.clone())) {
            if !rows.iter().any(|(_, s)| s.id == slot.id) {
                rows.push((col, slot));
            }
        }
        for update in updates {
            let row = rows.iter_mut().find(|(_, s)| s.id == update.card_id).unwrap();
            row.1.order = update.order;
            if let Some(ref col) = update.column_id {
                row.0 = col.clone();
            }
        }
        let mut out: Vec<(String, i64)> = rows
            .into_iter()
            .filter(|(c, _)| c == column)
            .map(|(_, s)| (s.id.0, s.order))
            .collect();
        out.sort_by_key(|(_, order)| *order);
        out
    }

    #[test]
    fn move_last_card_to_front() {
        let todo = ColumnId::from("todo");
        let seq = spaced(&["x", "y", "z"]);
        let updates = plan_move(&MovePlan {
            card: &seq[2],
            source_column: &todo,
            source: &seq,
            target_column: &todo,
            target: &seq,
            index: 0,
        });
        assert_eq!(
            apply(&seq, &todo, &[], &updates),
            vec![("z".into(), 1000), ("x".into(), 2000), ("y".into(), 3000)]
        );
    }

    #[test]
    fn moving_down_accounts_for_removal() {
        let todo = ColumnId::from("todo");
        let seq = spaced(&["a", "b", "c", "d"]);
        // Dropped onto "c": lands just before it after "a" is removed.
        let updates = plan_move(&MovePlan {
            card: &seq[0],
            source_column: &todo,
            source: &seq,
            target_column: &todo,
            target: &seq,
            index: 2,
        });
        assert_eq!(
            apply(&seq, &todo, &[], &updates),
            vec![
                ("b".into(), 1000),
                ("a".into(), 2000),
                ("c".into(), 3000),
                ("d".into(), 4000)
            ]
        );
    }

    #[test]
    fn unchanged_position_yields_no_updates() {
        let todo = ColumnId::from("todo");
        let seq = spaced(&["a", "b", "c"]);
        for index in [1, 2] {
            let updates = plan_move(&MovePlan {
                card: &seq[1],
                source_column: &todo,
                source: &seq,
                target_column: &todo,
                target: &seq,
                index,
            });
            assert!(updates.is_empty(), "index {index} produced {updates:?}");
        }
    }

    #[test]
    fn reorder_renumbers_irregular_keys() {
        let todo = ColumnId::from("todo");
        let seq = vec![Slot::new("a", 5), Slot::new("b", 5), Slot::new("c", 17)];
        let updates = plan_move(&MovePlan {
            card: &seq[2],
            source_column: &todo,
            source: &seq,
            target_column: &todo,
            target: &seq,
            index: 1,
        });
        let result = apply(&seq, &todo, &[], &updates);
        let orders: Vec<i64> = result.iter().map(|(_, o)| *o).collect();
        assert_eq!(orders, vec![1000, 2000, 3000]);
        assert_eq!(result[1].0, "c");
    }

    #[test]
    fn cross_column_move_renumbers_both_sides() {
        let todo = ColumnId::from("todo");
        let doing = ColumnId::from("doing");
        let source = spaced(&["a", "b", "c"]);
        let target = spaced(&["p", "q"]);
        let updates = plan_move(&MovePlan {
            card: &source[0],
            source_column: &todo,
            source: &source,
            target_column: &doing,
            target: &target,
            index: 1,
        });

        let moved = updates.iter().find(|u| u.card_id.as_str() == "a").unwrap();
        assert_eq!(moved.column_id, Some(doing.clone()));
        assert_eq!(moved.order, 2000);
        assert!(updates
            .iter()
            .filter(|u| u.card_id.as_str() != "a")
            .all(|u| u.column_id.is_none()));

        let all: Vec<(ColumnId, Slot)> = source
            .iter()
            .map(|s| (todo.clone(), s.clone()))
            .chain(target.iter().map(|s| (doing.clone(), s.clone())))
            .collect();
        assert_eq!(
            apply(&[], &todo, &all, &updates),
            vec![("b".into(), 1000), ("c".into(), 2000)]
        );
        assert_eq!(
            apply(&[], &doing, &all, &updates),
            vec![("p".into(), 1000), ("a".into(), 2000), ("q".into(), 3000)]
        );
    }

    #[test]
    fn empty_target_inserts_at_zero() {
        let todo = ColumnId::from("todo");
        let done = ColumnId::from("done");
        let source = spaced(&["a"]);
        let updates = plan_move(&MovePlan {
            card: &source[0],
            source_column: &todo,
            source: &source,
            target_column: &done,
            target: &[],
            index: 7,
        });
        assert_eq!(
            updates,
            vec![OrderUpdate {
                card_id: "a".into(),
                order: 1000,
                column_id: Some(done),
            }]
        );
    }

    #[test]
    fn card_from_tray_leaves_source_untouched() {
        let focus = ColumnId::from("focus");
        let parked = Slot::new("p", 9000);
        let seq = spaced(&["a", "b"]);
        let updates = plan_move(&MovePlan {
            card: &parked,
            source_column: &focus,
            source: &seq,
            target_column: &focus,
            target: &seq,
            index: 0,
        });
        assert_eq!(
            updates,
            vec![
                OrderUpdate { card_id: "p".into(), order: 1000, column_id: None },
                OrderUpdate { card_id: "a".into(), order: 2000, column_id: None },
                OrderUpdate { card_id: "b".into(), order: 3000, column_id: None },
            ]
        );
    }

    #[test]
    fn renumbering_is_strictly_spaced_for_every_drop() {
        let todo = ColumnId::from("todo");
        let seq = spaced(&["a", "b", "c", "d", "e"]);
        for from in 0..seq.len() {
            for index in 0..=seq.len() {
                let updates = plan_move(&MovePlan {
                    card: &seq[from],
                    source_column: &todo,
                    source: &seq,
                    target_column: &todo,
                    target: &seq,
                    index,
                });
                let orders: Vec<i64> = apply(&seq, &todo, &[], &updates)
                    .into_iter()
                    .map(|(_, o)| o)
                    .collect();
                assert_eq!(orders, vec![1000, 2000, 3000, 4000, 5000]);
            }
        }
    }

    #[test]
    fn append_order_follows_last_key() {
        assert_eq!(append_order([]), 1000);
        assert_eq!(append_order([1000, 4500, 2000]), 5500);
    }
}
