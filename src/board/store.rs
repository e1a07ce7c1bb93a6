//! The document store the board runs on.
//!
//! Everything is partitioned by [`UserId`]: reads only see the caller's
//! documents and writes to someone else's documents are rejected. Each
//! single-document patch is atomic; [`Store::apply_order_updates`] checks the
//! whole batch before writing any of it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::ordering::OrderUpdate;
use super::storage::StorageError;
use super::{slugify, Card, CardId, CardPatch, Column, ColumnId, ColumnPatch, NewCard, NewColumn, UserId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not authorized")]
    Unauthorized,
    #[error("no such document: {0}")]
    MissingDocument(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Resolves who is using the board right now.
pub trait UserResolver {
    fn current_user(&self) -> Option<UserId>;
}

/// A resolver that always answers the same thing.
#[derive(Debug, Clone)]
pub struct FixedUser(pub Option<UserId>);

impl UserResolver for FixedUser {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}

pub trait Store {
    /// Columns owned by `user`, sorted by order then id.
    fn list_columns(&self, user: &UserId) -> Result<Vec<Column>, StoreError>;

    /// Cards owned by `user`, sorted by column, order, then id.
    fn list_cards(&self, user: &UserId, include_archived: bool) -> Result<Vec<Card>, StoreError>;

    /// `Ok(None)` if the card does not exist, `Unauthorized` if it is someone else's.
    fn get_card(&self, user: &UserId, id: &CardId) -> Result<Option<Card>, StoreError>;

    fn get_column(&self, user: &UserId, id: &ColumnId) -> Result<Option<Column>, StoreError>;

    fn insert_card(&mut self, user: &UserId, card: NewCard) -> Result<CardId, StoreError>;

    fn patch_card(&mut self, user: &UserId, id: &CardId, patch: &CardPatch) -> Result<(), StoreError>;

    fn delete_card(&mut self, user: &UserId, id: &CardId) -> Result<(), StoreError>;

    fn insert_column(&mut self, user: &UserId, column: NewColumn) -> Result<ColumnId, StoreError>;

    fn patch_column(&mut self, user: &UserId, id: &ColumnId, patch: &ColumnPatch) -> Result<(), StoreError>;

    /// Apply a reorder batch. Every card and target column is checked first,
    /// so an unauthorized or stale entry aborts before anything is written.
    fn apply_order_updates(
        &mut self,
        user: &UserId,
        updates: &[OrderUpdate],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        for update in updates {
            if self.get_card(user, &update.card_id)?.is_none() {
                return Err(StoreError::MissingDocument(update.card_id.to_string()));
            }
            if let Some(ref column_id) = update.column_id {
                if self.get_column(user, column_id)?.is_none() {
                    return Err(StoreError::MissingDocument(column_id.to_string()));
                }
            }
        }
        for update in updates {
            let patch = CardPatch {
                order: Some(update.order),
                column_id: update.column_id.clone(),
                ..Default::default()
            }
            .touched(now);
            self.patch_card(user, &update.card_id, &patch)?;
        }
        Ok(())
    }
}

/// In-process store. Also the document set behind the file-backed store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    columns: BTreeMap<ColumnId, Column>,
    cards: BTreeMap<CardId, Card>,
    next_card_id: u32,
    writes: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), 1)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(columns: Vec<Column>, cards: Vec<Card>, next_card_id: u32) -> Self {
        Self {
            columns: columns.into_iter().map(|c| (c.id.clone(), c)).collect(),
            cards: cards.into_iter().map(|c| (c.id.clone(), c)).collect(),
            next_card_id,
            writes: 0,
        }
    }

    pub fn next_card_id(&self) -> u32 {
        self.next_card_id
    }

    /// Number of successful write calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Direct lookup, ignoring ownership.
    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    /// All columns of every owner, sorted by order then id.
    pub fn all_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.values().collect();
        columns.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        columns
    }

    fn owned_card(&self, user: &UserId, id: &CardId) -> Result<Option<&Card>, StoreError> {
        match self.cards.get(id) {
            Some(card) if card.owner != *user => Err(StoreError::Unauthorized),
            other => Ok(other),
        }
    }

    fn owned_column(&self, user: &UserId, id: &ColumnId) -> Result<Option<&Column>, StoreError> {
        match self.columns.get(id) {
            Some(column) if column.owner != *user => Err(StoreError::Unauthorized),
            other => Ok(other),
        }
    }

    /// The id [`Store::insert_column`] would give a column titled `title`.
    pub(crate) fn unique_column_id(&self, title: &str) -> ColumnId {
        let base = slugify(title);
        let mut candidate = base.clone();
        let mut n = 2;
        while self.columns.contains_key(&ColumnId::new(candidate.as_str())) {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        ColumnId::new(candidate)
    }
}

impl Store for MemoryStore {
    fn list_columns(&self, user: &UserId) -> Result<Vec<Column>, StoreError> {
        Ok(self
            .all_columns()
            .into_iter()
            .filter(|c| c.owner == *user)
            .cloned()
            .collect())
    }

    fn list_cards(&self, user: &UserId, include_archived: bool) -> Result<Vec<Card>, StoreError> {
        let mut cards: Vec<Card> = self
            .cards
            .values()
            .filter(|c| c.owner == *user && (include_archived || !c.archived))
            .cloned()
            .collect();
        cards.sort_by(|a, b| {
            a.column_id
                .cmp(&b.column_id)
                .then(a.order.cmp(&b.order))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(cards)
    }

    fn get_card(&self, user: &UserId, id: &CardId) -> Result<Option<Card>, StoreError> {
        Ok(self.owned_card(user, id)?.cloned())
    }

    fn get_column(&self, user: &UserId, id: &ColumnId) -> Result<Option<Column>, StoreError> {
        Ok(self.owned_column(user, id)?.cloned())
    }

    fn insert_card(&mut self, user: &UserId, new: NewCard) -> Result<CardId, StoreError> {
        if self.owned_column(user, &new.column_id)?.is_none() {
            return Err(StoreError::MissingDocument(new.column_id.to_string()));
        }
        let id = CardId::new(self.next_card_id.to_string());
        self.next_card_id += 1;

        let mut card = Card::new(
            id.clone(),
            user.clone(),
            new.title,
            new.column_id,
            new.order,
            new.created_at,
        );
        card.description = new.description;
        card.priority = new.priority;
        card.due_date = new.due_date;
        card.tags = new.tags;
        self.cards.insert(id.clone(), card);
        self.writes += 1;
        Ok(id)
    }

    fn patch_card(&mut self, user: &UserId, id: &CardId, patch: &CardPatch) -> Result<(), StoreError> {
        if self.owned_card(user, id)?.is_none() {
            return Err(StoreError::MissingDocument(id.to_string()));
        }
        if let Some(ref column_id) = patch.column_id {
            if self.owned_column(user, column_id)?.is_none() {
                return Err(StoreError::MissingDocument(column_id.to_string()));
            }
        }
        if let Some(card) = self.cards.get_mut(id) {
            card.apply(patch);
        }
        self.writes += 1;
        Ok(())
    }

    fn delete_card(&mut self, user: &UserId, id: &CardId) -> Result<(), StoreError> {
        if self.owned_card(user, id)?.is_none() {
            return Err(StoreError::MissingDocument(id.to_string()));
        }
        self.cards.remove(id);
        self.writes += 1;
        Ok(())
    }

    fn insert_column(&mut self, user: &UserId, new: NewColumn) -> Result<ColumnId, StoreError> {
        let id = self.unique_column_id(&new.title);
        self.columns.insert(
            id.clone(),
            Column {
                id: id.clone(),
                owner: user.clone(),
                title: new.title,
                order: new.order,
                role: new.role,
                hidden: false,
            },
        );
        self.writes += 1;
        Ok(id)
    }

    fn patch_column(&mut self, user: &UserId, id: &ColumnId, patch: &ColumnPatch) -> Result<(), StoreError> {
        if self.owned_column(user, id)?.is_none() {
            return Err(StoreError::MissingDocument(id.to_string()));
        }
        if let Some(column) = self.columns.get_mut(id) {
            if let Some(ref title) = patch.title {
                column.title = title.clone();
            }
            if let Some(order) = patch.order {
                column.order = order;
            }
            if let Some(role) = patch.role {
                column.role = role;
            }
            if let Some(hidden) = patch.hidden {
                column.hidden = hidden;
            }
        }
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Priority;

    fn new_column(title: &str, order: i64) -> NewColumn {
        NewColumn {
            title: title.into(),
            order,
            role: None,
        }
    }

    fn new_card(title: &str, column: &ColumnId) -> NewCard {
        NewCard {
            title: title.into(),
            description: None,
            column_id: column.clone(),
            order: 1000,
            priority: Priority::High,
            due_date: None,
            tags: vec!["x".into()],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ids_are_sequential_and_slugged() {
        let me = UserId::from("me");
        let mut store = MemoryStore::new();
        let todo = store.insert_column(&me, new_column("To Do", 1000)).unwrap();
        let dup = store.insert_column(&me, new_column("to-do", 2000)).unwrap();
        assert_eq!(todo.as_str(), "to-do");
        assert_eq!(dup.as_str(), "to-do-2");

        let first = store.insert_card(&me, new_card("a", &todo)).unwrap();
        let second = store.insert_card(&me, new_card("b", &todo)).unwrap();
        assert_eq!(first.as_str(), "1");
        assert_eq!(second.as_str(), "2");
        assert_eq!(store.next_card_id(), 3);
    }

    #[test]
    fn foreign_documents_are_unauthorized() {
        let me = UserId::from("me");
        let other = UserId::from("other");
        let mut store = MemoryStore::new();
        let col = store.insert_column(&me, new_column("Todo", 1000)).unwrap();
        let id = store.insert_card(&me, new_card("mine", &col)).unwrap();

        assert!(matches!(store.get_card(&other, &id), Err(StoreError::Unauthorized)));
        assert!(matches!(
            store.patch_card(&other, &id, &CardPatch::default()),
            Err(StoreError::Unauthorized)
        ));
        assert!(matches!(
            store.insert_card(&other, new_card("sneaky", &col)),
            Err(StoreError::Unauthorized)
        ));
        assert!(store.list_cards(&other, true).unwrap().is_empty());
        assert!(store.list_columns(&other).unwrap().is_empty());
    }

    #[test]
    fn archived_cards_are_filtered_on_request() {
        let me = UserId::from("me");
        let mut store = MemoryStore::new();
        let col = store.insert_column(&me, new_column("Todo", 1000)).unwrap();
        let id = store.insert_card(&me, new_card("a", &col)).unwrap();
        store
            .patch_card(&me, &id, &CardPatch { archived: Some(true), ..Default::default() })
            .unwrap();
        assert!(store.list_cards(&me, false).unwrap().is_empty());
        assert_eq!(store.list_cards(&me, true).unwrap().len(), 1);
    }

    #[test]
    fn batch_with_missing_card_writes_nothing() {
        let me = UserId::from("me");
        let mut store = MemoryStore::new();
        let col = store.insert_column(&me, new_column("Todo", 1000)).unwrap();
        let id = store.insert_card(&me, new_card("a", &col)).unwrap();
        let before = store.write_count();

        let updates = vec![
            OrderUpdate { card_id: id.clone(), order: 5000, column_id: None },
            OrderUpdate { card_id: "404".into(), order: 6000, column_id: None },
        ];
        let err = store.apply_order_updates(&me, &updates, Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::MissingDocument(_)));
        assert_eq!(store.write_count(), before);
        assert_eq!(store.card(&id).unwrap().order, 1000);
    }
}
