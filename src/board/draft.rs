use std::fmt;

use chrono::NaiveDate;

use super::Priority;

/// Client-side identity of a draft. Never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftId(String);

impl DraftId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A would-be card with no column yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub id: DraftId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    /// Raw comma-separated input, parsed on promotion.
    pub tags: String,
}

impl Draft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            id: DraftId::new(""),
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            due_date: None,
            tags: String::new(),
        }
    }
}

/// Drafts held in memory for the session, in creation order.
#[derive(Debug, Default)]
pub struct DraftTray {
    drafts: Vec<Draft>,
    next_id: u32,
}

impl DraftTray {
    /// Store `draft` under a fresh id and return it.
    pub fn add(&mut self, mut draft: Draft) -> DraftId {
        self.next_id += 1;
        draft.id = DraftId::new(format!("d{}", self.next_id));
        let id = draft.id.clone();
        self.drafts.push(draft);
        id
    }

    pub fn get(&self, id: &DraftId) -> Option<&Draft> {
        self.drafts.iter().find(|d| d.id == *id)
    }

    /// Remove a draft, e.g. once it has been promoted to a card.
    pub fn discard(&mut self, id: &DraftId) -> Option<Draft> {
        let pos = self.drafts.iter().position(|d| d.id == *id)?;
        Some(self.drafts.remove(pos))
    }

    pub fn drafts(&self) -> &[Draft] {
        &self.drafts
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}
