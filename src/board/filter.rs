use std::collections::HashMap;

use chrono::NaiveDate;

use super::Card;

/// What the board is currently narrowed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub search: String,
    /// Any-of: a card matches if it carries at least one of these.
    pub tags: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl CardFilter {
    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty()
            || !self.tags.is_empty()
            || self.from.is_some()
            || self.to.is_some()
    }

    /// Whether `card` shows up in the normal (non-archive) view.
    pub fn matches(&self, card: &Card) -> bool {
        if card.archived {
            return false;
        }

        let needle = self.search.trim().to_lowercase();
        if !needle.is_empty() {
            let hit = card.title.to_lowercase().contains(&needle)
                || card
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
                || card.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if !self.tags.is_empty() && !card.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }

        if self.from.is_some() || self.to.is_some() {
            let Some(due) = card.due_date else {
                return false;
            };
            if self.from.is_some_and(|from| due < from) || self.to.is_some_and(|to| due > to) {
                return false;
            }
        }

        true
    }

    /// Toggle one tag in or out of the tag set.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag.to_string());
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Collect all unique tags across `cards`, with counts, sorted by name.
pub fn all_tags<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for card in cards {
        for tag in &card.tags {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }
    let mut tags: Vec<_> = counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    tags.sort();
    tags
}
