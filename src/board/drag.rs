//! Drag intents.
//!
//! The pointer layer names draggables and drop zones with plain strings:
//! `draft:<id>`, `overflow:<id>`, `archive:<id>`, a bare card id, and for
//! drop zones `column:<id>`, `archive`, `overflow` or a bare card id.
//! They are decoded once here.

use std::fmt;
use std::str::FromStr;

use super::draft::DraftId;
use super::{CardId, ColumnId};

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// A card sitting in a column.
    Card(CardId),
    Draft(DraftId),
    /// A card picked up from the overflow tray.
    OverflowCard(CardId),
    /// A card picked up from the archive tray.
    ArchivedCard(CardId),
}

impl DragSource {
    /// The persisted card behind this source, if any.
    pub fn card_id(&self) -> Option<&CardId> {
        match self {
            Self::Card(id) | Self::OverflowCard(id) | Self::ArchivedCard(id) => Some(id),
            Self::Draft(_) => None,
        }
    }

    /// Whether the card comes from a tray and so holds no column slot.
    pub fn from_tray(&self) -> bool {
        matches!(self, Self::OverflowCard(_) | Self::ArchivedCard(_))
    }
}

/// Where it is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// The column's empty area: always appends to the end.
    Column(ColumnId),
    /// On top of a card: takes that card's position.
    Card(CardId),
    Archive,
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid drag id {0:?}")]
pub struct ParseDragError(String);

fn id_after<'a>(s: &'a str, prefix: &str) -> Result<Option<&'a str>, ParseDragError> {
    match s.strip_prefix(prefix) {
        Some("") => Err(ParseDragError(s.to_string())),
        other => Ok(other),
    }
}

fn bare_id(s: &str) -> Result<&str, ParseDragError> {
    if s.is_empty() || s.contains(':') {
        return Err(ParseDragError(s.to_string()));
    }
    Ok(s)
}

impl FromStr for DragSource {
    type Err = ParseDragError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(id) = id_after(s, "draft:")? {
            return Ok(Self::Draft(DraftId::new(id)));
        }
        if let Some(id) = id_after(s, "overflow:")? {
            return Ok(Self::OverflowCard(id.into()));
        }
        if let Some(id) = id_after(s, "archive:")? {
            return Ok(Self::ArchivedCard(id.into()));
        }
        if let Some(id) = id_after(s, "card:")? {
            return Ok(Self::Card(id.into()));
        }
        Ok(Self::Card(bare_id(s)?.into()))
    }
}

impl FromStr for DropTarget {
    type Err = ParseDragError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "archive" => return Ok(Self::Archive),
            "overflow" => return Ok(Self::Overflow),
            _ => {}
        }
        if let Some(id) = id_after(s, "column:")? {
            return Ok(Self::Column(id.into()));
        }
        if let Some(id) = id_after(s, "card:")? {
            return Ok(Self::Card(id.into()));
        }
        Ok(Self::Card(bare_id(s)?.into()))
    }
}

impl fmt::Display for DragSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card(id) => write!(f, "{id}"),
            Self::Draft(id) => write!(f, "draft:{id}"),
            Self::OverflowCard(id) => write!(f, "overflow:{id}"),
            Self::ArchivedCard(id) => write!(f, "archive:{id}"),
        }
    }
}

impl fmt::Display for DropTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(id) => write!(f, "column:{id}"),
            Self::Card(id) => write!(f, "{id}"),
            Self::Archive => f.write_str("archive"),
            Self::Overflow => f.write_str("overflow"),
        }
    }
}
