pub mod age;
pub mod capacity;
pub mod draft;
pub mod drag;
pub mod events;
pub mod filter;
pub mod layout;
pub mod ordering;
pub mod service;
pub mod storage;
pub mod store;
pub mod timer;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a card. Allocated as a decimal sequence number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

/// Identity of a column. Always a slug (`[a-z0-9][a-z0-9-]*`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub String);

/// The owner of a column or card; the store partitions everything by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(CardId);
string_id!(ColumnId);
string_id!(UserId);

/// Special meaning a column can carry on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    /// The capped "in progress" column; the only place a timer may run.
    Focus,
    /// Entering it from another column is celebrated.
    Done,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Done => "done",
        }
    }
}

impl std::str::FromStr for ColumnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "focus" => Ok(Self::Focus),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown column role '{other}': use focus, done")),
        }
    }
}

/// A single kanban column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: ColumnId,
    pub owner: UserId,
    pub title: String,
    /// Display sort key. Ties are broken by id.
    pub order: i64,
    pub role: Option<ColumnRole>,
    pub hidden: bool,
}

/// Priority levels for cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn next(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Low => "↓",
            Self::Medium => "",
            Self::High => "!",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{other}': use low, medium, high")),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single kanban card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub owner: UserId,
    pub title: String,
    /// The markdown body (not serialized into frontmatter).
    #[serde(skip)]
    pub description: Option<String>,
    #[serde(rename = "column")]
    pub column_id: ColumnId,
    /// Position key inside the owning column, spaced by 1000.
    pub order: i64,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub archived: bool,
    /// Parked in the overflow tray: holds no column slot.
    #[serde(default)]
    pub overflowed: bool,
    /// Accumulated focus time. Never decreases.
    #[serde(default)]
    pub time_seconds: u64,
    /// Present while the timer runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        id: CardId,
        owner: UserId,
        title: String,
        column_id: ColumnId,
        order: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            title,
            description: None,
            column_id,
            order,
            priority: Priority::default(),
            due_date: None,
            tags: Vec::new(),
            archived: false,
            overflowed: false,
            time_seconds: 0,
            timer_started_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer_started_at.is_some()
    }

    /// Whether the card occupies a slot in its column (counts for views and capacity).
    pub fn holds_slot(&self) -> bool {
        !self.archived && !self.overflowed
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &CardPatch) {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(ref column_id) = patch.column_id {
            self.column_id = column_id.clone();
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(ref tags) = patch.tags {
            self.tags = tags.clone();
        }
        if let Some(archived) = patch.archived {
            self.archived = archived;
        }
        if let Some(overflowed) = patch.overflowed {
            self.overflowed = overflowed;
        }
        if let Some(time_seconds) = patch.time_seconds {
            self.time_seconds = time_seconds;
        }
        if let Some(timer_started_at) = patch.timer_started_at {
            self.timer_started_at = timer_started_at;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Fields of a card that a single store patch may change.
///
/// `None` leaves a field untouched. For optional fields the inner `Option`
/// is the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub column_id: Option<ColumnId>,
    pub order: Option<i64>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
    pub archived: Option<bool>,
    pub overflowed: Option<bool>,
    pub time_seconds: Option<u64>,
    pub timer_started_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn touched(mut self, now: DateTime<Utc>) -> Self {
        self.updated_at = Some(now);
        self
    }
}

/// Fields of a column that a single store patch may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPatch {
    pub title: Option<String>,
    pub order: Option<i64>,
    pub role: Option<Option<ColumnRole>>,
    pub hidden: Option<bool>,
}

/// Fields needed to insert a card. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub title: String,
    pub description: Option<String>,
    pub column_id: ColumnId,
    pub order: i64,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a column. The store derives the id from the title.
#[derive(Debug, Clone)]
pub struct NewColumn {
    pub title: String,
    pub order: i64,
    pub role: Option<ColumnRole>,
}

/// Normalize a comma-separated tag list: trimmed, empty entries dropped.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Turn a column title into a slug usable as a column id.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "column".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Blocked/Review"), "blocked-review");
        assert_eq!(slugify("  In Progress  "), "in-progress");
        assert_eq!(slugify("???"), "column");
    }

    #[test]
    fn parse_tags_drops_empty_entries() {
        assert_eq!(parse_tags(" ui, ,bug ,"), vec!["ui", "bug"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::High.next(), Priority::Low);
    }

    #[test]
    fn patch_clears_optional_fields() {
        let now = Utc::now();
        let mut card = Card::new("1".into(), "me".into(), "T".into(), "todo".into(), 1000, now);
        card.timer_started_at = Some(now);
        card.apply(&CardPatch {
            timer_started_at: Some(None),
            time_seconds: Some(42),
            ..Default::default()
        });
        assert!(!card.is_running());
        assert_eq!(card.time_seconds, 42);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(CardPatch::default().is_empty());
        assert!(!CardPatch::default().touched(Utc::now()).is_empty());
    }
}
