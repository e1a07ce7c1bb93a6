use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::store::{MemoryStore, Store, StoreError};
use super::{Card, CardId, CardPatch, Column, ColumnId, ColumnPatch, NewCard, NewColumn, UserId};
use crate::config::{BoardConfig, BoardSection, ColumnConfig, LocalConfig};

/// Name of the board directory, found by walking up from the working directory.
pub const BOARD_DIR: &str = ".focusboard";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error(".focusboard directory not found (walk up from {0})")]
    NotFound(PathBuf),
    #[error("invalid card file {path}: {reason}")]
    InvalidCard { path: PathBuf, reason: String },
    #[error("invalid slug: {0:?} (must match [a-z0-9-]+)")]
    InvalidSlug(String),
}

/// Validate that a slug is safe for use as a column id.
/// Must start with a letter or digit, then only lowercase alphanumeric and hyphens.
fn validate_slug(slug: &str) -> Result<(), StorageError> {
    let first = slug.as_bytes().first().copied().unwrap_or(0);
    if slug.is_empty()
        || !(first.is_ascii_lowercase() || first.is_ascii_digit())
        || !slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(StorageError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Find the board directory by walking up from `start`.
pub fn find_board_dir(start: &Path) -> Result<PathBuf, StorageError> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(BOARD_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !dir.pop() {
            return Err(StorageError::NotFound(start.to_path_buf()));
        }
    }
}

/// Create an empty board directory. Columns are seeded per user later.
pub fn init_board(root: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let board_dir = root.join(BOARD_DIR);
    fs::create_dir_all(board_dir.join("cards"))?;

    let config = BoardConfig {
        board: BoardSection {
            name: name.to_string(),
            next_card_id: 1,
            focus_capacity: super::capacity::DEFAULT_FOCUS_CAPACITY,
            created_at: Some(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        },
        columns: Vec::new(),
    };
    fs::write(board_dir.join("config.toml"), toml::to_string_pretty(&config)?)?;
    ensure_local_gitignore(&board_dir)?;
    Ok(board_dir)
}

/// The board on disk: `config.toml` for the board and its columns, one
/// `cards/<id>.md` per card. Every store write persists the document it
/// touched before returning.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    name: String,
    focus_capacity: usize,
    created_at: Option<String>,
    docs: MemoryStore,
}

impl FileStore {
    pub fn open(board_dir: &Path) -> Result<Self, StorageError> {
        let config_str = fs::read_to_string(board_dir.join("config.toml"))?;
        let config: BoardConfig = toml::from_str(&config_str)?;

        let mut columns = Vec::new();
        for col in config.columns {
            validate_slug(&col.id)?;
            columns.push(Column {
                id: ColumnId::new(col.id),
                owner: UserId::new(col.owner),
                title: col.title,
                order: col.order,
                role: col.role,
                hidden: col.hidden.unwrap_or(false),
            });
        }

        let mut cards = Vec::new();
        let cards_dir = board_dir.join("cards");
        if cards_dir.exists() {
            for entry in fs::read_dir(&cards_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) == Some("md") {
                    match load_card(&path) {
                        Ok(card) => cards.push(card),
                        Err(e) => {
                            eprintln!("Warning: skipping invalid card {}: {e}", path.display());
                        }
                    }
                }
            }
        }

        Ok(Self {
            dir: board_dir.to_path_buf(),
            name: config.board.name,
            focus_capacity: config.board.focus_capacity,
            created_at: config.board.created_at,
            docs: MemoryStore::from_parts(columns, cards, config.board.next_card_id),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn focus_capacity(&self) -> usize {
        self.focus_capacity
    }

    /// Run a document write and persist it. If any step fails the in-memory
    /// documents are put back, so memory never runs ahead of disk.
    fn persist<T>(
        &mut self,
        write: impl FnOnce(&mut Self) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let before = self.docs.clone();
        let result = write(self);
        if result.is_err() {
            self.docs = before;
        }
        result
    }

    fn card_path(&self, id: &CardId) -> PathBuf {
        self.dir.join("cards").join(format!("{id}.md"))
    }

    fn save_config(&self) -> Result<(), StorageError> {
        let columns = self
            .docs
            .all_columns()
            .into_iter()
            .map(|col| ColumnConfig {
                id: col.id.to_string(),
                title: col.title.clone(),
                order: col.order,
                owner: col.owner.to_string(),
                role: col.role,
                hidden: if col.hidden { Some(true) } else { None },
            })
            .collect();
        let config = BoardConfig {
            board: BoardSection {
                name: self.name.clone(),
                next_card_id: self.docs.next_card_id(),
                focus_capacity: self.focus_capacity,
                created_at: self.created_at.clone(),
            },
            columns,
        };
        fs::write(self.dir.join("config.toml"), toml::to_string_pretty(&config)?)?;
        Ok(())
    }

    /// Write a card file, skipping the write when nothing changed.
    fn save_card(&self, id: &CardId) -> Result<(), StorageError> {
        let Some(card) = self.docs.card(id) else {
            return Ok(());
        };
        let path = self.card_path(id);
        let content = serialize_card(card)?;
        let needs_write = match fs::read_to_string(&path) {
            Ok(existing) => existing.replace("\r\n", "\n") != content,
            Err(_) => true,
        };
        if needs_write {
            fs::create_dir_all(self.dir.join("cards"))?;
            fs::write(&path, content)?;
        }
        Ok(())
    }
}

impl Store for FileStore {
    fn list_columns(&self, user: &UserId) -> Result<Vec<Column>, StoreError> {
        self.docs.list_columns(user)
    }

    fn list_cards(&self, user: &UserId, include_archived: bool) -> Result<Vec<Card>, StoreError> {
        self.docs.list_cards(user, include_archived)
    }

    fn get_card(&self, user: &UserId, id: &CardId) -> Result<Option<Card>, StoreError> {
        self.docs.get_card(user, id)
    }

    fn get_column(&self, user: &UserId, id: &ColumnId) -> Result<Option<Column>, StoreError> {
        self.docs.get_column(user, id)
    }

    fn insert_card(&mut self, user: &UserId, card: NewCard) -> Result<CardId, StoreError> {
        self.persist(|store| {
            let id = store.docs.insert_card(user, card)?;
            store.save_card(&id)?;
            if let Err(e) = store.save_config() {
                // The id counter never reached disk; drop the orphan file.
                let _ = fs::remove_file(store.card_path(&id));
                return Err(e.into());
            }
            Ok(id)
        })
    }

    fn patch_card(&mut self, user: &UserId, id: &CardId, patch: &CardPatch) -> Result<(), StoreError> {
        self.persist(|store| {
            store.docs.patch_card(user, id, patch)?;
            store.save_card(id)?;
            Ok(())
        })
    }

    fn delete_card(&mut self, user: &UserId, id: &CardId) -> Result<(), StoreError> {
        self.persist(|store| {
            store.docs.delete_card(user, id)?;
            let path = store.card_path(id);
            if path.exists() {
                fs::remove_file(path).map_err(StorageError::from)?;
            }
            Ok(())
        })
    }

    fn insert_column(&mut self, user: &UserId, column: NewColumn) -> Result<ColumnId, StoreError> {
        validate_slug(self.docs.unique_column_id(&column.title).as_str())?;
        self.persist(|store| {
            let id = store.docs.insert_column(user, column)?;
            store.save_config()?;
            Ok(id)
        })
    }

    fn patch_column(&mut self, user: &UserId, id: &ColumnId, patch: &ColumnPatch) -> Result<(), StoreError> {
        self.persist(|store| {
            store.docs.patch_column(user, id, patch)?;
            store.save_config()?;
            Ok(())
        })
    }
}

/// Parse a card .md file with TOML frontmatter.
fn load_card(path: &Path) -> Result<Card, StorageError> {
    let content = fs::read_to_string(path)?;
    let (frontmatter, body) = parse_frontmatter(&content).ok_or_else(|| {
        StorageError::InvalidCard {
            path: path.to_path_buf(),
            reason: "missing or invalid TOML frontmatter".into(),
        }
    })?;

    let mut card: Card = toml::from_str(&frontmatter).map_err(|e| StorageError::InvalidCard {
        path: path.to_path_buf(),
        reason: format!("invalid TOML: {e}"),
    })?;
    // Validate card ID is safe for use as a filename
    if card.id.as_str().is_empty() || !card.id.as_str().bytes().all(|b| b.is_ascii_digit()) {
        return Err(StorageError::InvalidCard {
            path: path.to_path_buf(),
            reason: format!("unsafe card id: {:?}", card.id.as_str()),
        });
    }
    card.description = (!body.is_empty()).then_some(body);
    Ok(card)
}

/// Serialize a card to the frontmatter + markdown body format.
fn serialize_card(card: &Card) -> Result<String, StorageError> {
    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&toml::to_string(card)?);
    out.push_str("---\n");
    if let Some(ref description) = card.description {
        if !description.is_empty() {
            out.push('\n');
            out.push_str(description);
            if !description.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// Parse `---` delimited TOML frontmatter from a string.
/// Returns (frontmatter, body).
///
/// Normalizes `\r\n` to `\n` so files edited on Windows parse correctly.
fn parse_frontmatter(content: &str) -> Option<(String, String)> {
    let content = content.replace("\r\n", "\n");
    let content = content.trim_start();
    if !content.starts_with("---") {
        return None;
    }
    let after_first = &content[3..];
    let after_first = after_first.strip_prefix('\n').unwrap_or(after_first);
    let end = after_first.find("\n---")?;
    let frontmatter = after_first[..end].to_string();
    let rest = &after_first[end + 4..];
    let body = rest.strip_prefix('\n').unwrap_or(rest).to_string();
    let body = body.trim().to_string();
    Some((frontmatter, body))
}

// ---------------------------------------------------------------------------
// Activity log (.focusboard/activity.log, append-only JSONL)
// ---------------------------------------------------------------------------

/// Append a single JSONL event to `activity.log`.
///
/// The common fields are `ts`, `action`, `id`, and `title`; `extras` are
/// appended after them. The write is best-effort: any I/O error is
/// discarded so a log failure never interrupts a board operation.
pub fn append_activity(
    board_dir: &Path,
    now: DateTime<Utc>,
    action: &str,
    id: &str,
    title: &str,
    extras: &[(&str, String)],
) {
    let _ = try_append_activity(board_dir, now, action, id, title, extras);
}

fn try_append_activity(
    board_dir: &Path,
    now: DateTime<Utc>,
    action: &str,
    id: &str,
    title: &str,
    extras: &[(&str, String)],
) -> std::io::Result<()> {
    use std::io::Write;

    let mut entry = serde_json::Map::new();
    entry.insert("ts".into(), now.format("%Y-%m-%dT%H:%M:%SZ").to_string().into());
    entry.insert("action".into(), action.into());
    entry.insert("id".into(), id.into());
    entry.insert("title".into(), title.into());
    for (k, v) in extras {
        entry.insert((*k).to_string(), v.clone().into());
    }
    let line = serde_json::Value::Object(entry).to_string();

    let mut file = fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(board_dir.join("activity.log"))?;
    writeln!(file, "{line}")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Local config (.focusboard/local.toml, gitignored, per-user)
// ---------------------------------------------------------------------------

/// Load per-user local settings from `local.toml`.
/// Returns `Ok(default)` if the file is absent.
pub fn load_local_config(board_dir: &Path) -> Result<LocalConfig, StorageError> {
    let path = board_dir.join("local.toml");
    if !path.exists() {
        return Ok(LocalConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

/// Persist per-user local settings to `local.toml`.
pub fn save_local_config(board_dir: &Path, config: &LocalConfig) -> Result<(), StorageError> {
    let content = toml::to_string_pretty(config)?;
    fs::write(board_dir.join("local.toml"), content)?;
    let _ = ensure_local_gitignore(board_dir);
    Ok(())
}

/// Ensure `.focusboard/.gitignore` lists `local.toml`.
fn ensure_local_gitignore(board_dir: &Path) -> Result<(), StorageError> {
    use std::io::{Read, Seek, Write};
    let path = board_dir.join(".gitignore");
    let entry = "local.toml";
    let mut file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    if content.lines().any(|l| l.trim() == entry) {
        return Ok(());
    }
    file.seek(std::io::SeekFrom::End(0))?;
    if !content.is_empty() && !content.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{entry}")?;
    Ok(())
}
