//! Board commands.
//!
//! Each command reads a fresh [`Snapshot`] for the current user, decides with
//! the pure ordering / capacity / timer logic, writes through the [`Store`],
//! then emits [`BoardEvent`]s. A rejected command writes nothing. Commands
//! whose card, draft or column has disappeared are ignored rather than failed.

use chrono::{DateTime, NaiveDate, Utc};

use super::capacity::DEFAULT_FOCUS_CAPACITY;
use super::draft::{Draft, DraftId, DraftTray};
use super::drag::{DragSource, DropTarget};
use super::events::{BoardEvent, EventSink};
use super::layout::Snapshot;
use super::ordering::{self, append_order, MovePlan, Slot, ORDER_STEP};
use super::store::{Store, StoreError, UserResolver};
use super::timer::{self, Stop, TimerPlan};
use super::{
    parse_tags, Card, CardId, CardPatch, ColumnId, ColumnPatch, ColumnRole, NewCard, NewColumn,
    Priority, UserId,
};

const DEFAULT_COLUMNS: [(&str, Option<ColumnRole>); 4] = [
    ("Todo", None),
    ("In Progress", Some(ColumnRole::Focus)),
    ("Blocked/Review", None),
    ("Done", Some(ColumnRole::Done)),
];

const STARTER_CARDS: [(&str, &str, Priority); 4] = [
    (
        "Define product promise",
        "One sentence that makes it easy to say no to everything else.",
        Priority::Medium,
    ),
    (
        "Design the first-run onboarding",
        "Sketch the first 3 screens or steps.",
        Priority::High,
    ),
    (
        "Set up feedback capture",
        "Decide where early users can leave notes.",
        Priority::Low,
    ),
    (
        "Ship v0.1 to one user",
        "Pick a single person and get it into their hands.",
        Priority::Medium,
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("unauthorized: no current user, or the item belongs to someone else")]
    Unauthorized,
    #[error("Focus column is at max capacity ({limit}). Finish or move something out first.")]
    CapacityExceeded { limit: usize },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BoardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized => Self::Unauthorized,
            other => Self::Store(other),
        }
    }
}

/// Result of a simple card or column command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Applied,
    /// Nothing to do; no write happened.
    Unchanged,
    /// The target no longer exists.
    Ignored,
}

impl Change {
    fn or_move(self, applied: MoveOutcome) -> MoveOutcome {
        match self {
            Self::Applied => applied,
            Self::Unchanged => MoveOutcome::Unchanged,
            Self::Ignored => MoveOutcome::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved {
        card_id: CardId,
        from: ColumnId,
        to: ColumnId,
        timer_stopped: bool,
        celebrated: bool,
    },
    Reordered {
        card_id: CardId,
        column: ColumnId,
    },
    Promoted {
        draft: DraftId,
        card_id: CardId,
    },
    Archived(CardId),
    Parked(CardId),
    Unchanged,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOutcome {
    Started { card_id: CardId, stopped: Vec<Stop> },
    Stopped(Stop),
    /// Not running, and not in the focus column with a slot.
    Ineligible,
    Ignored,
}

/// Fields for a new card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardInput {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl CardInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

impl From<&Draft> for CardInput {
    fn from(draft: &Draft) -> Self {
        Self {
            title: draft.title.clone(),
            description: Some(draft.description.clone()),
            priority: draft.priority,
            due_date: draft.due_date,
            tags: parse_tags(&draft.tags),
        }
    }
}

/// A partial edit of the user-editable card fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardEdit {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
}

impl CardEdit {
    fn into_patch(self) -> Result<CardPatch, BoardError> {
        let title = self.title.as_deref().map(required_title).transpose()?;
        Ok(CardPatch {
            title,
            description: self.description.map(|d| d.and_then(non_empty)),
            priority: self.priority,
            due_date: self.due_date,
            tags: self.tags,
            ..Default::default()
        })
    }
}

fn required_title(title: &str) -> Result<String, BoardError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BoardError::Validation("title must not be empty".into()));
    }
    Ok(title.to_string())
}

fn non_empty(text: String) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub struct BoardService<S, R> {
    store: S,
    users: R,
    sinks: Vec<Box<dyn EventSink>>,
    focus_capacity: usize,
}

impl<S: Store, R: UserResolver> BoardService<S, R> {
    pub fn new(store: S, users: R) -> Self {
        Self {
            store,
            users,
            sinks: Vec::new(),
            focus_capacity: DEFAULT_FOCUS_CAPACITY,
        }
    }

    pub fn with_focus_capacity(mut self, limit: usize) -> Self {
        self.focus_capacity = limit;
        self
    }

    pub fn add_sink(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.users.current_user()
    }

    fn require_user(&self) -> Result<UserId, BoardError> {
        self.users.current_user().ok_or(BoardError::Unauthorized)
    }

    fn emit(&mut self, now: DateTime<Utc>, event: BoardEvent) {
        for sink in &mut self.sinks {
            sink.emit(now, &event);
        }
    }

    fn reject(&mut self, limit: usize, now: DateTime<Utc>) -> BoardError {
        self.emit(now, BoardEvent::CapacityRejected { limit });
        BoardError::CapacityExceeded { limit }
    }

    /// The current user's board. Empty when nobody is signed in.
    pub fn snapshot(&self) -> Result<Snapshot, BoardError> {
        match self.users.current_user() {
            Some(user) => self.snapshot_for(&user),
            None => Ok(Snapshot::new(Vec::new(), Vec::new(), self.focus_capacity)),
        }
    }

    fn snapshot_for(&self, user: &UserId) -> Result<Snapshot, BoardError> {
        Ok(Snapshot::new(
            self.store.list_columns(user)?,
            self.store.list_cards(user, true)?,
            self.focus_capacity,
        ))
    }

    // -----------------------------------------------------------------------
    // Columns
    // -----------------------------------------------------------------------

    /// Seed the default columns and starter cards for a user with no columns.
    /// Returns whether anything was created.
    pub fn ensure_defaults(&mut self, now: DateTime<Utc>) -> Result<bool, BoardError> {
        let user = self.require_user()?;
        if !self.store.list_columns(&user)?.is_empty() {
            return Ok(false);
        }
        for (position, ((title, role), (card_title, description, priority))) in
            DEFAULT_COLUMNS.iter().zip(STARTER_CARDS.iter()).enumerate()
        {
            let column_id = self.store.insert_column(
                &user,
                NewColumn {
                    title: title.to_string(),
                    order: ordering::order_at(position),
                    role: *role,
                },
            )?;
            self.store.insert_card(
                &user,
                NewCard {
                    title: card_title.to_string(),
                    description: Some(description.to_string()),
                    column_id,
                    order: ORDER_STEP,
                    priority: *priority,
                    due_date: None,
                    tags: Vec::new(),
                    created_at: now,
                },
            )?;
        }
        Ok(true)
    }

    pub fn create_column(&mut self, title: &str, now: DateTime<Utc>) -> Result<ColumnId, BoardError> {
        let user = self.require_user()?;
        let title = required_title(title)?;
        let order = append_order(self.store.list_columns(&user)?.iter().map(|c| c.order));
        let id = self.store.insert_column(
            &user,
            NewColumn {
                title: title.clone(),
                order,
                role: None,
            },
        )?;
        self.emit(now, BoardEvent::ColumnCreated { id: id.clone(), title });
        Ok(id)
    }

    pub fn rename_column(
        &mut self,
        id: &ColumnId,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<Change, BoardError> {
        let title = required_title(title)?;
        self.patch_column(
            id,
            ColumnPatch {
                title: Some(title),
                ..Default::default()
            },
            now,
        )
    }

    pub fn set_column_hidden(
        &mut self,
        id: &ColumnId,
        hidden: bool,
        now: DateTime<Utc>,
    ) -> Result<Change, BoardError> {
        self.patch_column(
            id,
            ColumnPatch {
                hidden: Some(hidden),
                ..Default::default()
            },
            now,
        )
    }

    /// Give `id` a role, taking it away from whichever column held it.
    pub fn set_column_role(
        &mut self,
        id: &ColumnId,
        role: Option<ColumnRole>,
        now: DateTime<Utc>,
    ) -> Result<Change, BoardError> {
        let user = self.require_user()?;
        let Some(column) = self.store.get_column(&user, id)? else {
            return Ok(Change::Ignored);
        };
        if column.role == role {
            return Ok(Change::Unchanged);
        }
        if let Some(role) = role {
            let holders: Vec<ColumnId> = self
                .store
                .list_columns(&user)?
                .into_iter()
                .filter(|c| c.id != *id && c.role == Some(role))
                .map(|c| c.id)
                .collect();
            for holder in holders {
                let clear = ColumnPatch {
                    role: Some(None),
                    ..Default::default()
                };
                self.store.patch_column(&user, &holder, &clear)?;
            }
        }
        self.patch_column(
            id,
            ColumnPatch {
                role: Some(role),
                ..Default::default()
            },
            now,
        )
    }

    fn patch_column(
        &mut self,
        id: &ColumnId,
        patch: ColumnPatch,
        now: DateTime<Utc>,
    ) -> Result<Change, BoardError> {
        let user = self.require_user()?;
        let Some(column) = self.store.get_column(&user, id)? else {
            return Ok(Change::Ignored);
        };
        self.store.patch_column(&user, id, &patch)?;
        let title = patch.title.unwrap_or(column.title);
        self.emit(now, BoardEvent::ColumnUpdated { id: id.clone(), title });
        Ok(Change::Applied)
    }

    // -----------------------------------------------------------------------
    // Cards
    // -----------------------------------------------------------------------

    /// Create a card at the end of `column`. Entering the focus column is
    /// capacity-checked.
    pub fn create_card(
        &mut self,
        input: CardInput,
        column: &ColumnId,
        now: DateTime<Utc>,
    ) -> Result<CardId, BoardError> {
        let user = self.require_user()?;
        let title = required_title(&input.title)?;
        if self.store.get_column(&user, column)?.is_none() {
            return Err(BoardError::Validation(format!("no such column: {column}")));
        }
        let snapshot = self.snapshot_for(&user)?;
        let guard = snapshot.capacity_guard();
        if !guard.admit(None, column, snapshot.focus_count()) {
            return Err(self.reject(guard.limit(), now));
        }
        let id = self.store.insert_card(
            &user,
            NewCard {
                title: title.clone(),
                description: input.description.and_then(non_empty),
                column_id: column.clone(),
                order: snapshot.next_order(column),
                priority: input.priority,
                due_date: input.due_date,
                tags: input.tags,
                created_at: now,
            },
        )?;
        self.emit(
            now,
            BoardEvent::CardCreated {
                id: id.clone(),
                title,
                column: column.clone(),
            },
        );
        Ok(id)
    }

    /// Turn a draft into a card in `column`. The draft leaves the tray only
    /// once the card exists.
    pub fn promote_draft(
        &mut self,
        drafts: &mut DraftTray,
        id: &DraftId,
        column: &ColumnId,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, BoardError> {
        let Some(draft) = drafts.get(id) else {
            return Ok(MoveOutcome::Ignored);
        };
        let card_id = self.create_card(CardInput::from(draft), column, now)?;
        drafts.discard(id);
        Ok(MoveOutcome::Promoted {
            draft: id.clone(),
            card_id,
        })
    }

    pub fn update_card(
        &mut self,
        id: &CardId,
        edit: CardEdit,
        now: DateTime<Utc>,
    ) -> Result<Change, BoardError> {
        let user = self.require_user()?;
        let Some(card) = self.store.get_card(&user, id)? else {
            return Ok(Change::Ignored);
        };
        let patch = edit.into_patch()?;
        if patch.is_empty() {
            return Ok(Change::Unchanged);
        }
        let title = patch.title.clone().unwrap_or(card.title);
        self.store.patch_card(&user, id, &patch.touched(now))?;
        self.emit(now, BoardEvent::CardUpdated { id: id.clone(), title });
        Ok(Change::Applied)
    }

    /// Archive or restore a card. Archiving stops its timer first; restoring
    /// puts it back at the end of its column.
    pub fn toggle_archive(
        &mut self,
        id: &CardId,
        archived: bool,
        now: DateTime<Utc>,
    ) -> Result<Change, BoardError> {
        let user = self.require_user()?;
        let Some(card) = self.store.get_card(&user, id)? else {
            return Ok(Change::Ignored);
        };
        if card.archived == archived {
            return Ok(Change::Unchanged);
        }
        if archived || card.overflowed {
            if archived {
                self.stop_running(&user, &card, now)?;
            }
            let patch = CardPatch {
                archived: Some(archived),
                ..Default::default()
            };
            self.store.patch_card(&user, id, &patch.touched(now))?;
            self.emit(
                now,
                BoardEvent::Archived {
                    id: id.clone(),
                    title: card.title,
                    archived,
                },
            );
            return Ok(Change::Applied);
        }
        self.restore(&user, &card, now)
    }

    /// Park a card in the overflow tray, or bring it back to its column.
    pub fn set_overflow(
        &mut self,
        id: &CardId,
        overflowed: bool,
        now: DateTime<Utc>,
    ) -> Result<Change, BoardError> {
        let user = self.require_user()?;
        let Some(card) = self.store.get_card(&user, id)? else {
            return Ok(Change::Ignored);
        };
        if card.overflowed == overflowed {
            return Ok(Change::Unchanged);
        }
        if overflowed || card.archived {
            if overflowed {
                self.stop_running(&user, &card, now)?;
            }
            let patch = CardPatch {
                overflowed: Some(overflowed),
                ..Default::default()
            };
            self.store.patch_card(&user, id, &patch.touched(now))?;
            self.emit(
                now,
                BoardEvent::Parked {
                    id: id.clone(),
                    title: card.title,
                    overflowed,
                },
            );
            return Ok(Change::Applied);
        }
        self.restore(&user, &card, now)
    }

    fn restore(&mut self, user: &UserId, card: &Card, now: DateTime<Utc>) -> Result<Change, BoardError> {
        let snapshot = self.snapshot_for(user)?;
        let outcome = self.place(user, &snapshot, card, &card.column_id, None, now)?;
        Ok(match outcome {
            MoveOutcome::Ignored => Change::Ignored,
            MoveOutcome::Unchanged => Change::Unchanged,
            _ => Change::Applied,
        })
    }

    /// Delete cards, stopping their timers first. Missing ids are skipped.
    /// Returns how many were deleted.
    pub fn delete_cards(&mut self, ids: &[CardId], now: DateTime<Utc>) -> Result<usize, BoardError> {
        let user = self.require_user()?;
        let mut deleted = 0;
        for id in ids {
            let Some(card) = self.store.get_card(&user, id)? else {
                continue;
            };
            self.stop_running(&user, &card, now)?;
            self.store.delete_card(&user, id)?;
            self.emit(
                now,
                BoardEvent::Deleted {
                    id: id.clone(),
                    title: card.title,
                },
            );
            deleted += 1;
        }
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    /// Apply a drag-end intent.
    pub fn move_card(
        &mut self,
        drafts: &mut DraftTray,
        source: &DragSource,
        target: &DropTarget,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, BoardError> {
        if let DragSource::Draft(draft) = source {
            return self.drop_draft(drafts, draft, target, now);
        }
        let Some(card_id) = source.card_id() else {
            return Ok(MoveOutcome::Ignored);
        };
        if matches!(target, DropTarget::Card(over) if over == card_id) {
            return Ok(MoveOutcome::Unchanged);
        }

        let user = self.require_user()?;
        let (column, index) = match target {
            DropTarget::Archive => {
                let change = self.toggle_archive(card_id, true, now)?;
                return Ok(change.or_move(MoveOutcome::Archived(card_id.clone())));
            }
            DropTarget::Overflow => {
                let change = self.set_overflow(card_id, true, now)?;
                return Ok(change.or_move(MoveOutcome::Parked(card_id.clone())));
            }
            DropTarget::Column(column) => (column.clone(), None),
            DropTarget::Card(over) => {
                let Some(over_card) = self.store.get_card(&user, over)? else {
                    return Ok(MoveOutcome::Ignored);
                };
                if !over_card.holds_slot() {
                    return Ok(MoveOutcome::Ignored);
                }
                (over_card.column_id, Some(over.clone()))
            }
        };

        let Some(card) = self.store.get_card(&user, card_id)? else {
            return Ok(MoveOutcome::Ignored);
        };
        // A plain card source must still sit in its column.
        if !source.from_tray() && !card.holds_slot() {
            return Ok(MoveOutcome::Ignored);
        }

        let snapshot = self.snapshot_for(&user)?;
        let index = index.map(|over| {
            let sequence = snapshot.column_cards(&column);
            sequence
                .iter()
                .position(|c| c.id == over)
                .unwrap_or(sequence.len())
        });
        self.place(&user, &snapshot, &card, &column, index, now)
    }

    /// Keyboard move: append to the end of `column`.
    pub fn move_to_column(
        &mut self,
        id: &CardId,
        column: &ColumnId,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, BoardError> {
        let user = self.require_user()?;
        let Some(card) = self.store.get_card(&user, id)? else {
            return Ok(MoveOutcome::Ignored);
        };
        if card.holds_slot() && card.column_id == *column {
            return Ok(MoveOutcome::Unchanged);
        }
        let snapshot = self.snapshot_for(&user)?;
        self.place(&user, &snapshot, &card, column, None, now)
    }

    /// Move to an explicit position in `column`.
    pub fn move_to_index(
        &mut self,
        id: &CardId,
        column: &ColumnId,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, BoardError> {
        let user = self.require_user()?;
        let Some(card) = self.store.get_card(&user, id)? else {
            return Ok(MoveOutcome::Ignored);
        };
        let snapshot = self.snapshot_for(&user)?;
        self.place(&user, &snapshot, &card, column, Some(index), now)
    }

    fn drop_draft(
        &mut self,
        drafts: &mut DraftTray,
        draft: &DraftId,
        target: &DropTarget,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, BoardError> {
        let user = self.require_user()?;
        let column = match target {
            DropTarget::Column(column) => {
                if self.store.get_column(&user, column)?.is_none() {
                    return Ok(MoveOutcome::Ignored);
                }
                column.clone()
            }
            DropTarget::Card(over) => match self.store.get_card(&user, over)? {
                Some(over_card) => over_card.column_id,
                None => return Ok(MoveOutcome::Ignored),
            },
            DropTarget::Archive | DropTarget::Overflow => return Ok(MoveOutcome::Ignored),
        };
        self.promote_draft(drafts, draft, &column, now)
    }

    /// Put `card` at `index` (or the end) of `target`.
    ///
    /// A card without a slot (parked or archived) always enters as a newcomer,
    /// even into its own column, and gets its flags cleared once placed.
    fn place(
        &mut self,
        user: &UserId,
        snapshot: &Snapshot,
        card: &Card,
        target: &ColumnId,
        index: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, BoardError> {
        let layout = snapshot.layout();
        if layout.column(target).is_none() {
            return Ok(MoveOutcome::Ignored);
        }
        let from_tray = !card.holds_slot();
        let source = snapshot.column_slots(&card.column_id);
        let sequence = snapshot.column_slots(target);
        let slot = Slot::new(card.id.clone(), card.order);
        let plan = MovePlan {
            card: &slot,
            source_column: &card.column_id,
            source: &source,
            target_column: target,
            target: &sequence,
            index: index.unwrap_or(sequence.len()),
        };

        if card.column_id == *target && !from_tray {
            let updates = ordering::plan_move(&plan);
            if updates.is_empty() {
                return Ok(MoveOutcome::Unchanged);
            }
            self.store.apply_order_updates(user, &updates, now)?;
            self.emit(
                now,
                BoardEvent::Reordered {
                    id: card.id.clone(),
                    title: card.title.clone(),
                    column: target.clone(),
                },
            );
            return Ok(MoveOutcome::Reordered {
                card_id: card.id.clone(),
                column: target.clone(),
            });
        }

        let guard = snapshot.capacity_guard();
        let entering_from = (!from_tray).then_some(&card.column_id);
        if !guard.admit(entering_from, target, snapshot.focus_count()) {
            return Err(self.reject(guard.limit(), now));
        }

        let updates = ordering::plan_move(&plan);
        self.store.apply_order_updates(user, &updates, now)?;

        if from_tray {
            let patch = CardPatch {
                archived: card.archived.then_some(false),
                overflowed: card.overflowed.then_some(false),
                ..Default::default()
            };
            self.store.patch_card(user, &card.id, &patch.touched(now))?;
            let (id, title) = (card.id.clone(), card.title.clone());
            if card.archived {
                self.emit(now, BoardEvent::Archived { id, title, archived: false });
            } else {
                self.emit(now, BoardEvent::Parked { id, title, overflowed: false });
            }
        }

        let timer_stopped = if card.is_running() && !layout.is_focus(target) {
            self.stop_running(user, card, now)?.is_some()
        } else {
            false
        };

        let crossed = card.column_id != *target;
        let celebrated = crossed && layout.is_done(target);
        if crossed {
            self.emit(
                now,
                BoardEvent::CardMoved {
                    id: card.id.clone(),
                    title: card.title.clone(),
                    from: card.column_id.clone(),
                    to: target.clone(),
                },
            );
        }
        if celebrated {
            self.emit(
                now,
                BoardEvent::Celebrate {
                    id: card.id.clone(),
                    title: card.title.clone(),
                },
            );
        }

        Ok(MoveOutcome::Moved {
            card_id: card.id.clone(),
            from: card.column_id.clone(),
            to: target.clone(),
            timer_stopped,
            celebrated,
        })
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    pub fn toggle_timer(&mut self, id: &CardId, now: DateTime<Utc>) -> Result<TimerOutcome, BoardError> {
        let user = self.require_user()?;
        let Some(card) = self.store.get_card(&user, id)? else {
            return Ok(TimerOutcome::Ignored);
        };
        let snapshot = self.snapshot_for(&user)?;
        match timer::plan_toggle(&card, snapshot.cards(), snapshot.layout().focus(), now) {
            TimerPlan::Stop(stop) => {
                self.apply_stop(&user, &stop, &card.title, now)?;
                Ok(TimerOutcome::Stopped(stop))
            }
            TimerPlan::Start { stops, start } => {
                for stop in &stops {
                    let title = snapshot
                        .card(&stop.card_id)
                        .map(|c| c.title.clone())
                        .unwrap_or_default();
                    self.apply_stop(&user, stop, &title, now)?;
                }
                self.store.patch_card(&user, id, &start)?;
                self.emit(
                    now,
                    BoardEvent::TimerStarted {
                        id: id.clone(),
                        title: card.title,
                    },
                );
                Ok(TimerOutcome::Started {
                    card_id: id.clone(),
                    stopped: stops,
                })
            }
            TimerPlan::Ineligible => Ok(TimerOutcome::Ineligible),
        }
    }

    /// Stop timers that should not be running: on ineligible cards, and all
    /// but the most recent one when several run.
    pub fn reconcile_timers(&mut self, now: DateTime<Utc>) -> Result<Vec<Stop>, BoardError> {
        let user = self.require_user()?;
        let snapshot = self.snapshot_for(&user)?;
        let stops = timer::plan_reconcile(snapshot.cards(), snapshot.layout().focus(), now);
        for stop in &stops {
            let title = snapshot
                .card(&stop.card_id)
                .map(|c| c.title.clone())
                .unwrap_or_default();
            self.apply_stop(&user, stop, &title, now)?;
        }
        Ok(stops)
    }

    fn stop_running(
        &mut self,
        user: &UserId,
        card: &Card,
        now: DateTime<Utc>,
    ) -> Result<Option<Stop>, BoardError> {
        let Some(stop) = timer::stop(card, now) else {
            return Ok(None);
        };
        self.apply_stop(user, &stop, &card.title, now)?;
        Ok(Some(stop))
    }

    fn apply_stop(
        &mut self,
        user: &UserId,
        stop: &Stop,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BoardError> {
        self.store.patch_card(user, &stop.card_id, &stop.patch)?;
        self.emit(
            now,
            BoardEvent::TimerStopped {
                id: stop.card_id.clone(),
                title: title.to_string(),
                credited: stop.credited,
            },
        );
        Ok(())
    }
}
