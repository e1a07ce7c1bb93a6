//! Focus timer state machine.
//!
//! A card is Stopped (`timer_started_at == None`) or Running since some
//! instant. At most one card on the board runs at a time, and only while it
//! sits in the focus column with a slot. Elapsed time is credited into
//! `time_seconds` only when a timer stops; everything else is a read-time
//! projection.

use chrono::{DateTime, Utc};

use super::{Card, CardId, CardPatch, ColumnId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running { since: DateTime<Utc> },
}

pub fn state(card: &Card) -> TimerState {
    match card.timer_started_at {
        Some(since) => TimerState::Running { since },
        None => TimerState::Stopped,
    }
}

/// Whole seconds between `started` and `now`, clamped at zero.
pub fn elapsed_seconds(started: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (now - started).num_milliseconds().max(0);
    (millis / 1000) as u64
}

/// Accumulated time plus the running stretch, for display.
pub fn live_seconds(card: &Card, now: DateTime<Utc>) -> u64 {
    card.time_seconds
        + card
            .timer_started_at
            .map_or(0, |started| elapsed_seconds(started, now))
}

/// Whether a timer may run on `card` at all.
pub fn is_eligible(card: &Card, focus: Option<&ColumnId>) -> bool {
    focus == Some(&card.column_id) && card.holds_slot()
}

/// A stop for one card: the patch to write and the seconds it credits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stop {
    pub card_id: CardId,
    pub credited: u64,
    pub patch: CardPatch,
}

/// Stop `card` at `now`. `None` if it is not running.
pub fn stop(card: &Card, now: DateTime<Utc>) -> Option<Stop> {
    let started = card.timer_started_at?;
    let credited = elapsed_seconds(started, now);
    let patch = CardPatch {
        timer_started_at: Some(None),
        time_seconds: Some(card.time_seconds + credited),
        ..Default::default()
    }
    .touched(now);
    Some(Stop {
        card_id: card.id.clone(),
        credited,
        patch,
    })
}

/// What a toggle on one card has to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerPlan {
    /// Stop every other running card first, then start this one.
    Start {
        stops: Vec<Stop>,
        start: CardPatch,
    },
    Stop(Stop),
    /// Not running and not allowed to start.
    Ineligible,
}

/// Plan a start on `card`, stopping every other running card on the board.
///
/// Returns `None` when the card may not start or already runs.
pub fn plan_start<'a>(
    card: &Card,
    board: impl IntoIterator<Item = &'a Card>,
    focus: Option<&ColumnId>,
    now: DateTime<Utc>,
) -> Option<TimerPlan> {
    if card.is_running() || !is_eligible(card, focus) {
        return None;
    }
    let stops = board
        .into_iter()
        .filter(|other| other.id != card.id)
        .filter_map(|other| stop(other, now))
        .collect();
    let start = CardPatch {
        timer_started_at: Some(Some(now)),
        ..Default::default()
    }
    .touched(now);
    Some(TimerPlan::Start { stops, start })
}

/// Running → stop; eligible → start; otherwise nothing.
pub fn plan_toggle<'a>(
    card: &Card,
    board: impl IntoIterator<Item = &'a Card>,
    focus: Option<&ColumnId>,
    now: DateTime<Utc>,
) -> TimerPlan {
    if let Some(stop) = stop(card, now) {
        return TimerPlan::Stop(stop);
    }
    plan_start(card, board, focus, now).unwrap_or(TimerPlan::Ineligible)
}

/// Stops that restore the single-timer invariant after an interrupted move.
///
/// Running cards that are no longer eligible are stopped. If several
/// eligible cards still run, only the most recently started one survives.
pub fn plan_reconcile<'a>(
    board: impl IntoIterator<Item = &'a Card>,
    focus: Option<&ColumnId>,
    now: DateTime<Utc>,
) -> Vec<Stop> {
    let running: Vec<&Card> = board.into_iter().filter(|c| c.is_running()).collect();
    let keeper = running
        .iter()
        .filter(|c| is_eligible(c, focus))
        .max_by_key(|c| (c.timer_started_at, c.id.clone()))
        .map(|c| c.id.clone());

    running
        .into_iter()
        .filter(|c| Some(&c.id) != keeper.as_ref())
        .filter_map(|c| stop(c, now))
        .collect()
}

/// `HH:MM:SS` rendering of a second count.
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
