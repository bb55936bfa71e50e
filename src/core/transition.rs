//! Item moves between the processed list, the priorities and the hourly
//! slots, driven by an explicit table of `(from, to, trigger) -> guard` rows.
//!
//! Every move removes the item from exactly one source collection and
//! inserts it into exactly one destination, so the total item count of a
//! plan never changes across a transition.

use thiserror::Error;
use uuid::Uuid;

use super::day_plan::DayPlan;
use super::item::{Item, MAX_PRIORITIES, PriorityItem};
use super::time_slot::is_valid_hour;

/// A collection an item can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Processed,
    Priorities,
    Slot(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    Processed,
    Priorities,
    Slot,
}

impl Zone {
    pub fn kind(&self) -> ZoneKind {
        match self {
            Self::Processed => ZoneKind::Processed,
            Self::Priorities => ZoneKind::Priorities,
            Self::Slot(_) => ZoneKind::Slot,
        }
    }
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Drag,
    RemovePriority,
}

/// A finished drag gesture as reported by the interaction layer.
/// `destination` is `None` when the item was dropped outside any target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragEvent {
    pub item_id: Uuid,
    pub source: Zone,
    pub destination: Option<Zone>,
}

impl DragEvent {
    pub fn new(item_id: Uuid, source: Zone, destination: Option<Zone>) -> Self {
        Self { item_id, source, destination }
    }
}

/// Why a transition left the plan untouched without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoDestination,
    NoRule { from: ZoneKind, to: ZoneKind },
    InvalidHour(u8),
    StaleSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { item_id: Uuid, from: Zone, to: Zone },
    Ignored(IgnoreReason),
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("priority limit of {limit} reached")]
    PriorityLimitReached { limit: usize },
}

enum GuardFailure {
    Reject(TransitionError),
    Ignore(IgnoreReason),
}

type Guard = fn(&DayPlan, Zone) -> Result<(), GuardFailure>;

pub struct Rule {
    pub from: ZoneKind,
    pub to: ZoneKind,
    pub trigger: Trigger,
    guard: Guard,
}

fn always(_: &DayPlan, _: Zone) -> Result<(), GuardFailure> {
    Ok(())
}

fn priorities_have_room(plan: &DayPlan, _: Zone) -> Result<(), GuardFailure> {
    if plan.priorities_full() {
        return Err(GuardFailure::Reject(TransitionError::PriorityLimitReached {
            limit: MAX_PRIORITIES,
        }));
    }
    Ok(())
}

fn slot_exists(plan: &DayPlan, to: Zone) -> Result<(), GuardFailure> {
    match to {
        Zone::Slot(hour) if is_valid_hour(hour) && plan.slot(hour).is_some() => Ok(()),
        Zone::Slot(hour) => Err(GuardFailure::Ignore(IgnoreReason::InvalidHour(hour))),
        _ => Ok(()),
    }
}

pub const TRANSITIONS: &[Rule] = &[
    Rule {
        from: ZoneKind::Processed,
        to: ZoneKind::Priorities,
        trigger: Trigger::Drag,
        guard: priorities_have_room,
    },
    Rule {
        from: ZoneKind::Priorities,
        to: ZoneKind::Slot,
        trigger: Trigger::Drag,
        guard: slot_exists,
    },
    Rule {
        from: ZoneKind::Processed,
        to: ZoneKind::Slot,
        trigger: Trigger::Drag,
        guard: slot_exists,
    },
    Rule {
        from: ZoneKind::Priorities,
        to: ZoneKind::Processed,
        trigger: Trigger::RemovePriority,
        guard: always,
    },
];

pub fn find_rule(from: ZoneKind, to: ZoneKind, trigger: Trigger) -> Option<&'static Rule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.to == to && rule.trigger == trigger)
}

/// Apply one transition to `plan`. The plan is only modified when the
/// returned outcome is `Moved`.
pub fn apply(
    plan: &mut DayPlan,
    trigger: Trigger,
    item_id: Uuid,
    source: Zone,
    destination: Option<Zone>,
) -> Result<MoveOutcome, TransitionError> {
    let Some(destination) = destination else {
        return Ok(MoveOutcome::Ignored(IgnoreReason::NoDestination));
    };

    let Some(rule) = find_rule(source.kind(), destination.kind(), trigger) else {
        return Ok(MoveOutcome::Ignored(IgnoreReason::NoRule {
            from: source.kind(),
            to: destination.kind(),
        }));
    };

    match (rule.guard)(plan, destination) {
        Ok(()) => {}
        Err(GuardFailure::Reject(err)) => return Err(err),
        Err(GuardFailure::Ignore(reason)) => return Ok(MoveOutcome::Ignored(reason)),
    }

    let Some(item) = take(plan, source, item_id) else {
        return Ok(MoveOutcome::Ignored(IgnoreReason::StaleSource));
    };
    put(plan, destination, item);

    Ok(MoveOutcome::Moved {
        item_id,
        from: source,
        to: destination,
    })
}

fn take(plan: &mut DayPlan, zone: Zone, id: Uuid) -> Option<Item> {
    match zone {
        Zone::Processed => plan.take_processed(id),
        Zone::Priorities => plan.take_priority(id).map(PriorityItem::into_item),
        Zone::Slot(hour) => plan.slot_mut(hour)?.take_item(id),
    }
}

// Guards have already resolved the destination, so a missing slot here
// cannot happen; the item goes back to processed rather than being lost.
fn put(plan: &mut DayPlan, zone: Zone, item: Item) {
    match zone {
        Zone::Processed => plan.processed_items.push(item),
        Zone::Priorities => {
            let rank = (plan.priorities.len() + 1) as u8;
            plan.priorities.push(PriorityItem::new(item, rank));
        }
        Zone::Slot(hour) => match plan.slot_mut(hour) {
            Some(slot) => slot.dragged_items.push(item),
            None => plan.processed_items.push(item),
        },
    }
}
