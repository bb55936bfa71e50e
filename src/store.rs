//! The in-memory plan for the selected date and every operation on it.
//!
//! `PlanStore` is the single owner of the current `DayPlan`. Each mutating
//! operation updates memory first and then mirrors the whole plan to the
//! storage adapter; a failed save is logged and remembered but never undone.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::core::day_plan::DayPlan;
use crate::core::item::Item;
use crate::core::time_slot::is_valid_hour;
use crate::core::transition::{self, DragEvent, MoveOutcome, Trigger, TransitionError, Zone};
use crate::organizer::{OrganizeError, TextOrganizer};
use crate::storage::StorageAdapter;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("an organize request is already running for {0}")]
    OrganizeInFlight(NaiveDate),
}

/// Proof that an organize request was started. The result is only applied
/// if the store is still on the plan the ticket was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeTicket {
    generation: u64,
    date: NaiveDate,
    text: String,
}

impl OrganizeTicket {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The brain dump as it was when the request started.
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug)]
pub enum OrganizeResolution {
    Applied { count: usize },
    /// The selected date changed while the request was outstanding.
    Discarded,
    Failed(OrganizeError),
}

pub struct PlanStore {
    storage: Box<dyn StorageAdapter>,
    plan: DayPlan,
    generation: u64,
    organizing: Option<u64>,
    last_persist_error: Option<String>,
}

impl PlanStore {
    /// Open the plan for `date`, loading it or starting an empty one.
    pub fn open(storage: impl StorageAdapter + 'static, date: NaiveDate) -> Self {
        let storage: Box<dyn StorageAdapter> = Box::new(storage);
        let plan = load_or_new(storage.as_ref(), date);
        Self {
            storage,
            plan,
            generation: 0,
            organizing: None,
            last_persist_error: None,
        }
    }

    pub fn plan(&self) -> &DayPlan {
        &self.plan
    }

    pub fn date(&self) -> NaiveDate {
        self.plan.date
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_organizing(&self) -> bool {
        self.organizing == Some(self.generation)
    }

    /// Message of the most recent failed save, cleared by the next good one.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    /// Switch to another date. The previous plan was already persisted by
    /// the mutation that last changed it, so it is simply dropped.
    pub fn select_date(&mut self, date: NaiveDate) -> bool {
        if !self.plan.is_stale(date) {
            return false;
        }
        log::info!("Switching plan from {} to {}", self.plan.date, date);
        self.plan = load_or_new(self.storage.as_ref(), date);
        self.generation += 1;
        true
    }

    fn persist(&mut self) {
        match self.storage.save(&self.plan) {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                log::warn!("Failed to save {}: {}", self.plan.storage_key(), e);
                self.last_persist_error = Some(e.to_string());
            }
        }
    }

    pub fn set_brain_dump(&mut self, text: impl Into<String>) {
        self.plan.brain_dump = text.into();
        self.persist();
    }

    /// Replace the processed list wholesale with organizer output.
    pub fn ingest_processed(&mut self, items: Vec<Item>) {
        self.plan.processed_items = items;
        self.persist();
    }

    /// Append a hand-written item. Blank text is ignored.
    pub fn add_manual_item(&mut self, text: &str) -> Option<Uuid> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let item = Item::manual(text);
        let id = item.id;
        self.plan.processed_items.push(item);
        self.persist();
        Some(id)
    }

    pub fn update_slot(&mut self, hour: u8, task: impl Into<String>, notes: impl Into<String>) -> bool {
        if !is_valid_hour(hour) {
            log::debug!("Ignoring update for invalid hour {}", hour);
            return false;
        }
        let Some(slot) = self.plan.slot_mut(hour) else {
            return false;
        };
        slot.task = task.into();
        slot.notes = notes.into();
        self.persist();
        true
    }

    pub fn clear_slot(&mut self, hour: u8) -> bool {
        let Some(slot) = self.plan.slot_mut(hour) else {
            return false;
        };
        slot.clear();
        self.persist();
        true
    }

    /// Toggle a scheduled item inside the slot, or the slot itself when no
    /// item is named.
    pub fn toggle_complete(&mut self, hour: u8, item_id: Option<Uuid>) -> bool {
        let Some(slot) = self.plan.slot_mut(hour) else {
            return false;
        };
        match item_id {
            Some(id) => match slot.find_item_mut(id) {
                Some(item) => item.toggle_completed(),
                None => return false,
            },
            None => slot.completed = !slot.completed,
        }
        self.persist();
        true
    }

    /// Move a priority back to the end of the processed list, dropping its rank.
    pub fn remove_priority(&mut self, id: Uuid) -> bool {
        let moved = transition::apply(
            &mut self.plan,
            Trigger::RemovePriority,
            id,
            Zone::Priorities,
            Some(Zone::Processed),
        );
        match moved {
            Ok(outcome) if outcome.is_moved() => {
                self.persist();
                true
            }
            _ => false,
        }
    }

    /// Apply one finished drag. Only `PriorityLimitReached` is an error;
    /// everything else that cannot move is reported as `Ignored`.
    pub fn apply_drag(&mut self, event: DragEvent) -> Result<MoveOutcome, TransitionError> {
        let outcome = transition::apply(
            &mut self.plan,
            Trigger::Drag,
            event.item_id,
            event.source,
            event.destination,
        )
        .inspect_err(|e| log::debug!("Rejected drag of {}: {}", event.item_id, e))?;

        match outcome {
            MoveOutcome::Moved { .. } => self.persist(),
            MoveOutcome::Ignored(reason) => {
                log::debug!("Ignored drag of {}: {:?}", event.item_id, reason);
            }
        }
        Ok(outcome)
    }

    /// Mark an organize request as outstanding and capture the brain dump.
    pub fn begin_organize(&mut self) -> Result<OrganizeTicket, StoreError> {
        if self.is_organizing() {
            return Err(StoreError::OrganizeInFlight(self.plan.date));
        }
        self.organizing = Some(self.generation);
        Ok(OrganizeTicket {
            generation: self.generation,
            date: self.plan.date,
            text: self.plan.brain_dump.clone(),
        })
    }

    /// Settle an organize request. Results for a plan that is no longer
    /// selected are dropped without touching the current one. Any `Ok`
    /// result replaces `processedItems`, an empty one included; an error
    /// leaves them alone.
    pub fn finish_organize(
        &mut self,
        ticket: OrganizeTicket,
        result: Result<Vec<Item>, OrganizeError>,
    ) -> OrganizeResolution {
        if ticket.generation != self.generation {
            log::info!(
                "Discarding organize result for {}; now on {}",
                ticket.date,
                self.plan.date
            );
            return OrganizeResolution::Discarded;
        }
        self.organizing = None;

        match result {
            Ok(items) => {
                let count = items.len();
                self.ingest_processed(items);
                OrganizeResolution::Applied { count }
            }
            Err(e) => {
                log::warn!("Organizing brain dump for {} failed: {}", ticket.date, e);
                OrganizeResolution::Failed(e)
            }
        }
    }

    /// Run a whole organize round trip for callers that can wait on it.
    pub async fn organize(&mut self, organizer: &TextOrganizer) -> Result<OrganizeResolution, StoreError> {
        let ticket = self.begin_organize()?;
        let result = organizer.organize(ticket.text()).await;
        Ok(self.finish_organize(ticket, result))
    }
}

fn load_or_new(storage: &dyn StorageAdapter, date: NaiveDate) -> DayPlan {
    match storage.load(date) {
        Ok(Some(mut plan)) => {
            if plan.date != date {
                log::warn!("Record for {} claims date {}, correcting", date, plan.date);
                plan.date = date;
            }
            if plan.normalize_slots() {
                log::warn!("Record for {} had malformed time slots, repaired", date);
            }
            plan
        }
        Ok(None) => {
            log::debug!("No plan stored for {}, starting fresh", date);
            DayPlan::new(date)
        }
        Err(e) => {
            log::warn!("Could not load plan for {}, starting fresh: {}", date, e);
            DayPlan::new(date)
        }
    }
}
