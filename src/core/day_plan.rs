use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::{Item, MAX_PRIORITIES, PriorityItem};
use super::time_slot::{HOURS_PER_DAY, TimeSlot, format_hour_short, is_valid_hour};
use super::transition::Zone;

const STORAGE_KEY_PREFIX: &str = "timebox-";

/// Everything planned for one calendar date. This is the unit of persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub date: NaiveDate,
    #[serde(default)]
    pub brain_dump: String,
    #[serde(default)]
    pub processed_items: Vec<Item>,
    #[serde(default)]
    pub priorities: Vec<PriorityItem>,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
}

/// One line of the hour-by-hour overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewRow {
    pub hour: u8,
    pub label: String,
    pub task: String,
    pub items: Vec<String>,
    pub completed: bool,
    pub is_current: bool,
}

impl DayPlan {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            brain_dump: String::new(),
            processed_items: Vec::new(),
            priorities: Vec::new(),
            time_slots: (0..HOURS_PER_DAY).map(|hour| TimeSlot::new(date, hour)).collect(),
        }
    }

    pub fn storage_key(&self) -> String {
        storage_key(self.date)
    }

    pub fn is_stale(&self, selected: NaiveDate) -> bool {
        self.date != selected
    }

    /// Restore the one-slot-per-hour shape on a record that lost slots.
    /// Returns true if anything had to be added or reordered.
    pub fn normalize_slots(&mut self) -> bool {
        let before = self.time_slots.len();
        self.time_slots.retain(|slot| is_valid_hour(slot.hour));
        let mut seen = [false; HOURS_PER_DAY as usize];
        self.time_slots.retain(|slot| !std::mem::replace(&mut seen[slot.hour as usize], true));

        let mut changed = self.time_slots.len() != before;
        for hour in 0..HOURS_PER_DAY {
            if !seen[hour as usize] {
                self.time_slots.push(TimeSlot::new(self.date, hour));
                changed = true;
            }
        }
        if !self.time_slots.is_sorted_by_key(|slot| slot.hour) {
            self.time_slots.sort_by_key(|slot| slot.hour);
            changed = true;
        }
        changed
    }

    pub fn slot(&self, hour: u8) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|slot| slot.hour == hour)
    }

    pub fn slot_mut(&mut self, hour: u8) -> Option<&mut TimeSlot> {
        self.time_slots.iter_mut().find(|slot| slot.hour == hour)
    }

    pub fn priorities_full(&self) -> bool {
        self.priorities.len() >= MAX_PRIORITIES
    }

    /// Rewrite every rank to match list position.
    pub fn renumber_priorities(&mut self) {
        for (idx, entry) in self.priorities.iter_mut().enumerate() {
            entry.priority = (idx + 1) as u8;
        }
    }

    pub fn take_processed(&mut self, id: Uuid) -> Option<Item> {
        let pos = self.processed_items.iter().position(|item| item.id == id)?;
        Some(self.processed_items.remove(pos))
    }

    pub fn take_priority(&mut self, id: Uuid) -> Option<PriorityItem> {
        let pos = self.priorities.iter().position(|entry| entry.id() == id)?;
        let removed = self.priorities.remove(pos);
        self.renumber_priorities();
        Some(removed)
    }

    /// Which collection currently holds `id`.
    pub fn locate(&self, id: Uuid) -> Option<Zone> {
        if self.processed_items.iter().any(|item| item.id == id) {
            return Some(Zone::Processed);
        }
        if self.priorities.iter().any(|entry| entry.id() == id) {
            return Some(Zone::Priorities);
        }
        self.time_slots
            .iter()
            .find(|slot| slot.dragged_items.iter().any(|item| item.id == id))
            .map(|slot| Zone::Slot(slot.hour))
    }

    /// Total items across processed, priorities and every slot.
    pub fn item_count(&self) -> usize {
        self.processed_items.len()
            + self.priorities.len()
            + self.time_slots.iter().map(|slot| slot.dragged_items.len()).sum::<usize>()
    }

    /// Hour-by-hour summary. The current hour is flagged only when `now`
    /// falls on this plan's date.
    pub fn overview(&self, now: NaiveDateTime) -> Vec<OverviewRow> {
        let current = (now.date() == self.date).then(|| now.hour() as u8);
        self.time_slots
            .iter()
            .map(|slot| OverviewRow {
                hour: slot.hour,
                label: format_hour_short(slot.hour),
                task: slot.task.clone(),
                items: slot.dragged_items.iter().map(|item| item.text.clone()).collect(),
                completed: slot.completed,
                is_current: current == Some(slot.hour),
            })
            .collect()
    }
}

pub fn storage_key(date: NaiveDate) -> String {
    format!("{}{}", STORAGE_KEY_PREFIX, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn new_plan_has_one_slot_per_hour() {
        let plan = DayPlan::new(date());
        assert_eq!(plan.time_slots.len(), 24);
        for (idx, slot) in plan.time_slots.iter().enumerate() {
            assert_eq!(slot.hour as usize, idx);
            assert!(slot.is_empty());
            assert!(!slot.completed);
        }
        assert_eq!(plan.storage_key(), "timebox-2026-10-19");
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let plan = DayPlan::new(date());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["date"], "2026-10-19");
        assert_eq!(json["brainDump"], "");
        assert!(json["processedItems"].as_array().unwrap().is_empty());
        assert_eq!(json["timeSlots"][3]["draggedItems"], serde_json::json!([]));
    }

    #[test]
    fn normalize_fills_missing_hours() {
        let mut plan = DayPlan::new(date());
        plan.time_slots.retain(|slot| slot.hour % 2 == 0);
        plan.time_slots.reverse();

        assert!(plan.normalize_slots());
        let hours: Vec<u8> = plan.time_slots.iter().map(|slot| slot.hour).collect();
        assert_eq!(hours, (0..24).collect::<Vec<u8>>());
        assert!(!plan.normalize_slots());
    }

    #[test]
    fn normalize_drops_duplicates_and_bad_hours() {
        let mut plan = DayPlan::new(date());
        let mut dup = TimeSlot::new(date(), 5);
        dup.task = "duplicate".into();
        plan.time_slots.push(dup);
        plan.time_slots.push(TimeSlot::new(date(), 30));

        assert!(plan.normalize_slots());
        assert_eq!(plan.time_slots.len(), 24);
        assert_eq!(plan.slot(5).unwrap().task, "");
    }

    #[test]
    fn take_priority_renumbers_remaining() {
        let mut plan = DayPlan::new(date());
        let items: Vec<Item> = ["a", "b", "c"].iter().map(|t| Item::new(*t, None)).collect();
        for (idx, item) in items.iter().enumerate() {
            plan.priorities.push(PriorityItem::new(item.clone(), idx as u8 + 1));
        }

        plan.take_priority(items[0].id).unwrap();
        let ranks: Vec<(String, u8)> = plan
            .priorities
            .iter()
            .map(|p| (p.item.text.clone(), p.priority))
            .collect();
        assert_eq!(ranks, vec![("b".to_string(), 1), ("c".to_string(), 2)]);
    }

    #[test]
    fn locate_finds_each_collection() {
        let mut plan = DayPlan::new(date());
        let processed = Item::new("p", None);
        let ranked = Item::new("r", None);
        let scheduled = Item::new("s", None);
        let ids = (processed.id, ranked.id, scheduled.id);
        plan.processed_items.push(processed);
        plan.priorities.push(PriorityItem::new(ranked, 1));
        plan.slot_mut(17).unwrap().dragged_items.push(scheduled);

        assert_eq!(plan.locate(ids.0), Some(Zone::Processed));
        assert_eq!(plan.locate(ids.1), Some(Zone::Priorities));
        assert_eq!(plan.locate(ids.2), Some(Zone::Slot(17)));
        assert_eq!(plan.locate(Uuid::new_v4()), None);
        assert_eq!(plan.item_count(), 3);
    }

    #[test]
    fn overview_marks_current_hour_only_today() {
        let mut plan = DayPlan::new(date());
        plan.slot_mut(14).unwrap().task = "Review".into();

        let now = date().and_hms_opt(14, 30, 0).unwrap();
        let rows = plan.overview(now);
        assert_eq!(rows.len(), 24);
        assert!(rows[14].is_current);
        assert_eq!(rows[14].label, "2 PM");
        assert_eq!(rows[14].task, "Review");
        assert_eq!(rows.iter().filter(|r| r.is_current).count(), 1);

        let tomorrow = date().succ_opt().unwrap().and_hms_opt(14, 0, 0).unwrap();
        assert!(plan.overview(tomorrow).iter().all(|r| !r.is_current));
    }
}
