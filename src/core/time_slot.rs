use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::Item;

pub const HOURS_PER_DAY: u8 = 24;

pub fn is_valid_hour(hour: u8) -> bool {
    hour < HOURS_PER_DAY
}

/// One hourly container: a free-text task/notes pair plus any items
/// dragged onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: String,
    pub hour: u8,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub dragged_items: Vec<Item>,
    #[serde(default)]
    pub completed: bool,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, hour: u8) -> Self {
        Self {
            id: slot_id(date, hour),
            hour,
            task: String::new(),
            notes: String::new(),
            dragged_items: Vec::new(),
            completed: false,
        }
    }

    /// Reset task, notes and scheduled items. Completion is left alone.
    pub fn clear(&mut self) {
        self.task.clear();
        self.notes.clear();
        self.dragged_items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.task.is_empty() && self.notes.is_empty() && self.dragged_items.is_empty()
    }

    pub fn find_item_mut(&mut self, id: Uuid) -> Option<&mut Item> {
        self.dragged_items.iter_mut().find(|item| item.id == id)
    }

    pub fn take_item(&mut self, id: Uuid) -> Option<Item> {
        let pos = self.dragged_items.iter().position(|item| item.id == id)?;
        Some(self.dragged_items.remove(pos))
    }

    pub fn label(&self) -> String {
        format_hour(self.hour)
    }
}

pub fn slot_id(date: NaiveDate, hour: u8) -> String {
    format!("{}-{}", date.format("%Y-%m-%d"), hour)
}

fn twelve_hour(hour: u8) -> (u8, &'static str) {
    match hour {
        0 => (12, "AM"),
        12 => (12, "PM"),
        h if h < 12 => (h, "AM"),
        h => (h - 12, "PM"),
    }
}

/// "12:00 AM", "9:00 AM", "3:00 PM"
pub fn format_hour(hour: u8) -> String {
    let (h, meridiem) = twelve_hour(hour);
    format!("{}:00 {}", h, meridiem)
}

/// Compact label used by the daily overview: "12 AM", "3 PM".
pub fn format_hour_short(hour: u8) -> String {
    let (h, meridiem) = twelve_hour(hour);
    format!("{} {}", h, meridiem)
}
