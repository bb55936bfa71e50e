use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CATEGORY_GENERAL: &str = "General";
pub const CATEGORY_MANUAL: &str = "Manual";

/// Maximum number of items that can be promoted to priorities.
pub const MAX_PRIORITIES: usize = 3;

/// A discrete unit of work derived from the brain dump or added by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl Item {
    pub fn new(text: impl Into<String>, category: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            category,
            completed: false,
        }
    }

    pub fn manual(text: impl Into<String>) -> Self {
        Self::new(text, Some(CATEGORY_MANUAL.to_string()))
    }

    pub fn toggle_completed(&mut self) {
        self.completed = !self.completed;
    }
}

/// An item promoted to the day's priorities. `priority` is the 1-based rank
/// it held when written; list order is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityItem {
    #[serde(flatten)]
    pub item: Item,
    pub priority: u8,
}

impl PriorityItem {
    pub fn new(item: Item, priority: u8) -> Self {
        Self { item, priority }
    }

    pub fn id(&self) -> Uuid {
        self.item.id
    }

    /// Drop the rank and hand back the plain item.
    pub fn into_item(self) -> Item {
        self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_items_are_categorized() {
        let item = Item::manual("Call the plumber");
        assert_eq!(item.category.as_deref(), Some(CATEGORY_MANUAL));
        assert!(!item.completed);
    }

    #[test]
    fn fresh_items_get_distinct_ids() {
        let a = Item::new("a", None);
        let b = Item::new("a", None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn priority_item_serializes_flat() {
        let item = Item::new("Write report", Some(CATEGORY_GENERAL.into()));
        let id = item.id;
        let json = serde_json::to_value(PriorityItem::new(item, 2)).unwrap();
        assert_eq!(json["id"], serde_json::json!(id));
        assert_eq!(json["text"], "Write report");
        assert_eq!(json["priority"], 2);
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn missing_completed_defaults_to_false() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"id":"{}","text":"Stretch"}}"#, id);
        let item: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(item.id, id);
        assert!(!item.completed);
        assert_eq!(item.category, None);
    }
}
