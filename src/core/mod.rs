pub mod day_plan;
pub mod item;
pub mod time_slot;
pub mod transition;
