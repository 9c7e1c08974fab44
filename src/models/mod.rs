pub mod entry;
pub mod listing;
pub mod rule;
