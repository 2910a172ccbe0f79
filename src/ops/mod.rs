pub mod check;
pub mod filter;
pub mod links;
pub mod media_csv;
pub mod reorder;
pub mod streak;
pub mod weekday;
