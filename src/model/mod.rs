pub mod catalog;
pub mod checklist;
pub mod config;
pub mod media;
pub mod note;
pub mod ordered;
pub mod project;
pub mod recurrence;
pub mod section;
pub mod stats;
pub mod task;

pub use catalog::*;
pub use checklist::*;
pub use config::*;
pub use media::*;
pub use note::*;
pub use ordered::*;
pub use project::*;
pub use recurrence::*;
pub use section::*;
pub use stats::*;
pub use task::*;
