use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ordered::Id;

/// One task completion event, as reported by the statistics endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub task_id: Id,
    pub completed_at: DateTime<Utc>,
}
