use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ordered::{Id, Ordered};

/// A task card inside a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Id,
    pub section_id: Id,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority_id: Option<Id>,
    #[serde(default)]
    pub label_ids: Vec<Id>,
    /// Set when this task is an instance generated from a recurrence
    #[serde(default)]
    pub recurring_task_id: Option<Id>,
    #[serde(default)]
    pub order_index: i64,
}

impl Task {
    pub fn has_label(&self, label_id: Id) -> bool {
        self.label_ids.contains(&label_id)
    }
}

impl Ordered for Task {
    type Scope = Id;
    const SCOPE_FIELD: &'static str = "section_id";

    fn id(&self) -> Id {
        self.id
    }
    fn scope(&self) -> Id {
        self.section_id
    }
    fn set_scope(&mut self, scope: Id) {
        self.section_id = scope;
    }
    fn order_index(&self) -> i64 {
        self.order_index
    }
    fn set_order_index(&mut self, index: i64) {
        self.order_index = index;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub section_id: Id,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<Id>,
    #[serde(default)]
    pub label_ids: Vec<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_task_id: Option<Id>,
    pub order_index: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<Id>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority_id.is_none()
            && self.label_ids.is_none()
    }
}

/// Response of the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub task: Task,
    /// The server generated the next occurrence of a recurring task
    #[serde(default)]
    pub next_instance_created: bool,
}
