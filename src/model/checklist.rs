use serde::{Deserialize, Serialize};

use super::ordered::{Id, Ordered};

/// A named checklist attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: Id,
    pub task_id: Id,
    pub title: String,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

impl Checklist {
    /// (completed, total) item counts
    pub fn progress(&self) -> (usize, usize) {
        let done = self.items.iter().filter(|i| i.completed).count();
        (done, self.items.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Id,
    pub checklist_id: Id,
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub order_index: i64,
}

impl Ordered for Checklist {
    type Scope = Id;
    const SCOPE_FIELD: &'static str = "task_id";

    fn id(&self) -> Id {
        self.id
    }
    fn scope(&self) -> Id {
        self.task_id
    }
    fn set_scope(&mut self, scope: Id) {
        self.task_id = scope;
    }
    fn order_index(&self) -> i64 {
        self.order_index
    }
    fn set_order_index(&mut self, index: i64) {
        self.order_index = index;
    }
}

impl Ordered for ChecklistItem {
    type Scope = Id;
    const SCOPE_FIELD: &'static str = "checklist_id";

    fn id(&self) -> Id {
        self.id
    }
    fn scope(&self) -> Id {
        self.checklist_id
    }
    fn set_scope(&mut self, scope: Id) {
        self.checklist_id = scope;
    }
    fn order_index(&self) -> i64 {
        self.order_index
    }
    fn set_order_index(&mut self, index: i64) {
        self.order_index = index;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChecklist {
    pub task_id: Id,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChecklistItem {
    pub checklist_id: Id,
    pub content: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecklistItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counts_completed_items() {
        let item = |id, completed| ChecklistItem {
            id,
            checklist_id: 1,
            content: format!("item {}", id),
            completed,
            order_index: id,
        };
        let checklist = Checklist {
            id: 1,
            task_id: 9,
            title: "Packing".into(),
            order_index: 0,
            items: vec![item(0, true), item(1, false), item(2, true)],
        };
        assert_eq!(checklist.progress(), (2, 3));
    }
}
