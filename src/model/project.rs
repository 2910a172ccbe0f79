use serde::{Deserialize, Serialize};

use super::ordered::{Id, Ordered};

/// How a project's sections are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardView {
    #[default]
    Kanban,
    List,
}

/// A project node. Projects nest through `parent_id`; `order_index` is
/// scoped to the parent (`None` = top level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub view: BoardView,
}

impl Ordered for Project {
    type Scope = Option<Id>;
    const SCOPE_FIELD: &'static str = "parent_id";

    fn id(&self) -> Id {
        self.id
    }
    fn scope(&self) -> Option<Id> {
        self.parent_id
    }
    fn set_scope(&mut self, scope: Option<Id>) {
        self.parent_id = scope;
    }
    fn order_index(&self) -> i64 {
        self.order_index
    }
    fn set_order_index(&mut self, index: i64) {
        self.order_index = index;
    }
}

/// Body of a project create request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub parent_id: Option<Id>,
    pub order_index: i64,
    #[serde(default)]
    pub view: BoardView,
}

/// Partial update of a project; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<BoardView>,
}
