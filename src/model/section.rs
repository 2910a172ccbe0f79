use serde::{Deserialize, Serialize};

use super::ordered::{Id, Ordered};

/// A column of a project board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: Id,
    pub project_id: Id,
    pub name: String,
    #[serde(default)]
    pub order_index: i64,
}

impl Ordered for Section {
    type Scope = Id;
    const SCOPE_FIELD: &'static str = "project_id";

    fn id(&self) -> Id {
        self.id
    }
    fn scope(&self) -> Id {
        self.project_id
    }
    fn set_scope(&mut self, scope: Id) {
        self.project_id = scope;
    }
    fn order_index(&self) -> i64 {
        self.order_index
    }
    fn set_order_index(&mut self, index: i64) {
        self.order_index = index;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSection {
    pub project_id: Id,
    pub name: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
