use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::ordered::{Id, Ordered};

/// Structured result from `pk check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub scopes_checked: usize,
    pub errors: Vec<CheckError>,
}

/// A violation of the ordering invariant inside one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// Two items in the same scope share an index
    #[serde(rename = "duplicate_index")]
    DuplicateIndex {
        resource: String,
        scope: String,
        order_index: i64,
        ids: Vec<Id>,
    },
    /// Indices skip a value (or start above zero)
    #[serde(rename = "gap")]
    Gap {
        resource: String,
        scope: String,
        missing_index: i64,
    },
    /// A negative index
    #[serde(rename = "negative_index")]
    NegativeIndex {
        resource: String,
        scope: String,
        id: Id,
        order_index: i64,
    },
}

impl CheckResult {
    pub fn new() -> Self {
        CheckResult {
            valid: true,
            ..Default::default()
        }
    }

    /// Check one collection and fold its findings into this result.
    ///
    /// For every scope the indices must be exactly `0..count`.
    pub fn check_collection<T: Ordered>(&mut self, resource: &str, items: &[T]) {
        let mut by_scope: HashMap<T::Scope, BTreeMap<i64, Vec<Id>>> = HashMap::new();
        for item in items {
            by_scope
                .entry(item.scope())
                .or_default()
                .entry(item.order_index())
                .or_default()
                .push(item.id());
        }

        let mut scopes: Vec<_> = by_scope.into_iter().collect();
        scopes.sort_by_key(|(scope, _)| scope_label(scope));

        for (scope, indices) in scopes {
            self.scopes_checked += 1;
            let scope_str = scope_label(&scope);
            let count: usize = indices.values().map(|ids| ids.len()).sum();

            for (&order_index, ids) in &indices {
                if order_index < 0 {
                    for &id in ids {
                        self.errors.push(CheckError::NegativeIndex {
                            resource: resource.to_string(),
                            scope: scope_str.clone(),
                            id,
                            order_index,
                        });
                    }
                }
                if ids.len() > 1 {
                    let mut ids = ids.clone();
                    ids.sort();
                    self.errors.push(CheckError::DuplicateIndex {
                        resource: resource.to_string(),
                        scope: scope_str.clone(),
                        order_index,
                        ids,
                    });
                }
            }

            for expected in 0..count as i64 {
                if !indices.contains_key(&expected) {
                    self.errors.push(CheckError::Gap {
                        resource: resource.to_string(),
                        scope: scope_str.clone(),
                        missing_index: expected,
                    });
                }
            }
        }

        self.valid = self.errors.is_empty();
    }
}

/// Scope as shown in reports: the parent id, or `root` for top-level projects.
fn scope_label<S: Serialize>(scope: &S) -> String {
    match serde_json::to_value(scope) {
        Ok(serde_json::Value::Null) => "root".to_string(),
        Ok(value) => value.to_string(),
        Err(_) => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project::Project;
    use crate::model::section::Section;

    fn section(id: Id, project_id: Id, order_index: i64) -> Section {
        Section {
            id,
            project_id,
            name: format!("s{}", id),
            order_index,
        }
    }

    #[test]
    fn test_contiguous_scopes_are_valid() {
        let sections = vec![
            section(1, 1, 1),
            section(2, 1, 0),
            section(3, 2, 0),
        ];
        let mut result = CheckResult::new();
        result.check_collection("section", &sections);
        assert!(result.valid);
        assert_eq!(result.scopes_checked, 2);
    }

    #[test]
    fn test_gap_and_duplicate_reported() {
        let sections = vec![section(1, 1, 0), section(2, 1, 0), section(3, 1, 3)];
        let mut result = CheckResult::new();
        result.check_collection("section", &sections);
        assert!(!result.valid);
        assert!(result.errors.contains(&CheckError::DuplicateIndex {
            resource: "section".into(),
            scope: "1".into(),
            order_index: 0,
            ids: vec![1, 2],
        }));
        // count is 3, so 1 and 2 are both missing
        let gaps: Vec<i64> = result
            .errors
            .iter()
            .filter_map(|e| match e {
                CheckError::Gap { missing_index, .. } => Some(*missing_index),
                _ => None,
            })
            .collect();
        assert_eq!(gaps, vec![1, 2]);
    }

    #[test]
    fn test_project_scopes_read_as_ids_and_root() {
        let project = |id: Id, parent_id: Option<Id>| Project {
            id,
            name: format!("p{}", id),
            description: None,
            color: None,
            parent_id,
            order_index: 1,
            view: Default::default(),
        };
        let mut result = CheckResult::new();
        result.check_collection("project", &[project(1, None), project(2, Some(3))]);
        let scopes: Vec<&str> = result
            .errors
            .iter()
            .filter_map(|e| match e {
                CheckError::Gap { scope, .. } => Some(scope.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(scopes, vec!["3", "root"]);
    }

    #[test]
    fn test_negative_index_reported() {
        let sections = vec![section(1, 1, -1)];
        let mut result = CheckResult::new();
        result.check_collection("section", &sections);
        assert!(matches!(
            result.errors[0],
            CheckError::NegativeIndex { id: 1, .. }
        ));
    }

    #[test]
    fn test_json_shape() {
        let sections = vec![section(1, 4, 1)];
        let mut result = CheckResult::new();
        result.check_collection("section", &sections);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["errors"][0]["type"], "gap");
        assert_eq!(json["errors"][0]["missing_index"], 0);
    }
}
