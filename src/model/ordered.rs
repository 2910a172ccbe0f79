use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;
use serde::ser::SerializeMap;

/// Server-assigned identifier shared by every resource.
pub type Id = i64;

/// An item that lives at a position inside a parent scope.
///
/// `order_index` values of all items sharing a scope form a permutation of
/// `0..count` once a reorder has settled.
pub trait Ordered {
    /// Parent scope key. `Id` for most resources, `Option<Id>` for the
    /// project tree where `None` is the root.
    type Scope: Copy + Eq + Hash + Debug + Serialize;

    /// Name of the scope field on the wire (`section_id`, `parent_id`, ...)
    const SCOPE_FIELD: &'static str;

    fn id(&self) -> Id;
    fn scope(&self) -> Self::Scope;
    fn set_scope(&mut self, scope: Self::Scope);
    fn order_index(&self) -> i64;
    fn set_order_index(&mut self, index: i64);
}

/// One `{id, <scope field>, order_index}` triple of a reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderEntry<S> {
    pub id: Id,
    pub scope: S,
    pub order_index: i64,
    pub scope_field: &'static str,
}

impl<S> ReorderEntry<S> {
    /// Build a triple for an `Ordered` type, picking up its scope field name.
    pub fn of<T: Ordered<Scope = S>>(id: Id, scope: S, order_index: i64) -> Self {
        ReorderEntry {
            id,
            scope,
            order_index,
            scope_field: T::SCOPE_FIELD,
        }
    }
}

impl<S: Serialize> Serialize for ReorderEntry<S> {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry(self.scope_field, &self.scope)?;
        map.serialize_entry("order_index", &self.order_index)?;
        map.end()
    }
}

/// Where to put a newly created item inside its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// Append after the last sibling
    #[default]
    End,
    /// Insert at this 0-based index, shifting later siblings down
    At(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_entry_uses_scope_field_name() {
        let entry = ReorderEntry {
            id: 7,
            scope: 3,
            order_index: 1,
            scope_field: "section_id",
        };
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 7, "section_id": 3, "order_index": 1})
        );
    }

    #[test]
    fn test_reorder_entry_root_scope_is_null() {
        let entry: ReorderEntry<Option<Id>> = ReorderEntry {
            id: 1,
            scope: None,
            order_index: 0,
            scope_field: "parent_id",
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"id":1,"parent_id":null,"order_index":0}"#);
    }
}
