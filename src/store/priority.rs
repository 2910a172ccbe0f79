use super::{StoreError, StoreResult, record, require_text};
use crate::api::Api;
use crate::model::{Id, NewPriority, Priority};

pub struct PriorityStore<'a> {
    api: &'a dyn Api,
    priorities: Vec<Priority>,
    error: Option<String>,
}

impl<'a> PriorityStore<'a> {
    pub fn new(api: &'a dyn Api) -> Self {
        PriorityStore {
            api,
            priorities: Vec::new(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn all(&self) -> &[Priority] {
        &self.priorities
    }

    /// Most urgent first
    pub fn by_level(&self) -> Vec<&Priority> {
        let mut out: Vec<&Priority> = self.priorities.iter().collect();
        out.sort_by(|a, b| b.level.cmp(&a.level).then(a.id.cmp(&b.id)));
        out
    }

    pub fn get(&self, id: Id) -> Option<&Priority> {
        self.priorities.iter().find(|p| p.id == id)
    }

    pub fn find(&self, name: &str) -> Option<&Priority> {
        let name = name.trim();
        self.priorities
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn load(&mut self) -> StoreResult<()> {
        self.error = None;
        self.priorities = self
            .api
            .list_priorities()
            .map_err(|e| record(&mut self.error, e))?;
        Ok(())
    }

    pub fn create(&mut self, name: &str, level: i32, color: Option<&str>) -> StoreResult<Priority> {
        self.error = None;
        let name = require_text(name, "name").map_err(|e| record(&mut self.error, e))?;
        let priority = self
            .api
            .create_priority(&NewPriority {
                name,
                level,
                color: color.map(str::to_string),
            })
            .map_err(|e| record(&mut self.error, e))?;
        self.priorities.push(priority.clone());
        Ok(priority)
    }

    pub fn update(
        &mut self,
        id: Id,
        name: &str,
        level: i32,
        color: Option<&str>,
    ) -> StoreResult<Priority> {
        self.error = None;
        let name = require_text(name, "name").map_err(|e| record(&mut self.error, e))?;
        if self.get(id).is_none() {
            return Err(record(
                &mut self.error,
                StoreError::UnknownId {
                    resource: "priority",
                    id,
                },
            ));
        }
        let priority = self
            .api
            .update_priority(
                id,
                &NewPriority {
                    name,
                    level,
                    color: color.map(str::to_string),
                },
            )
            .map_err(|e| record(&mut self.error, e))?;
        if let Some(cached) = self.priorities.iter_mut().find(|p| p.id == id) {
            *cached = priority.clone();
        }
        Ok(priority)
    }

    pub fn delete(&mut self, id: Id) -> StoreResult<()> {
        self.error = None;
        self.api
            .delete_priority(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.priorities.retain(|p| p.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;

    #[test]
    fn test_by_level_most_urgent_first() {
        let api = MemoryApi::new();
        let mut store = PriorityStore::new(&api);
        store.create("Low", 1, None).unwrap();
        store.create("Urgent", 4, Some("red")).unwrap();
        store.create("Normal", 2, None).unwrap();
        let names: Vec<&str> = store.by_level().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Urgent", "Normal", "Low"]);
    }

    #[test]
    fn test_update_unknown_is_local_error() {
        let api = MemoryApi::new();
        let mut store = PriorityStore::new(&api);
        assert!(matches!(
            store.update(9, "High", 3, None),
            Err(StoreError::UnknownId { id: 9, .. })
        ));
        assert!(api.calls().is_empty());
    }
}
