use super::{StoreError, StoreResult, record, require_text};
use crate::api::Api;
use crate::model::{Id, Label, NewLabel};

pub struct LabelStore<'a> {
    api: &'a dyn Api,
    labels: Vec<Label>,
    error: Option<String>,
}

impl<'a> LabelStore<'a> {
    pub fn new(api: &'a dyn Api) -> Self {
        LabelStore {
            api,
            labels: Vec::new(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Labels sorted by name
    pub fn labels(&self) -> Vec<&Label> {
        let mut out: Vec<&Label> = self.labels.iter().collect();
        out.sort_by_key(|l| l.name.to_lowercase());
        out
    }

    pub fn get(&self, id: Id) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    /// Case-insensitive lookup by name
    pub fn find(&self, name: &str) -> Option<&Label> {
        let name = name.trim();
        self.labels.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn load(&mut self) -> StoreResult<()> {
        self.error = None;
        self.labels = self
            .api
            .list_labels()
            .map_err(|e| record(&mut self.error, e))?;
        Ok(())
    }

    pub fn create(&mut self, name: &str, color: Option<&str>) -> StoreResult<Label> {
        self.error = None;
        let name = require_text(name, "name").map_err(|e| record(&mut self.error, e))?;
        if self.find(&name).is_some() {
            return Err(record(
                &mut self.error,
                StoreError::Validation(format!("label '{}' already exists", name)),
            ));
        }
        let label = self
            .api
            .create_label(&NewLabel {
                name,
                color: color.map(str::to_string),
            })
            .map_err(|e| record(&mut self.error, e))?;
        self.labels.push(label.clone());
        Ok(label)
    }

    pub fn update(&mut self, id: Id, name: &str, color: Option<&str>) -> StoreResult<Label> {
        self.error = None;
        let name = require_text(name, "name").map_err(|e| record(&mut self.error, e))?;
        if self.get(id).is_none() {
            return Err(record(
                &mut self.error,
                StoreError::UnknownId { resource: "label", id },
            ));
        }
        let label = self
            .api
            .update_label(
                id,
                &NewLabel {
                    name,
                    color: color.map(str::to_string),
                },
            )
            .map_err(|e| record(&mut self.error, e))?;
        if let Some(cached) = self.labels.iter_mut().find(|l| l.id == id) {
            *cached = label.clone();
        }
        Ok(label)
    }

    pub fn delete(&mut self, id: Id) -> StoreResult<()> {
        self.error = None;
        self.api
            .delete_label(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.labels.retain(|l| l.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;

    #[test]
    fn test_create_find_and_delete() {
        let api = MemoryApi::new();
        let mut store = LabelStore::new(&api);
        let errand = store.create("errand", Some("#f80")).unwrap();
        store.create("Home", None).unwrap();

        assert_eq!(store.find("ERRAND").unwrap().id, errand.id);
        let names: Vec<&str> = store.labels().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["errand", "Home"]);

        store.delete(errand.id).unwrap();
        assert!(store.get(errand.id).is_none());
    }

    #[test]
    fn test_duplicate_name_rejected_locally() {
        let api = MemoryApi::new();
        let mut store = LabelStore::new(&api);
        store.create("home", None).unwrap();
        api.clear_calls();
        assert!(matches!(
            store.create(" Home ", None),
            Err(StoreError::Validation(_))
        ));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_load_failure_keeps_labels() {
        let api = MemoryApi::new();
        let mut store = LabelStore::new(&api);
        store.create("home", None).unwrap();
        api.fail("list_labels");
        assert!(store.load().is_err());
        assert_eq!(store.labels().len(), 1);
        assert!(store.error().is_some());
    }
}
