use super::{
    StoreError, StoreResult, compact_cached, place_created, record, reorder_cached, replace_scope,
    require_text,
};
use crate::api::Api;
use crate::model::{Id, NewSection, Position, Section, SectionPatch};
use crate::ops::reorder::{ReorderOutcome, index_for};

/// Sections of one or more project boards
pub struct SectionStore<'a> {
    api: &'a dyn Api,
    sections: Vec<Section>,
    error: Option<String>,
}

impl<'a> SectionStore<'a> {
    pub fn new(api: &'a dyn Api) -> Self {
        SectionStore {
            api,
            sections: Vec::new(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn all(&self) -> &[Section] {
        &self.sections
    }

    pub fn get(&self, id: Id) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Sections of a project in board order
    pub fn in_project(&self, project_id: Id) -> Vec<&Section> {
        let mut out: Vec<&Section> = self
            .sections
            .iter()
            .filter(|s| s.project_id == project_id)
            .collect();
        out.sort_by_key(|s| (s.order_index, s.id));
        out
    }

    /// Fetch a project's sections. On failure the cached ones are kept.
    pub fn load(&mut self, project_id: Id) -> StoreResult<()> {
        self.error = None;
        let fresh = self
            .api
            .list_sections(project_id)
            .map_err(|e| record(&mut self.error, e))?;
        replace_scope(&mut self.sections, project_id, fresh);
        Ok(())
    }

    pub fn create(&mut self, project_id: Id, name: &str, position: Position) -> StoreResult<Section> {
        self.error = None;
        let name = require_text(name, "name").map_err(|e| record(&mut self.error, e))?;
        let siblings = self.in_project(project_id).len();
        let section = self
            .api
            .create_section(&NewSection {
                project_id,
                name,
                order_index: index_for(position, siblings),
            })
            .map_err(|e| record(&mut self.error, e))?;
        tracing::debug!(id = section.id, project_id, "section created");

        let api = self.api;
        place_created(
            &mut self.sections,
            section.clone(),
            position,
            &mut self.error,
            |entries| api.reorder_sections(entries),
            |scope| api.list_sections(scope),
        )?;
        Ok(self.get(section.id).cloned().unwrap_or(section))
    }

    pub fn rename(&mut self, id: Id, name: &str) -> StoreResult<Section> {
        self.error = None;
        let name = require_text(name, "name").map_err(|e| record(&mut self.error, e))?;
        if self.get(id).is_none() {
            return Err(record(
                &mut self.error,
                StoreError::UnknownId {
                    resource: "section",
                    id,
                },
            ));
        }
        let updated = self
            .api
            .update_section(id, &SectionPatch { name: Some(name) })
            .map_err(|e| record(&mut self.error, e))?;
        if let Some(cached) = self.sections.iter_mut().find(|s| s.id == id) {
            *cached = updated.clone();
        }
        Ok(updated)
    }

    /// Delete a section, then close the gap it left in its project.
    pub fn delete(&mut self, id: Id) -> StoreResult<ReorderOutcome> {
        self.error = None;
        let project_id = match self.get(id) {
            Some(section) => section.project_id,
            None => {
                return Err(record(
                    &mut self.error,
                    StoreError::UnknownId {
                        resource: "section",
                        id,
                    },
                ));
            }
        };
        self.api
            .delete_section(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.sections.retain(|s| s.id != id);

        let api = self.api;
        compact_cached(
            &mut self.sections,
            project_id,
            &mut self.error,
            |entries| api.reorder_sections(entries),
            |scope| api.list_sections(scope),
        )
    }

    pub fn reorder(&mut self, project_id: Id, ordered_ids: &[Id]) -> StoreResult<ReorderOutcome> {
        self.error = None;
        let api = self.api;
        reorder_cached(
            &mut self.sections,
            project_id,
            ordered_ids,
            &mut self.error,
            |entries| api.reorder_sections(entries),
            |scope| api.list_sections(scope),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::model::NewProject;

    fn setup(api: &MemoryApi) -> Id {
        api.create_project(&NewProject {
            name: "Board".into(),
            ..Default::default()
        })
        .unwrap()
        .id
    }

    fn names(store: &SectionStore, project_id: Id) -> Vec<String> {
        store
            .in_project(project_id)
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    #[test]
    fn test_create_appends_and_inserts() {
        let api = MemoryApi::new();
        let project = setup(&api);
        let mut store = SectionStore::new(&api);
        store.create(project, "Todo", Position::End).unwrap();
        store.create(project, "Done", Position::End).unwrap();
        store.create(project, "Doing", Position::At(1)).unwrap();

        assert_eq!(names(&store, project), vec!["Todo", "Doing", "Done"]);
        let server: Vec<String> = api.sections_in(project).into_iter().map(|s| s.name).collect();
        assert_eq!(server, vec!["Todo", "Doing", "Done"]);
        let indices: Vec<i64> = store.in_project(project).iter().map(|s| s.order_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_name_never_reaches_server() {
        let api = MemoryApi::new();
        let project = setup(&api);
        api.clear_calls();
        let mut store = SectionStore::new(&api);
        let err = store.create(project, "   ", Position::End).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.error().is_some());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_delete_compacts_siblings() {
        let api = MemoryApi::new();
        let project = setup(&api);
        let mut store = SectionStore::new(&api);
        let a = store.create(project, "a", Position::End).unwrap();
        store.create(project, "b", Position::End).unwrap();
        store.create(project, "c", Position::End).unwrap();

        let outcome = store.delete(a.id).unwrap();
        assert_eq!(outcome, ReorderOutcome::Settled);
        let server: Vec<(String, i64)> = api
            .sections_in(project)
            .into_iter()
            .map(|s| (s.name, s.order_index))
            .collect();
        assert_eq!(server, vec![("b".to_string(), 0), ("c".to_string(), 1)]);
    }

    #[test]
    fn test_reorder_failure_reloads_project_once() {
        let api = MemoryApi::new();
        let project = setup(&api);
        let mut store = SectionStore::new(&api);
        let a = store.create(project, "a", Position::End).unwrap();
        let b = store.create(project, "b", Position::End).unwrap();
        api.fail("reorder_sections");
        api.clear_calls();

        let outcome = store.reorder(project, &[b.id, a.id]).unwrap();
        assert!(!outcome.is_settled());
        assert!(store.error().is_some());
        assert_eq!(api.count("list_sections", Some(project)), 1);
        assert_eq!(names(&store, project), vec!["a", "b"]);
    }

    #[test]
    fn test_load_failure_keeps_cache() {
        let api = MemoryApi::new();
        let project = setup(&api);
        let mut store = SectionStore::new(&api);
        store.create(project, "a", Position::End).unwrap();
        api.fail("list_sections");
        assert!(store.load(project).is_err());
        assert!(store.error().is_some());
        assert_eq!(store.in_project(project).len(), 1);
    }
}
