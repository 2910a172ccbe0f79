use super::{
    StoreError, StoreResult, compact_cached, place_created, record, reorder_cached, replace_scope,
    require_text,
};
use crate::api::{Api, ApiError, ApiResult};
use crate::model::{
    Checklist, ChecklistItem, ChecklistItemPatch, Id, NewChecklist, NewChecklistItem, Position,
};
use crate::ops::reorder::{ReorderOutcome, index_for, ordering_with};

/// Checklists of loaded tasks. Items are cached in their own flat list so
/// both levels go through the same reorder path.
pub struct ChecklistStore<'a> {
    api: &'a dyn Api,
    /// Always stored with `items` empty
    checklists: Vec<Checklist>,
    items: Vec<ChecklistItem>,
    error: Option<String>,
}

/// Reload the items of one checklist through its task's listing.
fn reload_items(
    api: &dyn Api,
    checklists: &[Checklist],
    checklist_id: Id,
) -> ApiResult<Vec<ChecklistItem>> {
    let task_id = checklists
        .iter()
        .find(|c| c.id == checklist_id)
        .map(|c| c.task_id)
        .ok_or(ApiError::NotFound {
            resource: "checklist",
            id: checklist_id,
        })?;
    Ok(api
        .list_checklists(task_id)?
        .into_iter()
        .find(|c| c.id == checklist_id)
        .map(|c| c.items)
        .unwrap_or_default())
}

impl<'a> ChecklistStore<'a> {
    pub fn new(api: &'a dyn Api) -> Self {
        ChecklistStore {
            api,
            checklists: Vec::new(),
            items: Vec::new(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn get(&self, id: Id) -> Option<&Checklist> {
        self.checklists.iter().find(|c| c.id == id)
    }

    pub fn item(&self, id: Id) -> Option<&ChecklistItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn for_task(&self, task_id: Id) -> Vec<&Checklist> {
        let mut out: Vec<&Checklist> = self
            .checklists
            .iter()
            .filter(|c| c.task_id == task_id)
            .collect();
        out.sort_by_key(|c| (c.order_index, c.id));
        out
    }

    pub fn items_of(&self, checklist_id: Id) -> Vec<&ChecklistItem> {
        let mut out: Vec<&ChecklistItem> = self
            .items
            .iter()
            .filter(|i| i.checklist_id == checklist_id)
            .collect();
        out.sort_by_key(|i| (i.order_index, i.id));
        out
    }

    /// (completed, total) items of a checklist
    pub fn progress(&self, checklist_id: Id) -> (usize, usize) {
        let items = self.items_of(checklist_id);
        let done = items.iter().filter(|i| i.completed).count();
        (done, items.len())
    }

    /// A checklist with its items filled in, for display
    pub fn assembled(&self, checklist_id: Id) -> Option<Checklist> {
        let mut checklist = self.get(checklist_id)?.clone();
        checklist.items = self.items_of(checklist_id).into_iter().cloned().collect();
        Some(checklist)
    }

    pub fn load(&mut self, task_id: Id) -> StoreResult<()> {
        self.error = None;
        let fresh = self
            .api
            .list_checklists(task_id)
            .map_err(|e| record(&mut self.error, e))?;
        let mut bare = Vec::with_capacity(fresh.len());
        for mut checklist in fresh {
            let items = std::mem::take(&mut checklist.items);
            replace_scope(&mut self.items, checklist.id, items);
            bare.push(checklist);
        }
        replace_scope(&mut self.checklists, task_id, bare);
        Ok(())
    }

    pub fn create(&mut self, task_id: Id, title: &str, position: Position) -> StoreResult<Checklist> {
        self.error = None;
        let title = require_text(title, "title").map_err(|e| record(&mut self.error, e))?;
        let siblings = self.for_task(task_id).len();
        let mut checklist = self
            .api
            .create_checklist(&NewChecklist {
                task_id,
                title,
                order_index: index_for(position, siblings),
            })
            .map_err(|e| record(&mut self.error, e))?;
        checklist.items.clear();

        let api = self.api;
        let mut reloaded = Vec::new();
        let placed = place_created(
            &mut self.checklists,
            checklist.clone(),
            position,
            &mut self.error,
            |entries| api.reorder_checklists(entries),
            |scope| {
                reloaded.push(scope);
                api.list_checklists(scope)
            },
        );
        self.absorb_reloaded(&reloaded);
        placed?;
        Ok(self.get(checklist.id).cloned().unwrap_or(checklist))
    }

    pub fn rename(&mut self, id: Id, title: &str) -> StoreResult<Checklist> {
        self.error = None;
        let title = require_text(title, "title").map_err(|e| record(&mut self.error, e))?;
        self.ensure_checklist(id)?;
        let mut updated = self
            .api
            .rename_checklist(id, &title)
            .map_err(|e| record(&mut self.error, e))?;
        updated.items.clear();
        if let Some(cached) = self.checklists.iter_mut().find(|c| c.id == id) {
            *cached = updated.clone();
        }
        Ok(updated)
    }

    /// Delete a checklist with its items, then close the gap in its task.
    pub fn delete(&mut self, id: Id) -> StoreResult<ReorderOutcome> {
        self.error = None;
        let task_id = self.ensure_checklist(id)?;
        self.api
            .delete_checklist(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.checklists.retain(|c| c.id != id);
        self.items.retain(|i| i.checklist_id != id);

        let api = self.api;
        let mut reloaded = Vec::new();
        let outcome = compact_cached(
            &mut self.checklists,
            task_id,
            &mut self.error,
            |entries| api.reorder_checklists(entries),
            |scope| {
                reloaded.push(scope);
                api.list_checklists(scope)
            },
        );
        self.absorb_reloaded(&reloaded);
        outcome
    }

    pub fn reorder(&mut self, task_id: Id, ordered_ids: &[Id]) -> StoreResult<ReorderOutcome> {
        self.error = None;
        let api = self.api;
        let mut reloaded = Vec::new();
        let outcome = reorder_cached(
            &mut self.checklists,
            task_id,
            ordered_ids,
            &mut self.error,
            |entries| api.reorder_checklists(entries),
            |scope| {
                reloaded.push(scope);
                api.list_checklists(scope)
            },
        );
        self.absorb_reloaded(&reloaded);
        outcome
    }

    pub fn add_item(
        &mut self,
        checklist_id: Id,
        content: &str,
        position: Position,
    ) -> StoreResult<ChecklistItem> {
        self.error = None;
        let content = require_text(content, "content").map_err(|e| record(&mut self.error, e))?;
        self.ensure_checklist(checklist_id)?;
        let siblings = self.items_of(checklist_id).len();
        let item = self
            .api
            .create_checklist_item(&NewChecklistItem {
                checklist_id,
                content,
                order_index: index_for(position, siblings),
            })
            .map_err(|e| record(&mut self.error, e))?;

        let api = self.api;
        let checklists = &self.checklists;
        place_created(
            &mut self.items,
            item.clone(),
            position,
            &mut self.error,
            |entries| api.reorder_checklist_items(entries),
            |scope| reload_items(api, checklists, scope),
        )?;
        Ok(self.item(item.id).cloned().unwrap_or(item))
    }

    pub fn edit_item(&mut self, id: Id, content: &str) -> StoreResult<ChecklistItem> {
        self.error = None;
        let content = require_text(content, "content").map_err(|e| record(&mut self.error, e))?;
        self.update_item(
            id,
            ChecklistItemPatch {
                content: Some(content),
                completed: None,
            },
        )
    }

    /// Flip an item's completed flag, returning the updated item.
    pub fn toggle_item(&mut self, id: Id) -> StoreResult<ChecklistItem> {
        self.error = None;
        let completed = match self.item(id) {
            Some(item) => !item.completed,
            None => return Err(self.unknown_item(id)),
        };
        self.update_item(
            id,
            ChecklistItemPatch {
                content: None,
                completed: Some(completed),
            },
        )
    }

    pub fn delete_item(&mut self, id: Id) -> StoreResult<ReorderOutcome> {
        self.error = None;
        let checklist_id = match self.item(id) {
            Some(item) => item.checklist_id,
            None => return Err(self.unknown_item(id)),
        };
        self.api
            .delete_checklist_item(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.items.retain(|i| i.id != id);

        let api = self.api;
        let checklists = &self.checklists;
        compact_cached(
            &mut self.items,
            checklist_id,
            &mut self.error,
            |entries| api.reorder_checklist_items(entries),
            |scope| reload_items(api, checklists, scope),
        )
    }

    pub fn reorder_items(
        &mut self,
        checklist_id: Id,
        ordered_ids: &[Id],
    ) -> StoreResult<ReorderOutcome> {
        self.error = None;
        let api = self.api;
        let checklists = &self.checklists;
        reorder_cached(
            &mut self.items,
            checklist_id,
            ordered_ids,
            &mut self.error,
            |entries| api.reorder_checklist_items(entries),
            |scope| reload_items(api, checklists, scope),
        )
    }

    /// Move an item into another checklist at `position`.
    pub fn move_item(
        &mut self,
        id: Id,
        checklist_id: Id,
        position: Position,
    ) -> StoreResult<ReorderOutcome> {
        self.error = None;
        if self.item(id).is_none() {
            return Err(self.unknown_item(id));
        }
        self.ensure_checklist(checklist_id)?;
        let ordering = ordering_with(&self.items, checklist_id, id, position);
        self.reorder_items(checklist_id, &ordering)
    }

    fn update_item(&mut self, id: Id, patch: ChecklistItemPatch) -> StoreResult<ChecklistItem> {
        if self.item(id).is_none() {
            return Err(self.unknown_item(id));
        }
        let updated = self
            .api
            .update_checklist_item(id, &patch)
            .map_err(|e| record(&mut self.error, e))?;
        if let Some(cached) = self.items.iter_mut().find(|i| i.id == id) {
            *cached = updated.clone();
        }
        Ok(updated)
    }

    /// Move the items of checklists reloaded for `task_ids` into the flat
    /// list. Checklists of other tasks keep their cached items.
    fn absorb_reloaded(&mut self, task_ids: &[Id]) {
        if task_ids.is_empty() {
            return;
        }
        for checklist in self
            .checklists
            .iter_mut()
            .filter(|c| task_ids.contains(&c.task_id))
        {
            let items = std::mem::take(&mut checklist.items);
            replace_scope(&mut self.items, checklist.id, items);
        }
        // items of checklists the server no longer has
        let known: Vec<Id> = self.checklists.iter().map(|c| c.id).collect();
        self.items.retain(|i| known.contains(&i.checklist_id));
    }

    /// Task id of a cached checklist
    fn ensure_checklist(&mut self, id: Id) -> StoreResult<Id> {
        match self.get(id) {
            Some(checklist) => Ok(checklist.task_id),
            None => Err(record(
                &mut self.error,
                StoreError::UnknownId {
                    resource: "checklist",
                    id,
                },
            )),
        }
    }

    fn unknown_item(&mut self, id: Id) -> StoreError {
        record(
            &mut self.error,
            StoreError::UnknownId {
                resource: "checklist item",
                id,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::model::{NewProject, NewSection, NewTask};

    fn task(api: &MemoryApi) -> Id {
        let project = api
            .create_project(&NewProject {
                name: "Trip".into(),
                ..Default::default()
            })
            .unwrap();
        let section = api
            .create_section(&NewSection {
                project_id: project.id,
                name: "Prep".into(),
                order_index: 0,
            })
            .unwrap();
        api.create_task(&NewTask {
            section_id: section.id,
            title: "Pack".into(),
            ..Default::default()
        })
        .unwrap()
        .id
    }

    fn contents(store: &ChecklistStore, checklist_id: Id) -> Vec<String> {
        store
            .items_of(checklist_id)
            .iter()
            .map(|i| i.content.clone())
            .collect()
    }

    #[test]
    fn test_items_and_progress() {
        let api = MemoryApi::new();
        let task_id = task(&api);
        let mut store = ChecklistStore::new(&api);
        let list = store.create(task_id, "Clothes", Position::End).unwrap();
        let socks = store.add_item(list.id, "socks", Position::End).unwrap();
        store.add_item(list.id, "hat", Position::End).unwrap();
        store.add_item(list.id, "scarf", Position::At(0)).unwrap();

        assert_eq!(contents(&store, list.id), vec!["scarf", "socks", "hat"]);
        store.toggle_item(socks.id).unwrap();
        assert_eq!(store.progress(list.id), (1, 3));

        // reloading from the server gives the same picture
        let mut fresh = ChecklistStore::new(&api);
        fresh.load(task_id).unwrap();
        assert_eq!(contents(&fresh, list.id), vec!["scarf", "socks", "hat"]);
        assert_eq!(fresh.progress(list.id), (1, 3));
        assert!(fresh.get(list.id).unwrap().items.is_empty());
        assert_eq!(fresh.assembled(list.id).unwrap().progress(), (1, 3));
    }

    #[test]
    fn test_rename_and_edit_trim_text() {
        let api = MemoryApi::new();
        let task_id = task(&api);
        let mut store = ChecklistStore::new(&api);
        let list = store.create(task_id, "Clothes", Position::End).unwrap();
        let item = store.add_item(list.id, "sock", Position::End).unwrap();

        assert_eq!(store.rename(list.id, "  Wardrobe ").unwrap().title, "Wardrobe");
        assert_eq!(store.edit_item(item.id, "socks").unwrap().content, "socks");
        assert_eq!(contents(&store, list.id), vec!["socks"]);
        assert!(store.edit_item(item.id, "   ").is_err());
        assert!(store.rename(list.id, "").is_err());
    }

    #[test]
    fn test_move_item_between_checklists() {
        let api = MemoryApi::new();
        let task_id = task(&api);
        let mut store = ChecklistStore::new(&api);
        let a = store.create(task_id, "A", Position::End).unwrap();
        let b = store.create(task_id, "B", Position::End).unwrap();
        let x = store.add_item(a.id, "x", Position::End).unwrap();
        store.add_item(a.id, "y", Position::End).unwrap();
        store.add_item(b.id, "z", Position::End).unwrap();

        let outcome = store.move_item(x.id, b.id, Position::End).unwrap();
        assert_eq!(outcome, ReorderOutcome::Settled);
        assert_eq!(contents(&store, a.id), vec!["y"]);
        assert_eq!(contents(&store, b.id), vec!["z", "x"]);
        let server: Vec<(String, i64)> = api
            .items_in(a.id)
            .into_iter()
            .map(|i| (i.content, i.order_index))
            .collect();
        assert_eq!(server, vec![("y".to_string(), 0)]);
    }

    #[test]
    fn test_failed_item_reorder_reloads_checklist() {
        let api = MemoryApi::new();
        let task_id = task(&api);
        let mut store = ChecklistStore::new(&api);
        let list = store.create(task_id, "List", Position::End).unwrap();
        let one = store.add_item(list.id, "one", Position::End).unwrap();
        let two = store.add_item(list.id, "two", Position::End).unwrap();
        api.fail("reorder_checklist_items");
        api.clear_calls();

        let outcome = store.reorder_items(list.id, &[two.id, one.id]).unwrap();
        assert!(!outcome.is_settled());
        assert!(store.error().is_some());
        assert_eq!(api.count("list_checklists", Some(task_id)), 1);
        assert_eq!(contents(&store, list.id), vec!["one", "two"]);
    }

    #[test]
    fn test_reorder_checklists_and_delete() {
        let api = MemoryApi::new();
        let task_id = task(&api);
        let mut store = ChecklistStore::new(&api);
        let a = store.create(task_id, "A", Position::End).unwrap();
        let b = store.create(task_id, "B", Position::End).unwrap();
        let c = store.create(task_id, "C", Position::End).unwrap();
        store.reorder(task_id, &[c.id, b.id, a.id]).unwrap();
        store.delete(b.id).unwrap();

        let titles: Vec<(String, i64)> = store
            .for_task(task_id)
            .iter()
            .map(|c| (c.title.clone(), c.order_index))
            .collect();
        assert_eq!(titles, vec![("C".to_string(), 0), ("A".to_string(), 1)]);
    }

    #[test]
    fn test_rollback_leaves_other_tasks_items_alone() {
        let api = MemoryApi::new();
        let (first, second) = (task(&api), task(&api));
        let mut store = ChecklistStore::new(&api);
        let a = store.create(first, "A", Position::End).unwrap();
        let b = store.create(first, "B", Position::End).unwrap();
        store.add_item(a.id, "passport", Position::End).unwrap();
        let other = store.create(second, "Other", Position::End).unwrap();
        store.add_item(other.id, "tickets", Position::End).unwrap();
        api.fail("reorder_checklists");

        let outcome = store.reorder(first, &[b.id, a.id]).unwrap();
        assert!(matches!(outcome, ReorderOutcome::RolledBack { .. }));
        assert_eq!(contents(&store, other.id), vec!["tickets"]);
        assert_eq!(contents(&store, a.id), vec!["passport"]);
        assert!(store.checklists.iter().all(|c| c.items.is_empty()));
    }

    #[test]
    fn test_rolled_back_create_and_delete_keep_items_flat() {
        let api = MemoryApi::new();
        let task_id = task(&api);
        let mut store = ChecklistStore::new(&api);
        let a = store.create(task_id, "A", Position::End).unwrap();
        let b = store.create(task_id, "B", Position::End).unwrap();
        store.add_item(b.id, "map", Position::End).unwrap();
        api.fail("reorder_checklists");

        store.create(task_id, "First", Position::At(0)).unwrap();
        assert!(store.error().is_some());
        assert_eq!(contents(&store, b.id), vec!["map"]);
        assert!(store.checklists.iter().all(|c| c.items.is_empty()));

        store.delete(a.id).unwrap();
        assert_eq!(contents(&store, b.id), vec!["map"]);
        assert!(store.checklists.iter().all(|c| c.items.is_empty()));
    }

    #[test]
    fn test_unknown_item_is_reported() {
        let api = MemoryApi::new();
        let mut store = ChecklistStore::new(&api);
        assert!(matches!(
            store.toggle_item(42),
            Err(StoreError::UnknownId { id: 42, .. })
        ));
        assert!(store.error().is_some());
    }
}
