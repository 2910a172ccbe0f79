use super::{
    StoreError, StoreResult, compact_cached, place_created, record, reorder_cached, replace_scope,
    require_text,
};
use crate::api::Api;
use crate::model::{Id, NewTask, Position, Priority, Task, TaskPatch};
use crate::ops::filter::{TaskFilter, TaskSort, filter_tasks};
use crate::ops::reorder::{ReorderOutcome, index_for, ordering_with};

/// Tasks of any number of loaded sections
pub struct TaskStore<'a> {
    api: &'a dyn Api,
    tasks: Vec<Task>,
    error: Option<String>,
}

impl<'a> TaskStore<'a> {
    pub fn new(api: &'a dyn Api) -> Self {
        TaskStore {
            api,
            tasks: Vec::new(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: Id) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks of a section in board order
    pub fn in_section(&self, section_id: Id) -> Vec<&Task> {
        let mut out: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.section_id == section_id)
            .collect();
        out.sort_by_key(|t| (t.order_index, t.id));
        out
    }

    /// Filtered and sorted view over every cached task
    pub fn view(&self, filter: &TaskFilter, sort: TaskSort, priorities: &[Priority]) -> Vec<&Task> {
        filter_tasks(&self.tasks, filter, sort, priorities)
    }

    /// Fetch one section's tasks, leaving other cached sections alone. On
    /// failure the cached tasks are kept.
    pub fn load(&mut self, section_id: Id) -> StoreResult<()> {
        self.error = None;
        let fresh = self
            .api
            .list_tasks(section_id)
            .map_err(|e| record(&mut self.error, e))?;
        replace_scope(&mut self.tasks, section_id, fresh);
        Ok(())
    }

    pub fn create(&mut self, draft: NewTask, position: Position) -> StoreResult<Task> {
        self.error = None;
        let title = require_text(&draft.title, "title").map_err(|e| record(&mut self.error, e))?;
        let siblings = self.in_section(draft.section_id).len();
        let new = NewTask {
            title,
            order_index: index_for(position, siblings),
            ..draft
        };
        let task = self
            .api
            .create_task(&new)
            .map_err(|e| record(&mut self.error, e))?;
        tracing::debug!(id = task.id, section_id = task.section_id, "task created");

        let api = self.api;
        place_created(
            &mut self.tasks,
            task.clone(),
            position,
            &mut self.error,
            |entries| api.reorder_tasks(entries),
            |scope| api.list_tasks(scope),
        )?;
        Ok(self.get(task.id).cloned().unwrap_or(task))
    }

    pub fn update(&mut self, id: Id, mut patch: TaskPatch) -> StoreResult<Task> {
        self.error = None;
        self.ensure_known(id)?;
        if patch.is_empty() {
            return Err(record(
                &mut self.error,
                StoreError::Validation("nothing to update".into()),
            ));
        }
        if let Some(title) = patch.title.take() {
            let title = require_text(&title, "title").map_err(|e| record(&mut self.error, e))?;
            patch.title = Some(title);
        }
        let updated = self
            .api
            .update_task(id, &patch)
            .map_err(|e| record(&mut self.error, e))?;
        self.merge(updated.clone());
        Ok(updated)
    }

    /// Delete a task, then close the gap in its section.
    pub fn delete(&mut self, id: Id) -> StoreResult<ReorderOutcome> {
        self.error = None;
        let section_id = self.ensure_known(id)?.section_id;
        self.api
            .delete_task(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.tasks.retain(|t| t.id != id);

        let api = self.api;
        compact_cached(
            &mut self.tasks,
            section_id,
            &mut self.error,
            |entries| api.reorder_tasks(entries),
            |scope| api.list_tasks(scope),
        )
    }

    /// Flip a task's completion. Completing an instance of a recurring task
    /// makes the server create the next one; the section is reloaded then.
    pub fn toggle_completed(&mut self, id: Id) -> StoreResult<Task> {
        let completed = !self.ensure_known(id)?.completed;
        self.set_completed(id, completed)
    }

    pub fn set_completed(&mut self, id: Id, completed: bool) -> StoreResult<Task> {
        self.error = None;
        self.ensure_known(id)?;
        let response = self
            .api
            .set_task_completed(id, completed)
            .map_err(|e| record(&mut self.error, e))?;
        let task = response.task;
        self.merge(task.clone());
        if response.next_instance_created {
            tracing::debug!(id, section_id = task.section_id, "next recurring instance created");
            self.load(task.section_id)?;
        }
        Ok(task)
    }

    /// Move a task into `section_id` at `position`. Moving inside its own
    /// section is a plain reorder.
    pub fn move_to(
        &mut self,
        id: Id,
        section_id: Id,
        position: Position,
    ) -> StoreResult<ReorderOutcome> {
        self.error = None;
        self.ensure_known(id)?;
        let ordering = ordering_with(&self.tasks, section_id, id, position);
        self.reorder(section_id, &ordering)
    }

    /// Apply a full ordering of `section_id`. Ids currently cached under
    /// another section are moved into it.
    pub fn reorder(&mut self, section_id: Id, ordered_ids: &[Id]) -> StoreResult<ReorderOutcome> {
        self.error = None;
        let api = self.api;
        reorder_cached(
            &mut self.tasks,
            section_id,
            ordered_ids,
            &mut self.error,
            |entries| api.reorder_tasks(entries),
            |scope| api.list_tasks(scope),
        )
    }

    fn ensure_known(&mut self, id: Id) -> StoreResult<&Task> {
        if self.get(id).is_none() {
            return Err(record(
                &mut self.error,
                StoreError::UnknownId { resource: "task", id },
            ));
        }
        self.get(id).ok_or(StoreError::UnknownId { resource: "task", id })
    }

    fn merge(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(cached) => *cached = task,
            None => self.tasks.push(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::model::{NewProject, NewSection, RecurrencePayload, RecurrenceType};
    use pretty_assertions::assert_eq;

    struct Board {
        api: MemoryApi,
        s1: Id,
        s2: Id,
    }

    fn board() -> Board {
        let api = MemoryApi::new();
        let project = api
            .create_project(&NewProject {
                name: "Work".into(),
                ..Default::default()
            })
            .unwrap();
        let section = |name: &str, order_index| {
            api.create_section(&NewSection {
                project_id: project.id,
                name: name.into(),
                order_index,
            })
            .unwrap()
            .id
        };
        let s1 = section("Todo", 0);
        let s2 = section("Done", 1);
        Board { api, s1, s2 }
    }

    fn draft(section_id: Id, title: &str) -> NewTask {
        NewTask {
            section_id,
            title: title.into(),
            ..Default::default()
        }
    }

    fn layout(store: &TaskStore, section_id: Id) -> Vec<(String, i64)> {
        store
            .in_section(section_id)
            .iter()
            .map(|t| (t.title.clone(), t.order_index))
            .collect()
    }

    #[test]
    fn test_reorder_c_a_b() {
        let b = board();
        let mut store = TaskStore::new(&b.api);
        let a = store.create(draft(b.s1, "A"), Position::End).unwrap();
        let bb = store.create(draft(b.s1, "B"), Position::End).unwrap();
        let c = store.create(draft(b.s1, "C"), Position::End).unwrap();

        let outcome = store.reorder(b.s1, &[c.id, a.id, bb.id]).unwrap();
        assert_eq!(outcome, ReorderOutcome::Settled);
        assert_eq!(store.get(a.id).unwrap().order_index, 1);
        assert_eq!(store.get(bb.id).unwrap().order_index, 2);
        assert_eq!(store.get(c.id).unwrap().order_index, 0);
        let cached: Vec<Task> = store.in_section(b.s1).into_iter().cloned().collect();
        assert_eq!(b.api.tasks_in(b.s1), cached);
    }

    #[test]
    fn test_move_across_sections() {
        let b = board();
        let mut store = TaskStore::new(&b.api);
        let a = store.create(draft(b.s1, "A"), Position::End).unwrap();
        store.create(draft(b.s1, "B"), Position::End).unwrap();
        store.create(draft(b.s2, "C"), Position::End).unwrap();
        b.api.clear_calls();

        store.move_to(a.id, b.s2, Position::At(0)).unwrap();

        assert_eq!(layout(&store, b.s2), vec![("A".to_string(), 0), ("C".to_string(), 1)]);
        assert_eq!(layout(&store, b.s1), vec![("B".to_string(), 0)]);
        assert_eq!(store.get(a.id).unwrap().section_id, b.s2);
        // source and target go out together
        assert_eq!(b.api.count_op("reorder_tasks"), 1);
        assert_eq!(b.api.tasks_in(b.s1).len(), 1);
        assert_eq!(b.api.tasks_in(b.s2)[0].id, a.id);
    }

    #[test]
    fn test_failed_move_reloads_both_sections_once() {
        let b = board();
        let mut store = TaskStore::new(&b.api);
        let a = store.create(draft(b.s1, "A"), Position::End).unwrap();
        store.create(draft(b.s2, "C"), Position::End).unwrap();
        b.api.fail("reorder_tasks");
        b.api.clear_calls();

        let outcome = store.move_to(a.id, b.s2, Position::At(0)).unwrap();
        assert!(matches!(outcome, ReorderOutcome::RolledBack { reload_error: None, .. }));
        assert!(store.error().is_some());
        assert_eq!(b.api.count("list_tasks", Some(b.s1)), 1);
        assert_eq!(b.api.count("list_tasks", Some(b.s2)), 1);
        assert_eq!(store.get(a.id).unwrap().section_id, b.s1);
        assert_eq!(layout(&store, b.s2), vec![("C".to_string(), 0)]);
    }

    #[test]
    fn test_empty_reorder_makes_no_calls() {
        let b = board();
        let mut store = TaskStore::new(&b.api);
        b.api.clear_calls();
        assert_eq!(store.reorder(b.s1, &[]).unwrap(), ReorderOutcome::Skipped);
        assert!(b.api.calls().is_empty());
    }

    #[test]
    fn test_load_keeps_other_sections() {
        let b = board();
        let mut store = TaskStore::new(&b.api);
        store.create(draft(b.s1, "A"), Position::End).unwrap();
        store.create(draft(b.s2, "C"), Position::End).unwrap();
        store.load(b.s1).unwrap();
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn test_update_rejects_blank_title() {
        let b = board();
        let mut store = TaskStore::new(&b.api);
        let a = store.create(draft(b.s1, "A"), Position::End).unwrap();
        let patch = TaskPatch {
            title: Some(" ".into()),
            ..Default::default()
        };
        assert!(matches!(store.update(a.id, patch), Err(StoreError::Validation(_))));
        assert_eq!(store.get(a.id).unwrap().title, "A");
    }

    #[test]
    fn test_completing_recurring_instance_reloads_section() {
        let b = board();
        b.api
            .create_recurring(&RecurrencePayload {
                section_id: b.s1,
                title: "Stretch".into(),
                recurrence_type: RecurrenceType::Daily,
                recurrence_days: Vec::new(),
                recurrence_time: "07:30".into(),
            })
            .unwrap();
        let mut store = TaskStore::new(&b.api);
        store.load(b.s1).unwrap();
        let instance = store.in_section(b.s1)[0].id;
        b.api.clear_calls();

        let done = store.toggle_completed(instance).unwrap();
        assert!(done.completed);
        assert_eq!(b.api.count("list_tasks", Some(b.s1)), 1);
        assert_eq!(store.in_section(b.s1).len(), 2);
    }

    #[test]
    fn test_delete_compacts_section() {
        let b = board();
        let mut store = TaskStore::new(&b.api);
        let a = store.create(draft(b.s1, "A"), Position::End).unwrap();
        store.create(draft(b.s1, "B"), Position::End).unwrap();
        store.create(draft(b.s1, "C"), Position::End).unwrap();
        store.delete(a.id).unwrap();
        let server: Vec<i64> = b.api.tasks_in(b.s1).iter().map(|t| t.order_index).collect();
        assert_eq!(server, vec![0, 1]);
    }
}
