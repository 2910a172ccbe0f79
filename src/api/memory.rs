//! In-process implementation of the API.
//!
//! Keeps every resource in memory, logs each call with the scope it touched
//! and can be told to fail individual endpoints. Used for offline runs and as
//! the server in store tests.

use std::cell::RefCell;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};

use super::{Api, ApiError, ApiResult, Page, PageRequest};
use crate::model::{
    Checklist, ChecklistItem, ChecklistItemPatch, Completion, CompletionResponse, Id,
    ImportSummary, Label, MediaItem, MediaPatch, MediaType, NewChecklist, NewChecklistItem,
    NewLabel, NewMedia, NewNote, NewPriority, NewProject, NewSection, NewTask, Note, NotePatch,
    Ordered, Priority, Project, ProjectPatch, RecurrencePayload, RecurringTask, ReorderEntry,
    Section, SectionPatch, Task, TaskPatch,
};
use crate::ops::media_csv;

/// One logged request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    /// Name of the `Api` method
    pub op: &'static str,
    /// Parent scope for list calls, target id for mutations
    pub scope: Option<Id>,
}

#[derive(Default)]
struct State {
    next_id: Id,
    projects: Vec<Project>,
    sections: Vec<Section>,
    tasks: Vec<Task>,
    /// Stored without their items
    checklists: Vec<Checklist>,
    items: Vec<ChecklistItem>,
    labels: Vec<Label>,
    priorities: Vec<Priority>,
    recurring: Vec<RecurringTask>,
    notes: Vec<Note>,
    media: Vec<MediaItem>,
    completions: Vec<Completion>,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn descendants(&self, root: Id) -> Vec<Id> {
        let mut out = vec![root];
        let mut i = 0;
        while i < out.len() {
            let parent = out[i];
            out.extend(
                self.projects
                    .iter()
                    .filter(|p| p.parent_id == Some(parent))
                    .map(|p| p.id),
            );
            i += 1;
        }
        out
    }

    fn drop_sections(&mut self, ids: &[Id]) {
        self.sections.retain(|s| !ids.contains(&s.id));
        let tasks: Vec<Id> = self
            .tasks
            .iter()
            .filter(|t| ids.contains(&t.section_id))
            .map(|t| t.id)
            .collect();
        self.drop_tasks(&tasks);
    }

    fn drop_tasks(&mut self, ids: &[Id]) {
        self.tasks.retain(|t| !ids.contains(&t.id));
        self.completions.retain(|c| !ids.contains(&c.task_id));
        let checklists: Vec<Id> = self
            .checklists
            .iter()
            .filter(|c| ids.contains(&c.task_id))
            .map(|c| c.id)
            .collect();
        self.drop_checklists(&checklists);
    }

    fn drop_checklists(&mut self, ids: &[Id]) {
        self.checklists.retain(|c| !ids.contains(&c.id));
        self.items.retain(|i| !ids.contains(&i.checklist_id));
    }

    fn task_count(&self, section_id: Id) -> i64 {
        self.tasks.iter().filter(|t| t.section_id == section_id).count() as i64
    }
}

trait Keyed {
    fn key(&self) -> Id;
}

macro_rules! keyed {
    ($($t:ty),* $(,)?) => {
        $(impl Keyed for $t {
            fn key(&self) -> Id {
                self.id
            }
        })*
    };
}

keyed!(
    Project,
    Section,
    Task,
    Checklist,
    ChecklistItem,
    Label,
    Priority,
    RecurringTask,
    Note,
    MediaItem,
);

fn get_mut<'a, T: Keyed>(items: &'a mut [T], id: Id, resource: &'static str) -> ApiResult<&'a mut T> {
    items
        .iter_mut()
        .find(|item| item.key() == id)
        .ok_or(ApiError::NotFound { resource, id })
}

fn remove<T: Keyed>(items: &mut Vec<T>, id: Id, resource: &'static str) -> ApiResult<T> {
    let pos = items
        .iter()
        .position(|item| item.key() == id)
        .ok_or(ApiError::NotFound { resource, id })?;
    Ok(items.remove(pos))
}

fn exists<T: Keyed>(items: &[T], id: Id, resource: &'static str) -> ApiResult<()> {
    if items.iter().any(|item| item.key() == id) {
        Ok(())
    } else {
        Err(ApiError::NotFound { resource, id })
    }
}

/// Members of `scope` in board order
fn in_scope<T: Ordered + Clone>(items: &[T], scope: T::Scope) -> Vec<T> {
    let mut out: Vec<T> = items
        .iter()
        .filter(|item| item.scope() == scope)
        .cloned()
        .collect();
    out.sort_by_key(|item| (item.order_index(), item.id()));
    out
}

/// All-or-nothing application of a reorder batch
fn apply_batch<T: Ordered>(
    items: &mut [T],
    entries: &[ReorderEntry<T::Scope>],
    resource: &'static str,
) -> ApiResult<()> {
    if let Some(entry) = entries
        .iter()
        .find(|e| !items.iter().any(|item| item.id() == e.id))
    {
        return Err(ApiError::NotFound {
            resource,
            id: entry.id,
        });
    }
    for entry in entries {
        if let Some(item) = items.iter_mut().find(|item| item.id() == entry.id) {
            item.set_scope(entry.scope);
            item.set_order_index(entry.order_index);
        }
    }
    Ok(())
}

fn unprocessable(message: &str) -> ApiError {
    ApiError::Status {
        status: 422,
        body: message.to_string(),
    }
}

#[derive(Default)]
pub struct MemoryApi {
    state: RefCell<State>,
    log: RefCell<Vec<Call>>,
    failing: RefCell<HashSet<&'static str>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        MemoryApi::default()
    }

    /// Make every later call to `op` fail with a 500 until `recover` is called.
    pub fn fail(&self, op: &'static str) {
        self.failing.borrow_mut().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.borrow_mut().remove(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    /// Number of logged calls to `op` with the given scope
    pub fn count(&self, op: &str, scope: Option<Id>) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|c| c.op == op && c.scope == scope)
            .count()
    }

    /// Number of logged calls to `op`, any scope
    pub fn count_op(&self, op: &str) -> usize {
        self.log.borrow().iter().filter(|c| c.op == op).count()
    }

    pub fn clear_calls(&self) {
        self.log.borrow_mut().clear();
    }

    /// Add a completion event directly, bypassing the task endpoints
    pub fn record_completion(&self, task_id: Id, completed_at: DateTime<Utc>) {
        self.state.borrow_mut().completions.push(Completion {
            task_id,
            completed_at,
        });
    }

    // Server-side views for assertions

    pub fn projects_in(&self, parent_id: Option<Id>) -> Vec<Project> {
        in_scope(&self.state.borrow().projects, parent_id)
    }

    pub fn sections_in(&self, project_id: Id) -> Vec<Section> {
        in_scope(&self.state.borrow().sections, project_id)
    }

    pub fn tasks_in(&self, section_id: Id) -> Vec<Task> {
        in_scope(&self.state.borrow().tasks, section_id)
    }

    pub fn items_in(&self, checklist_id: Id) -> Vec<ChecklistItem> {
        in_scope(&self.state.borrow().items, checklist_id)
    }

    pub fn media_count(&self) -> usize {
        self.state.borrow().media.len()
    }

    fn enter(&self, op: &'static str, scope: Option<Id>) -> ApiResult<()> {
        self.log.borrow_mut().push(Call { op, scope });
        if self.failing.borrow().contains(op) {
            tracing::debug!(op, "injected failure");
            return Err(ApiError::Status {
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Api for MemoryApi {
    fn list_projects(&self) -> ApiResult<Vec<Project>> {
        self.enter("list_projects", None)?;
        let mut projects = self.state.borrow().projects.clone();
        projects.sort_by_key(|p| (p.parent_id, p.order_index, p.id));
        Ok(projects)
    }

    fn create_project(&self, new: &NewProject) -> ApiResult<Project> {
        self.enter("create_project", new.parent_id)?;
        let mut state = self.state.borrow_mut();
        if new.name.trim().is_empty() {
            return Err(unprocessable("name is required"));
        }
        if let Some(parent) = new.parent_id {
            exists(&state.projects, parent, "project")?;
        }
        let project = Project {
            id: state.next_id(),
            name: new.name.clone(),
            description: new.description.clone(),
            color: new.color.clone(),
            parent_id: new.parent_id,
            order_index: new.order_index,
            view: new.view,
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    fn update_project(&self, id: Id, patch: &ProjectPatch) -> ApiResult<Project> {
        self.enter("update_project", Some(id))?;
        let mut state = self.state.borrow_mut();
        let project = get_mut(&mut state.projects, id, "project")?;
        if let Some(name) = &patch.name {
            project.name = name.clone();
        }
        if let Some(description) = &patch.description {
            project.description = Some(description.clone());
        }
        if let Some(color) = &patch.color {
            project.color = Some(color.clone());
        }
        if let Some(view) = patch.view {
            project.view = view;
        }
        Ok(project.clone())
    }

    fn delete_project(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_project", Some(id))?;
        let mut state = self.state.borrow_mut();
        exists(&state.projects, id, "project")?;
        let doomed = state.descendants(id);
        state.projects.retain(|p| !doomed.contains(&p.id));
        let sections: Vec<Id> = state
            .sections
            .iter()
            .filter(|s| doomed.contains(&s.project_id))
            .map(|s| s.id)
            .collect();
        state.drop_sections(&sections);
        Ok(())
    }

    fn reorder_projects(&self, entries: &[ReorderEntry<Option<Id>>]) -> ApiResult<()> {
        self.enter("reorder_projects", None)?;
        apply_batch(&mut self.state.borrow_mut().projects, entries, "project")
    }

    fn list_sections(&self, project_id: Id) -> ApiResult<Vec<Section>> {
        self.enter("list_sections", Some(project_id))?;
        Ok(self.sections_in(project_id))
    }

    fn create_section(&self, new: &NewSection) -> ApiResult<Section> {
        self.enter("create_section", Some(new.project_id))?;
        let mut state = self.state.borrow_mut();
        if new.name.trim().is_empty() {
            return Err(unprocessable("name is required"));
        }
        exists(&state.projects, new.project_id, "project")?;
        let section = Section {
            id: state.next_id(),
            project_id: new.project_id,
            name: new.name.clone(),
            order_index: new.order_index,
        };
        state.sections.push(section.clone());
        Ok(section)
    }

    fn update_section(&self, id: Id, patch: &SectionPatch) -> ApiResult<Section> {
        self.enter("update_section", Some(id))?;
        let mut state = self.state.borrow_mut();
        let section = get_mut(&mut state.sections, id, "section")?;
        if let Some(name) = &patch.name {
            section.name = name.clone();
        }
        Ok(section.clone())
    }

    fn delete_section(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_section", Some(id))?;
        let mut state = self.state.borrow_mut();
        exists(&state.sections, id, "section")?;
        state.drop_sections(&[id]);
        Ok(())
    }

    fn reorder_sections(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()> {
        self.enter("reorder_sections", None)?;
        apply_batch(&mut self.state.borrow_mut().sections, entries, "section")
    }

    fn list_tasks(&self, section_id: Id) -> ApiResult<Vec<Task>> {
        self.enter("list_tasks", Some(section_id))?;
        Ok(self.tasks_in(section_id))
    }

    fn create_task(&self, new: &NewTask) -> ApiResult<Task> {
        self.enter("create_task", Some(new.section_id))?;
        let mut state = self.state.borrow_mut();
        if new.title.trim().is_empty() {
            return Err(unprocessable("title is required"));
        }
        exists(&state.sections, new.section_id, "section")?;
        let task = Task {
            id: state.next_id(),
            section_id: new.section_id,
            title: new.title.clone(),
            description: new.description.clone(),
            completed: false,
            completed_at: None,
            due_date: new.due_date,
            priority_id: new.priority_id,
            label_ids: new.label_ids.clone(),
            recurring_task_id: new.recurring_task_id,
            order_index: new.order_index,
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    fn update_task(&self, id: Id, patch: &TaskPatch) -> ApiResult<Task> {
        self.enter("update_task", Some(id))?;
        let mut state = self.state.borrow_mut();
        let task = get_mut(&mut state.tasks, id, "task")?;
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = Some(description.clone());
        }
        if let Some(due) = patch.due_date {
            task.due_date = Some(due);
        }
        if let Some(priority) = patch.priority_id {
            task.priority_id = Some(priority);
        }
        if let Some(labels) = &patch.label_ids {
            task.label_ids = labels.clone();
        }
        Ok(task.clone())
    }

    fn delete_task(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_task", Some(id))?;
        let mut state = self.state.borrow_mut();
        exists(&state.tasks, id, "task")?;
        state.drop_tasks(&[id]);
        Ok(())
    }

    fn set_task_completed(&self, id: Id, completed: bool) -> ApiResult<CompletionResponse> {
        self.enter("set_task_completed", Some(id))?;
        let mut state = self.state.borrow_mut();
        let now = Utc::now();
        let task = get_mut(&mut state.tasks, id, "task")?;
        let was_completed = task.completed;
        task.completed = completed;
        task.completed_at = completed.then_some(now);
        let task = task.clone();

        if completed && !was_completed {
            state.completions.push(Completion {
                task_id: id,
                completed_at: now,
            });
        } else if !completed {
            state.completions.retain(|c| c.task_id != id);
        }

        let mut next_instance_created = false;
        if completed
            && !was_completed
            && let Some(rid) = task.recurring_task_id
            && let Some(rule) = state.recurring.iter().find(|r| r.id == rid && r.active)
        {
            let (section_id, title) = (rule.section_id, rule.title.clone());
            let next = Task {
                id: state.next_id(),
                section_id,
                title,
                description: None,
                completed: false,
                completed_at: None,
                due_date: None,
                priority_id: None,
                label_ids: Vec::new(),
                recurring_task_id: Some(rid),
                order_index: state.task_count(section_id),
            };
            state.tasks.push(next);
            next_instance_created = true;
        }

        Ok(CompletionResponse {
            task,
            next_instance_created,
        })
    }

    fn reorder_tasks(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()> {
        self.enter("reorder_tasks", None)?;
        apply_batch(&mut self.state.borrow_mut().tasks, entries, "task")
    }

    fn list_checklists(&self, task_id: Id) -> ApiResult<Vec<Checklist>> {
        self.enter("list_checklists", Some(task_id))?;
        let state = self.state.borrow();
        Ok(in_scope(&state.checklists, task_id)
            .into_iter()
            .map(|mut checklist| {
                checklist.items = in_scope(&state.items, checklist.id);
                checklist
            })
            .collect())
    }

    fn create_checklist(&self, new: &NewChecklist) -> ApiResult<Checklist> {
        self.enter("create_checklist", Some(new.task_id))?;
        let mut state = self.state.borrow_mut();
        if new.title.trim().is_empty() {
            return Err(unprocessable("title is required"));
        }
        exists(&state.tasks, new.task_id, "task")?;
        let checklist = Checklist {
            id: state.next_id(),
            task_id: new.task_id,
            title: new.title.clone(),
            order_index: new.order_index,
            items: Vec::new(),
        };
        state.checklists.push(checklist.clone());
        Ok(checklist)
    }

    fn rename_checklist(&self, id: Id, title: &str) -> ApiResult<Checklist> {
        self.enter("rename_checklist", Some(id))?;
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let checklist = get_mut(&mut state.checklists, id, "checklist")?;
        checklist.title = title.to_string();
        let mut out = checklist.clone();
        out.items = in_scope(&state.items, id);
        Ok(out)
    }

    fn delete_checklist(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_checklist", Some(id))?;
        let mut state = self.state.borrow_mut();
        exists(&state.checklists, id, "checklist")?;
        state.drop_checklists(&[id]);
        Ok(())
    }

    fn reorder_checklists(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()> {
        self.enter("reorder_checklists", None)?;
        apply_batch(&mut self.state.borrow_mut().checklists, entries, "checklist")
    }

    fn create_checklist_item(&self, new: &NewChecklistItem) -> ApiResult<ChecklistItem> {
        self.enter("create_checklist_item", Some(new.checklist_id))?;
        let mut state = self.state.borrow_mut();
        if new.content.trim().is_empty() {
            return Err(unprocessable("content is required"));
        }
        exists(&state.checklists, new.checklist_id, "checklist")?;
        let item = ChecklistItem {
            id: state.next_id(),
            checklist_id: new.checklist_id,
            content: new.content.clone(),
            completed: false,
            order_index: new.order_index,
        };
        state.items.push(item.clone());
        Ok(item)
    }

    fn update_checklist_item(
        &self,
        id: Id,
        patch: &ChecklistItemPatch,
    ) -> ApiResult<ChecklistItem> {
        self.enter("update_checklist_item", Some(id))?;
        let mut state = self.state.borrow_mut();
        let item = get_mut(&mut state.items, id, "checklist item")?;
        if let Some(content) = &patch.content {
            item.content = content.clone();
        }
        if let Some(completed) = patch.completed {
            item.completed = completed;
        }
        Ok(item.clone())
    }

    fn delete_checklist_item(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_checklist_item", Some(id))?;
        remove(&mut self.state.borrow_mut().items, id, "checklist item").map(|_| ())
    }

    fn reorder_checklist_items(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()> {
        self.enter("reorder_checklist_items", None)?;
        apply_batch(&mut self.state.borrow_mut().items, entries, "checklist item")
    }

    fn list_labels(&self) -> ApiResult<Vec<Label>> {
        self.enter("list_labels", None)?;
        Ok(self.state.borrow().labels.clone())
    }

    fn create_label(&self, new: &NewLabel) -> ApiResult<Label> {
        self.enter("create_label", None)?;
        let mut state = self.state.borrow_mut();
        if new.name.trim().is_empty() {
            return Err(unprocessable("name is required"));
        }
        let label = Label {
            id: state.next_id(),
            name: new.name.clone(),
            color: new.color.clone(),
        };
        state.labels.push(label.clone());
        Ok(label)
    }

    fn update_label(&self, id: Id, update: &NewLabel) -> ApiResult<Label> {
        self.enter("update_label", Some(id))?;
        let mut state = self.state.borrow_mut();
        let label = get_mut(&mut state.labels, id, "label")?;
        label.name = update.name.clone();
        label.color = update.color.clone();
        Ok(label.clone())
    }

    fn delete_label(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_label", Some(id))?;
        let mut state = self.state.borrow_mut();
        remove(&mut state.labels, id, "label")?;
        for task in &mut state.tasks {
            task.label_ids.retain(|&l| l != id);
        }
        Ok(())
    }

    fn list_priorities(&self) -> ApiResult<Vec<Priority>> {
        self.enter("list_priorities", None)?;
        Ok(self.state.borrow().priorities.clone())
    }

    fn create_priority(&self, new: &NewPriority) -> ApiResult<Priority> {
        self.enter("create_priority", None)?;
        let mut state = self.state.borrow_mut();
        if new.name.trim().is_empty() {
            return Err(unprocessable("name is required"));
        }
        let priority = Priority {
            id: state.next_id(),
            name: new.name.clone(),
            level: new.level,
            color: new.color.clone(),
        };
        state.priorities.push(priority.clone());
        Ok(priority)
    }

    fn update_priority(&self, id: Id, update: &NewPriority) -> ApiResult<Priority> {
        self.enter("update_priority", Some(id))?;
        let mut state = self.state.borrow_mut();
        let priority = get_mut(&mut state.priorities, id, "priority")?;
        priority.name = update.name.clone();
        priority.level = update.level;
        priority.color = update.color.clone();
        Ok(priority.clone())
    }

    fn delete_priority(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_priority", Some(id))?;
        let mut state = self.state.borrow_mut();
        remove(&mut state.priorities, id, "priority")?;
        for task in &mut state.tasks {
            if task.priority_id == Some(id) {
                task.priority_id = None;
            }
        }
        Ok(())
    }

    fn list_recurring(&self) -> ApiResult<Vec<RecurringTask>> {
        self.enter("list_recurring", None)?;
        Ok(self.state.borrow().recurring.clone())
    }

    /// Stores the rule and generates its first instance in the section.
    fn create_recurring(&self, payload: &RecurrencePayload) -> ApiResult<RecurringTask> {
        self.enter("create_recurring", Some(payload.section_id))?;
        let mut state = self.state.borrow_mut();
        exists(&state.sections, payload.section_id, "section")?;
        let rule = RecurringTask {
            id: state.next_id(),
            section_id: payload.section_id,
            title: payload.title.clone(),
            recurrence_type: payload.recurrence_type,
            recurrence_days: payload.recurrence_days.clone(),
            recurrence_time: payload.recurrence_time.clone(),
            active: true,
        };
        let instance = Task {
            id: state.next_id(),
            section_id: rule.section_id,
            title: rule.title.clone(),
            description: None,
            completed: false,
            completed_at: None,
            due_date: None,
            priority_id: None,
            label_ids: Vec::new(),
            recurring_task_id: Some(rule.id),
            order_index: state.task_count(rule.section_id),
        };
        state.tasks.push(instance);
        state.recurring.push(rule.clone());
        Ok(rule)
    }

    fn update_recurring(&self, id: Id, payload: &RecurrencePayload) -> ApiResult<RecurringTask> {
        self.enter("update_recurring", Some(id))?;
        let mut state = self.state.borrow_mut();
        let rule = get_mut(&mut state.recurring, id, "recurring task")?;
        rule.section_id = payload.section_id;
        rule.title = payload.title.clone();
        rule.recurrence_type = payload.recurrence_type;
        rule.recurrence_days = payload.recurrence_days.clone();
        rule.recurrence_time = payload.recurrence_time.clone();
        Ok(rule.clone())
    }

    fn delete_recurring(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_recurring", Some(id))?;
        let mut state = self.state.borrow_mut();
        remove(&mut state.recurring, id, "recurring task")?;
        for task in &mut state.tasks {
            if task.recurring_task_id == Some(id) {
                task.recurring_task_id = None;
            }
        }
        Ok(())
    }

    fn list_notes(&self) -> ApiResult<Vec<Note>> {
        self.enter("list_notes", None)?;
        Ok(self.state.borrow().notes.clone())
    }

    fn create_note(&self, new: &NewNote) -> ApiResult<Note> {
        self.enter("create_note", None)?;
        let mut state = self.state.borrow_mut();
        if new.title.trim().is_empty() {
            return Err(unprocessable("title is required"));
        }
        let now = Utc::now();
        let note = Note {
            id: state.next_id(),
            title: new.title.clone(),
            content: new.content.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        state.notes.push(note.clone());
        Ok(note)
    }

    fn update_note(&self, id: Id, patch: &NotePatch) -> ApiResult<Note> {
        self.enter("update_note", Some(id))?;
        let mut state = self.state.borrow_mut();
        let note = get_mut(&mut state.notes, id, "note")?;
        if let Some(title) = &patch.title {
            note.title = title.clone();
        }
        if let Some(content) = &patch.content {
            note.content = content.clone();
        }
        note.updated_at = Some(Utc::now());
        Ok(note.clone())
    }

    fn delete_note(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_note", Some(id))?;
        remove(&mut self.state.borrow_mut().notes, id, "note").map(|_| ())
    }

    fn list_media(
        &self,
        media_type: MediaType,
        page: Option<PageRequest>,
    ) -> ApiResult<Page<MediaItem>> {
        self.enter("list_media", None)?;
        let state = self.state.borrow();
        let all: Vec<MediaItem> = state
            .media
            .iter()
            .filter(|m| m.media_type == media_type)
            .cloned()
            .collect();
        let total = all.len();
        Ok(match page {
            Some(req) => {
                let size = req.page_size.max(1) as usize;
                let skip = (req.page.max(1) as usize - 1) * size;
                Page {
                    items: all.into_iter().skip(skip).take(size).collect(),
                    total: Some(total),
                    page: Some(req.page.max(1)),
                    page_size: Some(size as u32),
                }
            }
            None => Page {
                items: all,
                total: Some(total),
                page: None,
                page_size: None,
            },
        })
    }

    fn create_media(&self, media_type: MediaType, new: &NewMedia) -> ApiResult<MediaItem> {
        self.enter("create_media", None)?;
        let mut state = self.state.borrow_mut();
        if new.title.trim().is_empty() {
            return Err(unprocessable("title is required"));
        }
        if new.rating.is_some_and(|r| !(1..=10).contains(&r)) {
            return Err(unprocessable("rating must be between 1 and 10"));
        }
        let item = MediaItem {
            id: state.next_id(),
            media_type,
            title: new.title.trim().to_string(),
            creator: new.creator.clone(),
            status: new.status,
            rating: new.rating,
            progress: new.progress,
            notes: new.notes.clone(),
            updated_at: Some(Utc::now()),
        };
        state.media.push(item.clone());
        Ok(item)
    }

    fn update_media(&self, id: Id, patch: &MediaPatch) -> ApiResult<MediaItem> {
        self.enter("update_media", Some(id))?;
        if patch.rating.is_some_and(|r| !(1..=10).contains(&r)) {
            return Err(unprocessable("rating must be between 1 and 10"));
        }
        let mut state = self.state.borrow_mut();
        let item = get_mut(&mut state.media, id, "media item")?;
        if let Some(title) = &patch.title {
            item.title = title.clone();
        }
        if let Some(creator) = &patch.creator {
            item.creator = Some(creator.clone());
        }
        if let Some(status) = patch.status {
            item.status = status;
        }
        if let Some(rating) = patch.rating {
            item.rating = Some(rating);
        }
        if let Some(progress) = patch.progress {
            item.progress = Some(progress);
        }
        if let Some(notes) = &patch.notes {
            item.notes = Some(notes.clone());
        }
        item.updated_at = Some(Utc::now());
        Ok(item.clone())
    }

    fn delete_media(&self, id: Id) -> ApiResult<()> {
        self.enter("delete_media", Some(id))?;
        remove(&mut self.state.borrow_mut().media, id, "media item").map(|_| ())
    }

    fn import_media_csv(
        &self,
        media_type: MediaType,
        file_name: &str,
        contents: Vec<u8>,
    ) -> ApiResult<ImportSummary> {
        self.enter("import_media_csv", None)?;
        tracing::debug!(file_name, bytes = contents.len(), "csv upload");
        let text = String::from_utf8(contents).map_err(|_| ApiError::Status {
            status: 400,
            body: "file is not valid utf-8".to_string(),
        })?;
        let rows = media_csv::parse_media_csv(&text).map_err(|e| ApiError::Status {
            status: 400,
            body: e.to_string(),
        })?;

        let mut state = self.state.borrow_mut();
        let existing: Vec<String> = state
            .media
            .iter()
            .filter(|m| m.media_type == media_type)
            .map(|m| m.title.clone())
            .collect();
        let existing: Vec<&str> = existing.iter().map(String::as_str).collect();
        let (to_import, summary) = media_csv::plan_import(&existing, rows);

        let now = Utc::now();
        for row in to_import {
            let item = MediaItem {
                id: state.next_id(),
                media_type,
                title: row.title,
                creator: row.creator,
                status: row.status,
                rating: row.rating,
                progress: row.progress,
                notes: row.notes,
                updated_at: Some(now),
            };
            state.media.push(item);
        }
        Ok(summary)
    }

    fn export_media_csv(&self, media_type: MediaType) -> ApiResult<String> {
        self.enter("export_media_csv", None)?;
        let state = self.state.borrow();
        let items: Vec<MediaItem> = state
            .media
            .iter()
            .filter(|m| m.media_type == media_type)
            .cloned()
            .collect();
        media_csv::write_media_csv(&items).map_err(|e| ApiError::Status {
            status: 500,
            body: e.to_string(),
        })
    }

    fn list_completions(&self, from: NaiveDate, to: NaiveDate) -> ApiResult<Vec<Completion>> {
        self.enter("list_completions", None)?;
        let mut out: Vec<Completion> = self
            .state
            .borrow()
            .completions
            .iter()
            .filter(|c| {
                let day = c.completed_at.date_naive();
                day >= from && day <= to
            })
            .cloned()
            .collect();
        out.sort_by_key(|c| c.completed_at);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecurrenceType;
    use crate::ops::weekday::MondayFirst;
    use pretty_assertions::assert_eq;

    fn board(api: &MemoryApi) -> (Id, Id) {
        let project = api
            .create_project(&NewProject {
                name: "Home".into(),
                ..Default::default()
            })
            .unwrap();
        let section = api
            .create_section(&NewSection {
                project_id: project.id,
                name: "Todo".into(),
                order_index: 0,
            })
            .unwrap();
        (project.id, section.id)
    }

    fn add_task(api: &MemoryApi, section_id: Id, title: &str, order_index: i64) -> Task {
        api.create_task(&NewTask {
            section_id,
            title: title.into(),
            order_index,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_list_tasks_sorted_by_order() {
        let api = MemoryApi::new();
        let (_, section) = board(&api);
        add_task(&api, section, "b", 1);
        add_task(&api, section, "a", 0);
        let titles: Vec<String> = api
            .list_tasks(section)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn test_injected_failure_is_logged() {
        let api = MemoryApi::new();
        api.fail("list_labels");
        let err = api.list_labels().unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
        assert_eq!(api.count("list_labels", None), 1);
        api.recover("list_labels");
        assert!(api.list_labels().is_ok());
    }

    #[test]
    fn test_reorder_batch_is_all_or_nothing() {
        let api = MemoryApi::new();
        let (_, section) = board(&api);
        let a = add_task(&api, section, "a", 0);
        let entries = [
            ReorderEntry::of::<Task>(a.id, section, 5),
            ReorderEntry::of::<Task>(999, section, 0),
        ];
        assert!(api.reorder_tasks(&entries).unwrap_err().is_not_found());
        assert_eq!(api.tasks_in(section)[0].order_index, 0);
    }

    #[test]
    fn test_delete_project_cascades() {
        let api = MemoryApi::new();
        let (project, section) = board(&api);
        let child = api
            .create_project(&NewProject {
                name: "Garden".into(),
                parent_id: Some(project),
                ..Default::default()
            })
            .unwrap();
        add_task(&api, section, "a", 0);
        api.delete_project(project).unwrap();
        assert!(api.projects_in(None).is_empty());
        assert!(api.projects_in(Some(project)).is_empty());
        assert!(api.tasks_in(section).is_empty());
        assert!(api.delete_project(child.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_completing_recurring_instance_creates_next() {
        let api = MemoryApi::new();
        let (_, section) = board(&api);
        let rule = api
            .create_recurring(&RecurrencePayload {
                section_id: section,
                title: "Water plants".into(),
                recurrence_type: RecurrenceType::Weekly,
                recurrence_days: vec![MondayFirst::new(0).unwrap()],
                recurrence_time: "08:00".into(),
            })
            .unwrap();
        let instance = api.tasks_in(section).remove(0);
        assert_eq!(instance.recurring_task_id, Some(rule.id));

        let response = api.set_task_completed(instance.id, true).unwrap();
        assert!(response.next_instance_created);
        assert_eq!(api.tasks_in(section).len(), 2);

        // already completed: no further instance
        let again = api.set_task_completed(instance.id, true).unwrap();
        assert!(!again.next_instance_created);
    }

    #[test]
    fn test_media_pagination() {
        let api = MemoryApi::new();
        for i in 0..5 {
            api.create_media(
                MediaType::Book,
                &NewMedia {
                    title: format!("Book {}", i),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        let page = api
            .list_media(MediaType::Book, Some(PageRequest { page: 2, page_size: 2 }))
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].title, "Book 2");
        assert!(page.has_more(PageRequest { page: 2, page_size: 2 }));
        assert!(api.list_media(MediaType::Game, None).unwrap().items.is_empty());
    }

    #[test]
    fn test_import_rejects_bad_csv() {
        let api = MemoryApi::new();
        let err = api
            .import_media_csv(MediaType::Movie, "x.csv", b"name\nAlien\n".to_vec())
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 400, .. }));
        assert_eq!(api.media_count(), 0);
    }
}
