//! The remote API boundary.
//!
//! `Api` has one method per endpoint. Stores only ever talk to a `&dyn Api`,
//! so the HTTP client and the in-process `MemoryApi` are interchangeable.

pub mod http;
pub mod memory;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    Checklist, ChecklistItem, ChecklistItemPatch, Completion, CompletionResponse, Id,
    ImportSummary, Label, MediaItem, MediaPatch, MediaType, NewChecklist, NewChecklistItem,
    NewLabel, NewMedia, NewNote, NewPriority, NewProject, NewSection, NewTask, Note, NotePatch,
    Priority, Project, ProjectPatch, RecurrencePayload, RecurringTask, ReorderEntry, Section,
    SectionPatch, Task, TaskPatch,
};

pub use http::HttpApi;
pub use memory::MemoryApi;

/// Error type for API calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: Id },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::NotFound { .. } | ApiError::Status { status: 404, .. }
        )
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Requested page of a paginated list (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn first(page_size: u32) -> Self {
        PageRequest { page: 1, page_size }
    }
}

/// `{items: [...]}` envelope returned by list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total across all pages, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl<T> Page<T> {
    /// Whether another page may follow the one fetched with `request`.
    /// Without a reported total a full page means there may be more.
    pub fn has_more(&self, request: PageRequest) -> bool {
        let page = self.page.unwrap_or(request.page) as usize;
        let size = self.page_size.unwrap_or(request.page_size) as usize;
        if self.items.is_empty() || size == 0 {
            return false;
        }
        match self.total {
            Some(total) => page * size < total,
            None => self.items.len() >= size,
        }
    }
}

pub trait Api {
    // Projects
    fn list_projects(&self) -> ApiResult<Vec<Project>>;
    fn create_project(&self, new: &NewProject) -> ApiResult<Project>;
    fn update_project(&self, id: Id, patch: &ProjectPatch) -> ApiResult<Project>;
    /// Deletes the project and all of its descendants
    fn delete_project(&self, id: Id) -> ApiResult<()>;
    fn reorder_projects(&self, entries: &[ReorderEntry<Option<Id>>]) -> ApiResult<()>;

    // Sections
    fn list_sections(&self, project_id: Id) -> ApiResult<Vec<Section>>;
    fn create_section(&self, new: &NewSection) -> ApiResult<Section>;
    fn update_section(&self, id: Id, patch: &SectionPatch) -> ApiResult<Section>;
    fn delete_section(&self, id: Id) -> ApiResult<()>;
    fn reorder_sections(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()>;

    // Tasks
    fn list_tasks(&self, section_id: Id) -> ApiResult<Vec<Task>>;
    fn create_task(&self, new: &NewTask) -> ApiResult<Task>;
    fn update_task(&self, id: Id, patch: &TaskPatch) -> ApiResult<Task>;
    fn delete_task(&self, id: Id) -> ApiResult<()>;
    fn set_task_completed(&self, id: Id, completed: bool) -> ApiResult<CompletionResponse>;
    fn reorder_tasks(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()>;

    // Checklists
    fn list_checklists(&self, task_id: Id) -> ApiResult<Vec<Checklist>>;
    fn create_checklist(&self, new: &NewChecklist) -> ApiResult<Checklist>;
    fn rename_checklist(&self, id: Id, title: &str) -> ApiResult<Checklist>;
    fn delete_checklist(&self, id: Id) -> ApiResult<()>;
    fn reorder_checklists(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()>;
    fn create_checklist_item(&self, new: &NewChecklistItem) -> ApiResult<ChecklistItem>;
    fn update_checklist_item(
        &self,
        id: Id,
        patch: &ChecklistItemPatch,
    ) -> ApiResult<ChecklistItem>;
    fn delete_checklist_item(&self, id: Id) -> ApiResult<()>;
    fn reorder_checklist_items(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()>;

    // Labels and priorities
    fn list_labels(&self) -> ApiResult<Vec<Label>>;
    fn create_label(&self, new: &NewLabel) -> ApiResult<Label>;
    fn update_label(&self, id: Id, update: &NewLabel) -> ApiResult<Label>;
    fn delete_label(&self, id: Id) -> ApiResult<()>;
    fn list_priorities(&self) -> ApiResult<Vec<Priority>>;
    fn create_priority(&self, new: &NewPriority) -> ApiResult<Priority>;
    fn update_priority(&self, id: Id, update: &NewPriority) -> ApiResult<Priority>;
    fn delete_priority(&self, id: Id) -> ApiResult<()>;

    // Recurring tasks
    fn list_recurring(&self) -> ApiResult<Vec<RecurringTask>>;
    fn create_recurring(&self, payload: &RecurrencePayload) -> ApiResult<RecurringTask>;
    fn update_recurring(&self, id: Id, payload: &RecurrencePayload) -> ApiResult<RecurringTask>;
    fn delete_recurring(&self, id: Id) -> ApiResult<()>;

    // Notes
    fn list_notes(&self) -> ApiResult<Vec<Note>>;
    fn create_note(&self, new: &NewNote) -> ApiResult<Note>;
    fn update_note(&self, id: Id, patch: &NotePatch) -> ApiResult<Note>;
    fn delete_note(&self, id: Id) -> ApiResult<()>;

    // Media library
    fn list_media(
        &self,
        media_type: MediaType,
        page: Option<PageRequest>,
    ) -> ApiResult<Page<MediaItem>>;
    fn create_media(&self, media_type: MediaType, new: &NewMedia) -> ApiResult<MediaItem>;
    fn update_media(&self, id: Id, patch: &MediaPatch) -> ApiResult<MediaItem>;
    fn delete_media(&self, id: Id) -> ApiResult<()>;
    fn import_media_csv(
        &self,
        media_type: MediaType,
        file_name: &str,
        contents: Vec<u8>,
    ) -> ApiResult<ImportSummary>;
    fn export_media_csv(&self, media_type: MediaType) -> ApiResult<String>;

    // Statistics
    fn list_completions(&self, from: NaiveDate, to: NaiveDate) -> ApiResult<Vec<Completion>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_decodes_bare_items() {
        let page: Page<Label> =
            serde_json::from_str(r#"{"items":[{"id":1,"name":"home"}]}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_more(PageRequest::first(50)));
    }

    fn labels(n: usize) -> Vec<Label> {
        (0..n)
            .map(|i| Label {
                id: i as Id,
                name: format!("l{}", i),
                color: None,
            })
            .collect()
    }

    #[test]
    fn test_page_has_more() {
        let page: Page<Label> = Page {
            items: labels(50),
            total: Some(120),
            page: Some(2),
            page_size: Some(50),
        };
        assert!(page.has_more(PageRequest { page: 2, page_size: 50 }));
        let last = Page::<Label> {
            page: Some(3),
            items: labels(20),
            ..page
        };
        assert!(!last.has_more(PageRequest { page: 3, page_size: 50 }));
    }

    #[test]
    fn test_full_page_without_total_may_have_more() {
        let full = Page {
            items: labels(2),
            total: None,
            page: None,
            page_size: None,
        };
        assert!(full.has_more(PageRequest::first(2)));
        let short = Page {
            items: labels(1),
            ..full
        };
        assert!(!short.has_more(PageRequest { page: 2, page_size: 2 }));
    }

    #[test]
    fn test_not_found_from_status() {
        let err = ApiError::Status {
            status: 404,
            body: String::new(),
        };
        assert!(err.is_not_found());
    }
}
