//! JSON-over-HTTP client for the remote API using blocking reqwest

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Api, ApiError, ApiResult, Page, PageRequest};
use crate::model::config::ApiConfig;
use crate::model::{
    Checklist, ChecklistItem, ChecklistItemPatch, Completion, CompletionResponse, Id,
    ImportSummary, Label, MediaItem, MediaPatch, MediaType, NewChecklist, NewChecklistItem,
    NewLabel, NewMedia, NewNote, NewPriority, NewProject, NewSection, NewTask, Note, NotePatch,
    Priority, Project, ProjectPatch, RecurrencePayload, RecurringTask, ReorderEntry, Section,
    SectionPatch, Task, TaskPatch,
};

pub struct HttpApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct Batch<'a, T> {
    items: &'a [T],
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("plank/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(HttpApi {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "api request");
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and check the status, returning the raw response on 2xx.
    fn send(&self, builder: RequestBuilder) -> ApiResult<reqwest::blocking::Response> {
        let response = builder
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %body, "api error response");
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        self.send(builder)?
            .json::<T>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn empty(&self, builder: RequestBuilder) -> ApiResult<()> {
        self.send(builder).map(|_| ())
    }

    fn list<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Vec<T>> {
        let page: Page<T> = self.json(self.request(Method::GET, path))?;
        Ok(page.items)
    }

    fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.json(self.request(Method::POST, path).json(body))
    }

    fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.json(self.request(Method::PATCH, path).json(body))
    }

    fn delete(&self, path: &str) -> ApiResult<()> {
        self.empty(self.request(Method::DELETE, path))
    }

    fn reorder<T: Serialize>(&self, path: &str, entries: &[T]) -> ApiResult<()> {
        self.empty(
            self.request(Method::PUT, path)
                .json(&Batch { items: entries }),
        )
    }
}

impl Api for HttpApi {
    fn list_projects(&self) -> ApiResult<Vec<Project>> {
        self.list("/projects")
    }

    fn create_project(&self, new: &NewProject) -> ApiResult<Project> {
        self.post("/projects", new)
    }

    fn update_project(&self, id: Id, patch: &ProjectPatch) -> ApiResult<Project> {
        self.patch(&format!("/projects/{}", id), patch)
    }

    fn delete_project(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/projects/{}", id))
    }

    fn reorder_projects(&self, entries: &[ReorderEntry<Option<Id>>]) -> ApiResult<()> {
        self.reorder("/projects/reorder", entries)
    }

    fn list_sections(&self, project_id: Id) -> ApiResult<Vec<Section>> {
        self.list(&format!("/projects/{}/sections", project_id))
    }

    fn create_section(&self, new: &NewSection) -> ApiResult<Section> {
        self.post("/sections", new)
    }

    fn update_section(&self, id: Id, patch: &SectionPatch) -> ApiResult<Section> {
        self.patch(&format!("/sections/{}", id), patch)
    }

    fn delete_section(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/sections/{}", id))
    }

    fn reorder_sections(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()> {
        self.reorder("/sections/reorder", entries)
    }

    fn list_tasks(&self, section_id: Id) -> ApiResult<Vec<Task>> {
        self.list(&format!("/sections/{}/tasks", section_id))
    }

    fn create_task(&self, new: &NewTask) -> ApiResult<Task> {
        self.post("/tasks", new)
    }

    fn update_task(&self, id: Id, patch: &TaskPatch) -> ApiResult<Task> {
        self.patch(&format!("/tasks/{}", id), patch)
    }

    fn delete_task(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/tasks/{}", id))
    }

    fn set_task_completed(&self, id: Id, completed: bool) -> ApiResult<CompletionResponse> {
        self.post(
            &format!("/tasks/{}/complete", id),
            &serde_json::json!({ "completed": completed }),
        )
    }

    fn reorder_tasks(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()> {
        self.reorder("/tasks/reorder", entries)
    }

    fn list_checklists(&self, task_id: Id) -> ApiResult<Vec<Checklist>> {
        self.list(&format!("/tasks/{}/checklists", task_id))
    }

    fn create_checklist(&self, new: &NewChecklist) -> ApiResult<Checklist> {
        self.post("/checklists", new)
    }

    fn rename_checklist(&self, id: Id, title: &str) -> ApiResult<Checklist> {
        self.patch(
            &format!("/checklists/{}", id),
            &serde_json::json!({ "title": title }),
        )
    }

    fn delete_checklist(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/checklists/{}", id))
    }

    fn reorder_checklists(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()> {
        self.reorder("/checklists/reorder", entries)
    }

    fn create_checklist_item(&self, new: &NewChecklistItem) -> ApiResult<ChecklistItem> {
        self.post("/checklist-items", new)
    }

    fn update_checklist_item(
        &self,
        id: Id,
        patch: &ChecklistItemPatch,
    ) -> ApiResult<ChecklistItem> {
        self.patch(&format!("/checklist-items/{}", id), patch)
    }

    fn delete_checklist_item(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/checklist-items/{}", id))
    }

    fn reorder_checklist_items(&self, entries: &[ReorderEntry<Id>]) -> ApiResult<()> {
        self.reorder("/checklist-items/reorder", entries)
    }

    fn list_labels(&self) -> ApiResult<Vec<Label>> {
        self.list("/labels")
    }

    fn create_label(&self, new: &NewLabel) -> ApiResult<Label> {
        self.post("/labels", new)
    }

    fn update_label(&self, id: Id, update: &NewLabel) -> ApiResult<Label> {
        self.patch(&format!("/labels/{}", id), update)
    }

    fn delete_label(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/labels/{}", id))
    }

    fn list_priorities(&self) -> ApiResult<Vec<Priority>> {
        self.list("/priorities")
    }

    fn create_priority(&self, new: &NewPriority) -> ApiResult<Priority> {
        self.post("/priorities", new)
    }

    fn update_priority(&self, id: Id, update: &NewPriority) -> ApiResult<Priority> {
        self.patch(&format!("/priorities/{}", id), update)
    }

    fn delete_priority(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/priorities/{}", id))
    }

    fn list_recurring(&self) -> ApiResult<Vec<RecurringTask>> {
        self.list("/recurring-tasks")
    }

    fn create_recurring(&self, payload: &RecurrencePayload) -> ApiResult<RecurringTask> {
        self.post("/recurring-tasks", payload)
    }

    fn update_recurring(&self, id: Id, payload: &RecurrencePayload) -> ApiResult<RecurringTask> {
        self.patch(&format!("/recurring-tasks/{}", id), payload)
    }

    fn delete_recurring(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/recurring-tasks/{}", id))
    }

    fn list_notes(&self) -> ApiResult<Vec<Note>> {
        self.list("/notes")
    }

    fn create_note(&self, new: &NewNote) -> ApiResult<Note> {
        self.post("/notes", new)
    }

    fn update_note(&self, id: Id, patch: &NotePatch) -> ApiResult<Note> {
        self.patch(&format!("/notes/{}", id), patch)
    }

    fn delete_note(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/notes/{}", id))
    }

    fn list_media(
        &self,
        media_type: MediaType,
        page: Option<PageRequest>,
    ) -> ApiResult<Page<MediaItem>> {
        let mut builder = self.request(Method::GET, &format!("/media/{}", media_type));
        if let Some(page) = page {
            builder = builder.query(&page);
        }
        self.json(builder)
    }

    fn create_media(&self, media_type: MediaType, new: &NewMedia) -> ApiResult<MediaItem> {
        self.post(&format!("/media/{}", media_type), new)
    }

    fn update_media(&self, id: Id, patch: &MediaPatch) -> ApiResult<MediaItem> {
        self.patch(&format!("/media/items/{}", id), patch)
    }

    fn delete_media(&self, id: Id) -> ApiResult<()> {
        self.delete(&format!("/media/items/{}", id))
    }

    fn import_media_csv(
        &self,
        media_type: MediaType,
        file_name: &str,
        contents: Vec<u8>,
    ) -> ApiResult<ImportSummary> {
        let part = multipart::Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);
        self.json(
            self.request(Method::POST, &format!("/media/{}/import", media_type))
                .multipart(form),
        )
    }

    fn export_media_csv(&self, media_type: MediaType) -> ApiResult<String> {
        self.send(self.request(Method::GET, &format!("/media/{}/export", media_type)))?
            .text()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn list_completions(&self, from: NaiveDate, to: NaiveDate) -> ApiResult<Vec<Completion>> {
        let builder = self
            .request(Method::GET, "/stats/completions")
            .query(&[("from", from.to_string()), ("to", to.to_string())]);
        let page: Page<Completion> = self.json(builder)?;
        Ok(page.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ApiConfig {
            base_url: "http://localhost:9000/api/".into(),
            token: None,
            timeout_secs: 5,
        };
        let api = HttpApi::new(&config).unwrap();
        assert_eq!(api.base_url(), "http://localhost:9000/api");
    }

    #[test]
    fn test_batch_body_shape() {
        let entries = [ReorderEntry::of::<Task>(4, 2, 0)];
        let body = serde_json::to_value(Batch { items: &entries }).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"items": [{"id": 4, "section_id": 2, "order_index": 0}]})
        );
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:1".into(),
            token: None,
            timeout_secs: 2,
        };
        let api = HttpApi::new(&config).unwrap();
        assert!(matches!(api.list_labels(), Err(ApiError::Transport(_))));
    }
}
