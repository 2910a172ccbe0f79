//! Project tree store.
//!
//! Sibling order changes are not sent right away. They collect in a pending
//! map keyed by project id and go out as one batch once the debounce deadline
//! passes (`poll`) or on an explicit `flush`. A failed flush reloads the
//! whole tree.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use super::{StoreError, StoreResult, record, require_text};
use crate::api::Api;
use crate::model::config::SyncConfig;
use crate::model::{Id, NewProject, Position, Project, ProjectPatch, ReorderEntry};
use crate::ops::reorder::{
    self, ReorderOp, ReorderOutcome, ReorderPhase, index_for, ordering_with,
};

pub struct ProjectStore<'a> {
    api: &'a dyn Api,
    projects: Vec<Project>,
    error: Option<String>,
    pending: IndexMap<Id, ReorderEntry<Option<Id>>>,
    deadline: Option<Instant>,
    delay: Duration,
}

impl<'a> ProjectStore<'a> {
    pub fn new(api: &'a dyn Api, delay: Duration) -> Self {
        ProjectStore {
            api,
            projects: Vec::new(),
            error: None,
            pending: IndexMap::new(),
            deadline: None,
            delay,
        }
    }

    pub fn with_config(api: &'a dyn Api, sync: &SyncConfig) -> Self {
        ProjectStore::new(api, Duration::from_millis(sync.reorder_debounce_ms))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn all(&self) -> &[Project] {
        &self.projects
    }

    pub fn get(&self, id: Id) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Number of entries waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Children of `parent` (`None` = top level) in sibling order
    pub fn children(&self, parent: Option<Id>) -> Vec<&Project> {
        let mut out: Vec<&Project> = self
            .projects
            .iter()
            .filter(|p| p.parent_id == parent)
            .collect();
        out.sort_by_key(|p| (p.order_index, p.id));
        out
    }

    pub fn roots(&self) -> Vec<&Project> {
        self.children(None)
    }

    /// Ancestors of `id` from the top level down, ending with `id` itself.
    pub fn path(&self, id: Id) -> Vec<&Project> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.get(id);
        while let Some(project) = cursor {
            if !seen.insert(project.id) {
                break;
            }
            path.push(project);
            cursor = project.parent_id.and_then(|parent| self.get(parent));
        }
        path.reverse();
        path
    }

    /// `id` and every project below it
    pub fn descendants(&self, id: Id) -> Vec<Id> {
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            let parent = out[i];
            for child in self.children(Some(parent)) {
                if !out.contains(&child.id) {
                    out.push(child.id);
                }
            }
            i += 1;
        }
        out
    }

    /// Fetch the whole tree. On failure the cached tree is kept.
    pub fn load(&mut self) -> StoreResult<()> {
        self.error = None;
        self.projects = self
            .api
            .list_projects()
            .map_err(|e| record(&mut self.error, e))?;
        Ok(())
    }

    /// Create a project under `parent`. Inserting before the end queues the
    /// shifted sibling order.
    pub fn create(
        &mut self,
        name: &str,
        parent: Option<Id>,
        position: Position,
        now: Instant,
    ) -> StoreResult<Project> {
        self.error = None;
        let name = require_text(name, "name").map_err(|e| record(&mut self.error, e))?;
        if let Some(parent) = parent {
            self.ensure_known(parent)?;
        }
        let siblings = self.children(parent).len();
        let project = self
            .api
            .create_project(&NewProject {
                name,
                parent_id: parent,
                order_index: index_for(position, siblings),
                ..Default::default()
            })
            .map_err(|e| record(&mut self.error, e))?;
        tracing::debug!(id = project.id, parent = ?parent, "project created");
        self.projects.push(project.clone());

        if matches!(position, Position::At(index) if index < siblings) {
            let ordering = ordering_with(&self.projects, parent, project.id, position);
            self.reorder(parent, &ordering, now)?;
        }
        Ok(self.get(project.id).cloned().unwrap_or(project))
    }

    pub fn update(&mut self, id: Id, patch: ProjectPatch) -> StoreResult<Project> {
        self.error = None;
        self.ensure_known(id)?;
        let mut patch = patch;
        if let Some(name) = patch.name.take() {
            patch.name = Some(require_text(&name, "name").map_err(|e| record(&mut self.error, e))?);
        }
        let updated = self
            .api
            .update_project(id, &patch)
            .map_err(|e| record(&mut self.error, e))?;
        if let Some(cached) = self.projects.iter_mut().find(|p| p.id == id) {
            *cached = updated.clone();
        }
        Ok(updated)
    }

    /// Delete a project and, locally, everything below it. The siblings it
    /// leaves behind are compacted and queued.
    pub fn delete(&mut self, id: Id, now: Instant) -> StoreResult<usize> {
        self.error = None;
        let parent = self.ensure_known(id)?.parent_id;
        self.api
            .delete_project(id)
            .map_err(|e| record(&mut self.error, e))?;
        let doomed = self.descendants(id);
        self.projects.retain(|p| !doomed.contains(&p.id));
        for gone in &doomed {
            self.pending.shift_remove(gone);
        }
        tracing::debug!(id, removed = doomed.len(), "project deleted");

        let entries = reorder::compact(&mut self.projects, parent);
        self.queue(entries, now);
        Ok(doomed.len())
    }

    /// Reparent `id` under `parent` at `position`.
    pub fn move_to(
        &mut self,
        id: Id,
        parent: Option<Id>,
        position: Position,
        now: Instant,
    ) -> StoreResult<ReorderOutcome> {
        self.error = None;
        self.ensure_known(id)?;
        if let Some(parent) = parent {
            self.ensure_known(parent)?;
            if self.descendants(id).contains(&parent) {
                return Err(record(
                    &mut self.error,
                    StoreError::Validation(format!(
                        "cannot move project {} under its own descendant {}",
                        id, parent
                    )),
                ));
            }
        }
        let ordering = ordering_with(&self.projects, parent, id, position);
        self.reorder(parent, &ordering, now)
    }

    /// Apply a sibling ordering under `parent` locally and queue it.
    pub fn reorder(
        &mut self,
        parent: Option<Id>,
        ordered_ids: &[Id],
        now: Instant,
    ) -> StoreResult<ReorderOutcome> {
        self.error = None;
        if ordered_ids.is_empty() {
            return Ok(ReorderOutcome::Skipped);
        }
        let applied = reorder::apply_order(&mut self.projects, parent, ordered_ids)
            .map_err(|e| record(&mut self.error, e))?;
        self.queue(applied.entries, now);
        Ok(ReorderOutcome::Queued)
    }

    /// Flush if the debounce deadline has passed.
    pub fn poll(&mut self, now: Instant) -> StoreResult<Option<ReorderOutcome>> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush().map(Some),
            _ => Ok(None),
        }
    }

    /// Send every pending entry as one batch now.
    pub fn flush(&mut self) -> StoreResult<ReorderOutcome> {
        self.deadline = None;
        if self.pending.is_empty() {
            return Ok(ReorderOutcome::Skipped);
        }
        let entries: Vec<ReorderEntry<Option<Id>>> =
            self.pending.drain(..).map(|(_, entry)| entry).collect();

        let mut op = ReorderOp::new();
        op.advance(ReorderPhase::OptimisticallyApplied)?;
        op.advance(ReorderPhase::Persisting)?;
        tracing::debug!(entries = entries.len(), "flushing project order");
        match self.api.reorder_projects(&entries) {
            Ok(()) => {
                op.advance(ReorderPhase::Settled)?;
                Ok(ReorderOutcome::Settled)
            }
            Err(err) => {
                tracing::warn!(error = %err, "project reorder rejected, reloading tree");
                op.advance(ReorderPhase::RolledBack)?;
                let reload_error = self.load().err().map(|e| e.to_string());
                self.error = Some(err.to_string());
                op.advance(ReorderPhase::Idle)?;
                Ok(ReorderOutcome::RolledBack {
                    error: err.to_string(),
                    reload_error,
                })
            }
        }
    }

    fn queue(&mut self, entries: Vec<ReorderEntry<Option<Id>>>, now: Instant) {
        if entries.is_empty() {
            return;
        }
        for entry in entries {
            self.pending.insert(entry.id, entry);
        }
        self.deadline = Some(now + self.delay);
        tracing::trace!(pending = self.pending.len(), "project order queued");
    }

    fn ensure_known(&mut self, id: Id) -> StoreResult<&Project> {
        if self.get(id).is_none() {
            return Err(record(
                &mut self.error,
                StoreError::UnknownId {
                    resource: "project",
                    id,
                },
            ));
        }
        self.get(id).ok_or(StoreError::UnknownId {
            resource: "project",
            id,
        })
    }
}
