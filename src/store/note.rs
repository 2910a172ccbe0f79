use super::{StoreError, StoreResult, record, require_text};
use crate::api::Api;
use crate::model::{Id, NewNote, Note, NotePatch};
use crate::ops::links;

pub struct NoteStore<'a> {
    api: &'a dyn Api,
    notes: Vec<Note>,
    error: Option<String>,
}

/// Resolved links of one note
#[derive(Debug)]
pub struct NoteLinks<'n> {
    pub outgoing: Vec<&'n Note>,
    /// Linked titles with no matching note
    pub dangling: Vec<String>,
    pub backlinks: Vec<&'n Note>,
}

impl<'a> NoteStore<'a> {
    pub fn new(api: &'a dyn Api) -> Self {
        NoteStore {
            api,
            notes: Vec::new(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Most recently updated first
    pub fn notes(&self) -> Vec<&Note> {
        let mut out: Vec<&Note> = self.notes.iter().collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        out
    }

    pub fn get(&self, id: Id) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn find_by_title(&self, title: &str) -> Option<&Note> {
        let title = title.trim().to_lowercase();
        self.notes.iter().find(|n| n.title.to_lowercase() == title)
    }

    /// Case-insensitive search over titles and content
    pub fn search(&self, text: &str) -> Vec<&Note> {
        let needle = text.trim().to_lowercase();
        self.notes()
            .into_iter()
            .filter(|n| {
                n.title.to_lowercase().contains(&needle)
                    || n.content.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn links(&self, id: Id) -> Option<NoteLinks<'_>> {
        let note = self.get(id)?;
        let (outgoing, dangling) = links::outgoing(&self.notes, note);
        Some(NoteLinks {
            outgoing,
            dangling,
            backlinks: links::backlinks(&self.notes, note),
        })
    }

    pub fn load(&mut self) -> StoreResult<()> {
        self.error = None;
        self.notes = self
            .api
            .list_notes()
            .map_err(|e| record(&mut self.error, e))?;
        Ok(())
    }

    pub fn create(&mut self, title: &str, content: &str) -> StoreResult<Note> {
        self.error = None;
        let title = require_text(title, "title").map_err(|e| record(&mut self.error, e))?;
        let note = self
            .api
            .create_note(&NewNote {
                title,
                content: content.to_string(),
            })
            .map_err(|e| record(&mut self.error, e))?;
        self.notes.push(note.clone());
        Ok(note)
    }

    pub fn update(&mut self, id: Id, mut patch: NotePatch) -> StoreResult<Note> {
        self.error = None;
        if self.get(id).is_none() {
            return Err(record(
                &mut self.error,
                StoreError::UnknownId { resource: "note", id },
            ));
        }
        if let Some(title) = patch.title.take() {
            patch.title = Some(require_text(&title, "title").map_err(|e| record(&mut self.error, e))?);
        }
        let note = self
            .api
            .update_note(id, &patch)
            .map_err(|e| record(&mut self.error, e))?;
        if let Some(cached) = self.notes.iter_mut().find(|n| n.id == id) {
            *cached = note.clone();
        }
        Ok(note)
    }

    pub fn delete(&mut self, id: Id) -> StoreResult<()> {
        self.error = None;
        self.api
            .delete_note(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.notes.retain(|n| n.id != id);
        Ok(())
    }
}
