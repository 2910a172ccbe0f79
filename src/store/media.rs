use std::fs;
use std::path::Path;

use super::{StoreError, StoreResult, record};
use crate::api::{Api, PageRequest};
use crate::io::atomic_write;
use crate::model::{Id, ImportSummary, MediaItem, MediaPatch, MediaType, NewMedia};
use crate::ops::filter::{MediaFilter, MediaSort, filter_media};

/// Media library, cached per media type
pub struct MediaStore<'a> {
    api: &'a dyn Api,
    items: Vec<MediaItem>,
    page_size: u32,
    last_import: Option<ImportSummary>,
    error: Option<String>,
}

fn check_rating(rating: Option<u8>) -> StoreResult<()> {
    match rating {
        Some(r) if !(1..=10).contains(&r) => Err(StoreError::Validation(format!(
            "rating {} is out of range (1-10)",
            r
        ))),
        _ => Ok(()),
    }
}

impl<'a> MediaStore<'a> {
    pub fn new(api: &'a dyn Api, page_size: u32) -> Self {
        MediaStore {
            api,
            items: Vec::new(),
            page_size: page_size.max(1),
            last_import: None,
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Summary of the most recent CSV import
    pub fn last_import(&self) -> Option<&ImportSummary> {
        self.last_import.as_ref()
    }

    pub fn get(&self, id: Id) -> Option<&MediaItem> {
        self.items.iter().find(|m| m.id == id)
    }

    pub fn items_of(&self, media_type: MediaType) -> Vec<&MediaItem> {
        self.view(media_type, &MediaFilter::default(), MediaSort::Title)
    }

    pub fn view(
        &self,
        media_type: MediaType,
        filter: &MediaFilter,
        sort: MediaSort,
    ) -> Vec<&MediaItem> {
        filter_media(&self.items, filter, sort)
            .into_iter()
            .filter(|m| m.media_type == media_type)
            .collect()
    }

    /// Fetch every page of one media type. On failure the cached items of
    /// that type are kept.
    pub fn load(&mut self, media_type: MediaType) -> StoreResult<()> {
        self.error = None;
        let mut fresh = Vec::new();
        let mut request = PageRequest::first(self.page_size);
        loop {
            let page = self
                .api
                .list_media(media_type, Some(request))
                .map_err(|e| record(&mut self.error, e))?;
            let more = page.has_more(request);
            let before = fresh.len();
            for item in page.items {
                if !fresh.iter().any(|m: &MediaItem| m.id == item.id) {
                    fresh.push(item);
                }
            }
            // a server that ignores paging repeats the same items
            if !more || fresh.len() == before {
                break;
            }
            request.page += 1;
        }
        tracing::debug!(%media_type, count = fresh.len(), "media loaded");
        self.items.retain(|m| m.media_type != media_type);
        self.items.extend(fresh);
        Ok(())
    }

    pub fn create(&mut self, media_type: MediaType, new: NewMedia) -> StoreResult<MediaItem> {
        self.error = None;
        let title = super::require_text(&new.title, "title").map_err(|e| record(&mut self.error, e))?;
        check_rating(new.rating).map_err(|e| record(&mut self.error, e))?;
        let item = self
            .api
            .create_media(media_type, &NewMedia { title, ..new })
            .map_err(|e| record(&mut self.error, e))?;
        self.items.push(item.clone());
        Ok(item)
    }

    pub fn update(&mut self, id: Id, patch: MediaPatch) -> StoreResult<MediaItem> {
        self.error = None;
        check_rating(patch.rating).map_err(|e| record(&mut self.error, e))?;
        if self.get(id).is_none() {
            return Err(record(
                &mut self.error,
                StoreError::UnknownId {
                    resource: "media item",
                    id,
                },
            ));
        }
        let item = self
            .api
            .update_media(id, &patch)
            .map_err(|e| record(&mut self.error, e))?;
        if let Some(cached) = self.items.iter_mut().find(|m| m.id == id) {
            *cached = item.clone();
        }
        Ok(item)
    }

    pub fn delete(&mut self, id: Id) -> StoreResult<()> {
        self.error = None;
        self.api
            .delete_media(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.items.retain(|m| m.id != id);
        Ok(())
    }

    /// Upload a CSV file, then reload the media type so imported rows show up.
    pub fn import_file(&mut self, media_type: MediaType, path: &Path) -> StoreResult<ImportSummary> {
        self.error = None;
        let contents = fs::read(path).map_err(|e| record(&mut self.error, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.csv", media_type));
        let summary = self
            .api
            .import_media_csv(media_type, &file_name, contents)
            .map_err(|e| record(&mut self.error, e))?;
        tracing::debug!(
            %media_type,
            imported = summary.imported,
            skipped = summary.skipped_duplicates,
            "csv imported"
        );
        self.last_import = Some(summary.clone());
        self.load(media_type)?;
        Ok(summary)
    }

    /// Download the CSV export of a media type and write it to `path`.
    /// Returns the number of bytes written.
    pub fn export_file(&mut self, media_type: MediaType, path: &Path) -> StoreResult<usize> {
        self.error = None;
        let csv = self
            .api
            .export_media_csv(media_type)
            .map_err(|e| record(&mut self.error, e))?;
        atomic_write(path, csv.as_bytes()).map_err(|e| record(&mut self.error, e))?;
        Ok(csv.len())
    }
}
