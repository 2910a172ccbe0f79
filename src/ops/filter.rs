use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::model::catalog::Priority;
use crate::model::media::{MediaItem, MediaStatus};
use crate::model::ordered::Id;
use crate::model::task::Task;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    /// Board order (`order_index`)
    #[default]
    Order,
    /// Earliest due date first, undated last
    Due,
    /// Highest priority level first, unprioritized last
    Priority,
    Title,
}

impl TaskSort {
    pub fn parse(s: &str) -> Option<TaskSort> {
        match s {
            "order" => Some(TaskSort::Order),
            "due" => Some(TaskSort::Due),
            "priority" => Some(TaskSort::Priority),
            "title" => Some(TaskSort::Title),
            _ => None,
        }
    }
}

/// Client-side task filter. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub label_id: Option<Id>,
    pub priority_id: Option<Id>,
    /// Case-insensitive substring of title or description
    pub text: Option<String>,
    pub due_before: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(completed) = self.completed
            && task.completed != completed
        {
            return false;
        }
        if let Some(label) = self.label_id
            && !task.has_label(label)
        {
            return false;
        }
        if let Some(priority) = self.priority_id
            && task.priority_id != Some(priority)
        {
            return false;
        }
        if let Some(limit) = self.due_before {
            match task.due_date {
                Some(due) if due < limit => {}
                _ => return false,
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_desc = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_desc {
                return false;
            }
        }
        true
    }
}

/// Filter and sort tasks. `priorities` resolves `priority_id` to a level for
/// `TaskSort::Priority`. Ties always fall back to board order.
pub fn filter_tasks<'a>(
    tasks: &'a [Task],
    filter: &TaskFilter,
    sort: TaskSort,
    priorities: &[Priority],
) -> Vec<&'a Task> {
    let level = |task: &Task| -> Option<i32> {
        task.priority_id
            .and_then(|pid| priorities.iter().find(|p| p.id == pid))
            .map(|p| p.level)
    };
    let mut out: Vec<&Task> = tasks.iter().filter(|t| filter.matches(t)).collect();
    out.sort_by(|a, b| {
        let primary = match sort {
            TaskSort::Order => Ordering::Equal,
            TaskSort::Due => none_last(a.due_date, b.due_date),
            TaskSort::Priority => none_last_desc(level(a), level(b)),
            TaskSort::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        };
        primary
            .then(a.section_id.cmp(&b.section_id))
            .then(a.order_index.cmp(&b.order_index))
    });
    out
}

/// Ascending with `None` sorted after every `Some`.
fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Descending with `None` sorted after every `Some`.
fn none_last_desc<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaSort {
    #[default]
    Title,
    /// Highest rating first, unrated last
    Rating,
    /// Most recently updated first
    Updated,
}

impl MediaSort {
    pub fn parse(s: &str) -> Option<MediaSort> {
        match s {
            "title" => Some(MediaSort::Title),
            "rating" => Some(MediaSort::Rating),
            "updated" => Some(MediaSort::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    pub status: Option<MediaStatus>,
    /// Case-insensitive substring of title or creator
    pub text: Option<String>,
    pub min_rating: Option<u8>,
}

impl MediaFilter {
    pub fn matches(&self, item: &MediaItem) -> bool {
        if let Some(status) = self.status
            && item.status != status
        {
            return false;
        }
        if let Some(min) = self.min_rating
            && item.rating.is_none_or(|r| r < min)
        {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let in_title = item.title.to_lowercase().contains(&needle);
            let in_creator = item
                .creator
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle));
            if !in_title && !in_creator {
                return false;
            }
        }
        true
    }
}

pub fn filter_media<'a>(
    items: &'a [MediaItem],
    filter: &MediaFilter,
    sort: MediaSort,
) -> Vec<&'a MediaItem> {
    let mut out: Vec<&MediaItem> = items.iter().filter(|i| filter.matches(i)).collect();
    out.sort_by(|a, b| {
        let primary = match sort {
            MediaSort::Title => Ordering::Equal,
            MediaSort::Rating => none_last_desc(a.rating, b.rating),
            MediaSort::Updated => none_last_desc(a.updated_at, b.updated_at),
        };
        primary
            .then(a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then(a.id.cmp(&b.id))
    });
    out
}
