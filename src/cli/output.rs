use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{
    Checklist, Id, ImportSummary, Label, MediaItem, MediaStatus, MediaType, Note, Priority,
    Project, RecurrenceType, RecurringTask, Section, Task,
};
use crate::ops::check::{CheckError, CheckResult};
use crate::ops::reorder::ReorderOutcome;
use crate::ops::streak::{Bucket, BucketCount, StreakSummary};
use crate::ops::weekday::{SundayFirst, days_to_frontend};
use crate::store::NoteLinks;
use crate::util::unicode::truncate_to_width;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProjectNodeJson {
    pub id: Id,
    pub name: String,
    pub order_index: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProjectNodeJson>,
}

#[derive(Serialize)]
pub struct OutcomeJson {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_error: Option<String>,
}

#[derive(Serialize)]
pub struct NoteDetailJson<'a> {
    #[serde(flatten)]
    pub note: &'a Note,
    pub links: Vec<&'a str>,
    pub dangling: Vec<String>,
    pub backlinks: Vec<&'a str>,
}

#[derive(Serialize)]
pub struct StatsJson {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(flatten)]
    pub summary: StreakSummary,
    pub buckets: Vec<BucketCount>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Nest a flat project list by `parent_id`, siblings in board order.
pub fn project_tree_json(projects: &[Project]) -> Vec<ProjectNodeJson> {
    let by_parent = children_by_parent(projects);
    build_nodes(&by_parent, None)
}

fn build_nodes(by_parent: &HashMap<Option<Id>, Vec<&Project>>, parent: Option<Id>) -> Vec<ProjectNodeJson> {
    by_parent
        .get(&parent)
        .map(|children| {
            children
                .iter()
                .map(|p| ProjectNodeJson {
                    id: p.id,
                    name: p.name.clone(),
                    order_index: p.order_index,
                    children: build_nodes(by_parent, Some(p.id)),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn children_by_parent(projects: &[Project]) -> HashMap<Option<Id>, Vec<&Project>> {
    let mut by_parent: HashMap<Option<Id>, Vec<&Project>> = HashMap::new();
    for project in projects {
        by_parent.entry(project.parent_id).or_default().push(project);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|p| (p.order_index, p.id));
    }
    by_parent
}

pub fn outcome_to_json(outcome: &ReorderOutcome) -> OutcomeJson {
    let (name, error, reload_error) = match outcome {
        ReorderOutcome::Skipped => ("skipped", None, None),
        ReorderOutcome::Queued => ("queued", None, None),
        ReorderOutcome::Settled => ("settled", None, None),
        ReorderOutcome::RolledBack {
            error,
            reload_error,
        } => ("rolled_back", Some(error.clone()), reload_error.clone()),
    };
    OutcomeJson {
        outcome: name,
        error,
        reload_error,
    }
}

pub fn note_detail_json<'a>(note: &'a Note, links: &NoteLinks<'a>) -> NoteDetailJson<'a> {
    NoteDetailJson {
        note,
        links: links.outgoing.iter().copied().map(|n| n.title.as_str()).collect(),
        dangling: links.dangling.clone(),
        backlinks: links.backlinks.iter().copied().map(|n| n.title.as_str()).collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Indented project tree, one project per line
pub fn format_project_tree(projects: &[Project], width: usize) -> Vec<String> {
    let by_parent = children_by_parent(projects);
    let mut lines = Vec::new();
    push_tree_lines(&by_parent, None, 0, width, &mut lines);
    lines
}

fn push_tree_lines(
    by_parent: &HashMap<Option<Id>, Vec<&Project>>,
    parent: Option<Id>,
    depth: usize,
    width: usize,
    lines: &mut Vec<String>,
) {
    let Some(children) = by_parent.get(&parent) else {
        return;
    };
    for project in children {
        lines.push(format!(
            "{}{} {}",
            "  ".repeat(depth),
            project.id,
            truncate_to_width(&project.name, width)
        ));
        push_tree_lines(by_parent, Some(project.id), depth + 1, width, lines);
    }
}

pub fn format_section_line(section: &Section, task_count: Option<usize>, width: usize) -> String {
    let name = truncate_to_width(&section.name, width);
    match task_count {
        Some(n) => format!("{:>2}. {} {} ({})", section.order_index, section.id, name, n),
        None => format!("{:>2}. {} {}", section.order_index, section.id, name),
    }
}

/// One-line task summary: `[x] 12 Title !High #home due 2026-10-20`
pub fn format_task_line(task: &Task, labels: &[Label], priorities: &[Priority], width: usize) -> String {
    let check = if task.completed { 'x' } else { ' ' };
    let mut line = format!("[{}] {} {}", check, task.id, truncate_to_width(&task.title, width));
    if let Some(priority) = task
        .priority_id
        .and_then(|id| priorities.iter().find(|p| p.id == id))
    {
        line.push_str(&format!(" !{}", priority.name));
    }
    for label_id in &task.label_ids {
        if let Some(label) = labels.iter().find(|l| l.id == *label_id) {
            line.push_str(&format!(" #{}", label.name));
        }
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due));
    }
    if task.recurring_task_id.is_some() {
        line.push_str(" (recurring)");
    }
    line
}

pub fn format_checklist(checklist: &Checklist) -> Vec<String> {
    let (done, total) = checklist.progress();
    let mut lines = vec![format!(
        "{} {} [{}/{}]",
        checklist.id, checklist.title, done, total
    )];
    for item in &checklist.items {
        let check = if item.completed { 'x' } else { ' ' };
        lines.push(format!("  [{}] {} {}", check, item.id, item.content));
    }
    lines
}

pub fn format_label_line(label: &Label) -> String {
    match &label.color {
        Some(color) => format!("{} {} ({})", label.id, label.name, color),
        None => format!("{} {}", label.id, label.name),
    }
}

pub fn format_priority_line(priority: &Priority) -> String {
    format!("{} {} (level {})", priority.id, priority.name, priority.level)
}

/// `3 Gym  weekly Mon,Wed,Fri at 18:00 -> section 2`
pub fn format_recurring_line(task: &RecurringTask) -> String {
    let schedule = match task.recurrence_type {
        RecurrenceType::Weekly => {
            let days: Vec<&str> = days_to_frontend(&task.recurrence_days)
                .into_iter()
                .map(SundayFirst::short_name)
                .collect();
            format!("weekly {}", days.join(","))
        }
        RecurrenceType::Daily => "daily".to_string(),
        RecurrenceType::AlternateDays => "every other day".to_string(),
    };
    let paused = if task.active { "" } else { " (paused)" };
    format!(
        "{} {}  {} at {} -> section {}{}",
        task.id, task.title, schedule, task.recurrence_time, task.section_id, paused
    )
}

pub fn format_note_line(note: &Note, width: usize) -> String {
    let updated = note
        .updated_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{} {}  {}", note.id, updated, truncate_to_width(&note.title, width))
}

pub fn format_note_detail(note: &Note, links: &NoteLinks<'_>) -> Vec<String> {
    let mut lines = vec![format!("# {}", note.title), String::new()];
    lines.extend(note.content.lines().map(str::to_string));
    if !links.outgoing.is_empty() || !links.dangling.is_empty() {
        lines.push(String::new());
        lines.push("links:".to_string());
        for linked in &links.outgoing {
            lines.push(format!("  {} {}", linked.id, linked.title));
        }
        for title in &links.dangling {
            lines.push(format!("  ? {}", title));
        }
    }
    if !links.backlinks.is_empty() {
        lines.push(String::new());
        lines.push("backlinks:".to_string());
        for linking in &links.backlinks {
            lines.push(format!("  {} {}", linking.id, linking.title));
        }
    }
    lines
}

pub fn format_media_line(item: &MediaItem, width: usize) -> String {
    let mut line = format!(
        "{} {} [{}]",
        item.id,
        truncate_to_width(&item.title, width),
        item.status.as_str()
    );
    if let Some(creator) = &item.creator {
        line.push_str(&format!(" by {}", creator));
    }
    if let Some(rating) = item.rating {
        line.push_str(&format!(" {}/10", rating));
    }
    if let Some(progress) = item.progress {
        line.push_str(&format!(" @{}", progress));
    }
    line
}

pub fn format_import_summary(summary: &ImportSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} rows: {} imported, {} skipped as duplicates",
        summary.total_rows, summary.imported, summary.skipped_duplicates
    )];
    for title in &summary.duplicate_titles {
        lines.push(format!("  skipped: {}", title));
    }
    lines
}

pub fn format_outcome(outcome: &ReorderOutcome) -> String {
    match outcome {
        ReorderOutcome::Skipped => "nothing to reorder".to_string(),
        ReorderOutcome::Queued => "order queued".to_string(),
        ReorderOutcome::Settled => "order saved".to_string(),
        ReorderOutcome::RolledBack {
            error,
            reload_error: None,
        } => format!("order rejected, reloaded from server: {}", error),
        ReorderOutcome::RolledBack {
            error,
            reload_error: Some(reload),
        } => format!(
            "order rejected ({}) and reload failed ({}); local view may be stale",
            error, reload
        ),
    }
}

pub fn format_stats(summary: &StreakSummary, buckets: &[BucketCount], bucket: Bucket) -> Vec<String> {
    let mut lines = vec![
        format!("current streak: {} days", summary.current),
        format!("longest streak: {} days", summary.longest),
        format!(
            "{} completions on {} days",
            summary.total_completions, summary.active_days
        ),
    ];
    if !buckets.is_empty() {
        lines.push(String::new());
        let max = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        for b in buckets {
            let label = match bucket {
                Bucket::Month => b.start.format("%Y-%m").to_string(),
                Bucket::Day | Bucket::Week => b.start.to_string(),
            };
            let bar = "#".repeat(b.count * 30 / max);
            lines.push(format!("{:<10} {:>4} {}", label, b.count, bar));
        }
    }
    lines
}

pub fn format_check(result: &CheckResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(match err {
                CheckError::DuplicateIndex {
                    resource,
                    scope,
                    order_index,
                    ids,
                } => format!(
                    "  [{} {}] index {} shared by {}",
                    resource,
                    scope,
                    order_index,
                    ids.iter().map(Id::to_string).collect::<Vec<_>>().join(", ")
                ),
                CheckError::Gap {
                    resource,
                    scope,
                    missing_index,
                } => format!("  [{} {}] index {} is missing", resource, scope, missing_index),
                CheckError::NegativeIndex {
                    resource,
                    scope,
                    id,
                    order_index,
                } => format!(
                    "  [{} {}] {} has negative index {}",
                    resource, scope, id, order_index
                ),
            });
        }
    }
    if result.valid {
        lines.push(format!("✓ {} scopes in order", result.scopes_checked));
    } else {
        lines.push(format!("✗ {} problems found", result.errors.len()));
    }
    lines
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

pub fn parse_media_type(s: &str) -> Result<MediaType, String> {
    MediaType::parse(s).ok_or_else(|| {
        format!(
            "unknown media type '{}' (expected: book, game, movie, show, anime, manga)",
            s
        )
    })
}

pub fn parse_media_status(s: &str) -> Result<MediaStatus, String> {
    MediaStatus::parse(s).ok_or_else(|| {
        format!(
            "unknown status '{}' (expected: planned, in_progress, completed, dropped)",
            s
        )
    })
}

pub fn parse_recurrence_type(s: &str) -> Result<RecurrenceType, String> {
    RecurrenceType::parse(s).ok_or_else(|| {
        format!(
            "unknown recurrence '{}' (expected: daily, alternate_days, weekly)",
            s
        )
    })
}

pub fn parse_days(values: &[String]) -> Result<Vec<SundayFirst>, String> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| SundayFirst::parse(v).ok_or_else(|| format!("unknown day '{}'", v)))
        .collect()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}
