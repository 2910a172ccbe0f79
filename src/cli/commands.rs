use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::Id;

#[derive(Parser)]
#[command(name = "pk", about = concat!("plank v", env!("CARGO_PKG_VERSION"), " - boards, notes and a media shelf from the terminal"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Talk to a different API (overrides config and PLANK_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the project tree
    Projects(ProjectsCmd),
    /// Manage the sections (columns) of a project
    Sections(SectionsCmd),
    /// Manage tasks inside sections
    Tasks(TasksCmd),
    /// Manage checklists attached to a task
    Checklists(ChecklistsCmd),
    /// Manage labels
    Labels(LabelsCmd),
    /// Manage priority levels
    Priorities(PrioritiesCmd),
    /// Manage recurring tasks
    Recurring(RecurringCmd),
    /// Manage notes
    Notes(NotesCmd),
    /// Manage the media library
    Media(MediaCmd),
    /// Show completion streaks and counts
    Stats(StatsArgs),
    /// Verify the ordering of every project, section and task
    Check,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ProjectsCmd {
    #[command(subcommand)]
    pub action: Option<ProjectsAction>,
}

#[derive(Subcommand)]
pub enum ProjectsAction {
    /// Show the project tree (default)
    List,
    /// Create a project
    Add(ProjectAddArgs),
    /// Rename a project
    Rename(RenameArgs),
    /// Delete a project and everything below it
    Rm(IdArg),
    /// Move a project to another parent or position
    Mv(ProjectMvArgs),
}

#[derive(Args)]
pub struct ProjectAddArgs {
    pub name: String,
    /// Parent project (default: top level)
    #[arg(long)]
    pub parent: Option<Id>,
    /// Insert at this 0-based position (default: last)
    #[arg(long)]
    pub at: Option<usize>,
}

#[derive(Args)]
pub struct ProjectMvArgs {
    pub id: Id,
    /// New parent project
    #[arg(long, conflicts_with = "root")]
    pub parent: Option<Id>,
    /// Move to the top level
    #[arg(long)]
    pub root: bool,
    /// 0-based position among the new siblings (default: last)
    #[arg(long)]
    pub at: Option<usize>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SectionsCmd {
    #[command(subcommand)]
    pub action: SectionsAction,
}

#[derive(Subcommand)]
pub enum SectionsAction {
    /// List the sections of a project
    List(ProjectArg),
    /// Add a section to a project
    Add(SectionAddArgs),
    /// Rename a section
    Rename(RenameArgs),
    /// Delete a section and its tasks
    Rm(IdArg),
    /// Set the full order of a project's sections
    Reorder(ReorderArgs),
}

#[derive(Args)]
pub struct ProjectArg {
    pub project: Id,
}

#[derive(Args)]
pub struct SectionAddArgs {
    pub project: Id,
    pub name: String,
    /// Insert at this 0-based position (default: last)
    #[arg(long)]
    pub at: Option<usize>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TasksCmd {
    #[command(subcommand)]
    pub action: TasksAction,
}

#[derive(Subcommand)]
pub enum TasksAction {
    /// List the tasks of a section
    List(TaskListArgs),
    /// Add a task to a section
    Add(TaskAddArgs),
    /// Change fields of a task
    Edit(TaskEditArgs),
    /// Delete a task
    Rm(IdArg),
    /// Mark a task done (or not done with --undo)
    Done(TaskDoneArgs),
    /// Move a task to another section or position
    Mv(TaskMvArgs),
    /// Set the full order of a section's tasks
    Reorder(ReorderArgs),
}

#[derive(Args)]
pub struct TaskListArgs {
    pub section: Id,
    /// Only completed tasks
    #[arg(long, conflicts_with = "open")]
    pub done: bool,
    /// Only open tasks
    #[arg(long)]
    pub open: bool,
    /// Only tasks with this label (name)
    #[arg(long)]
    pub label: Option<String>,
    /// Only tasks with this priority (name)
    #[arg(long)]
    pub priority: Option<String>,
    /// Case-insensitive text match on title or description
    #[arg(long)]
    pub search: Option<String>,
    /// Only tasks due on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub due_before: Option<String>,
    /// Sort order: order, due, priority, title
    #[arg(long, default_value = "order")]
    pub sort: String,
}

#[derive(Args)]
pub struct TaskAddArgs {
    pub section: Id,
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    /// Priority name
    #[arg(long)]
    pub priority: Option<String>,
    /// Label name (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,
    /// Insert at this 0-based position (default: last)
    #[arg(long)]
    pub at: Option<usize>,
}

#[derive(Args)]
pub struct TaskEditArgs {
    pub id: Id,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    /// Priority name
    #[arg(long)]
    pub priority: Option<String>,
    /// Replace the labels (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,
}

#[derive(Args)]
pub struct TaskDoneArgs {
    pub id: Id,
    /// Reopen instead
    #[arg(long)]
    pub undo: bool,
}

#[derive(Args)]
pub struct TaskMvArgs {
    pub id: Id,
    /// Target section
    pub section: Id,
    /// 0-based position in the target section (default: last)
    #[arg(long)]
    pub at: Option<usize>,
}

// ---------------------------------------------------------------------------
// Checklists
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ChecklistsCmd {
    #[command(subcommand)]
    pub action: ChecklistsAction,
}

#[derive(Subcommand)]
pub enum ChecklistsAction {
    /// Show the checklists of a task
    List(TaskArg),
    /// Add a checklist to a task
    Add(ChecklistAddArgs),
    /// Delete a checklist
    Rm(ChecklistRef),
    /// Set the full order of a task's checklists
    Reorder(ReorderArgs),
    /// Manage checklist items
    Item(ChecklistItemCmd),
}

#[derive(Args)]
pub struct TaskArg {
    pub task: Id,
}

#[derive(Args)]
pub struct ChecklistAddArgs {
    pub task: Id,
    pub title: String,
    #[arg(long)]
    pub at: Option<usize>,
}

#[derive(Args)]
pub struct ChecklistRef {
    pub task: Id,
    pub checklist: Id,
}

#[derive(Args)]
pub struct ChecklistItemCmd {
    #[command(subcommand)]
    pub action: ChecklistItemAction,
}

#[derive(Subcommand)]
pub enum ChecklistItemAction {
    /// Add an item to a checklist
    Add(ItemAddArgs),
    /// Tick or untick an item
    Toggle(ItemRef),
    /// Delete an item
    Rm(ItemRef),
    /// Set the full order of a checklist's items
    Reorder(ItemReorderArgs),
}

#[derive(Args)]
pub struct ItemAddArgs {
    pub task: Id,
    pub checklist: Id,
    pub content: String,
    #[arg(long)]
    pub at: Option<usize>,
}

#[derive(Args)]
pub struct ItemRef {
    pub task: Id,
    pub item: Id,
}

#[derive(Args)]
pub struct ItemReorderArgs {
    pub task: Id,
    pub checklist: Id,
    /// Item ids in their new order
    #[arg(required = true)]
    pub ids: Vec<Id>,
}

// ---------------------------------------------------------------------------
// Labels and priorities
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct LabelsCmd {
    #[command(subcommand)]
    pub action: Option<LabelsAction>,
}

#[derive(Subcommand)]
pub enum LabelsAction {
    /// List labels (default)
    List,
    /// Create a label
    Add(LabelAddArgs),
    /// Delete a label by name
    Rm(NameArg),
}

#[derive(Args)]
pub struct LabelAddArgs {
    pub name: String,
    /// Color, e.g. #ff8800
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct PrioritiesCmd {
    #[command(subcommand)]
    pub action: Option<PrioritiesAction>,
}

#[derive(Subcommand)]
pub enum PrioritiesAction {
    /// List priorities, most urgent first (default)
    List,
    /// Create a priority
    Add(PriorityAddArgs),
    /// Delete a priority by name
    Rm(NameArg),
}

#[derive(Args)]
pub struct PriorityAddArgs {
    pub name: String,
    /// Higher levels sort first
    pub level: i32,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct NameArg {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Recurring tasks
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecurringCmd {
    #[command(subcommand)]
    pub action: Option<RecurringAction>,
}

#[derive(Subcommand)]
pub enum RecurringAction {
    /// List recurring tasks (default)
    List,
    /// Create a recurring task
    Add(RecurringAddArgs),
    /// Delete a recurring task
    Rm(IdArg),
}

#[derive(Args)]
pub struct RecurringAddArgs {
    pub title: String,
    /// Section that receives the generated tasks
    #[arg(long)]
    pub section: Id,
    /// daily, alternate_days or weekly
    #[arg(long = "every", default_value = "daily")]
    pub recurrence: String,
    /// Days for weekly recurrences, e.g. mon,wed,fri
    #[arg(long, value_delimiter = ',')]
    pub days: Vec<String>,
    /// Time of day (HH:MM)
    #[arg(long)]
    pub time: String,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NotesCmd {
    #[command(subcommand)]
    pub action: Option<NotesAction>,
}

#[derive(Subcommand)]
pub enum NotesAction {
    /// List notes, most recently updated first (default)
    List,
    /// Create a note
    Add(NoteAddArgs),
    /// Show a note with its links and backlinks
    Show(IdArg),
    /// Change a note's title or content
    Edit(NoteEditArgs),
    /// Delete a note
    Rm(IdArg),
    /// Search titles and content
    Search(SearchArgs),
}

#[derive(Args)]
pub struct NoteAddArgs {
    pub title: String,
    /// Note body; `[[Title]]` links to another note
    #[arg(long, default_value = "")]
    pub content: String,
}

#[derive(Args)]
pub struct NoteEditArgs {
    pub id: Id,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    pub text: String,
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct MediaCmd {
    #[command(subcommand)]
    pub action: MediaAction,
}

#[derive(Subcommand)]
pub enum MediaAction {
    /// List items of one media type
    List(MediaListArgs),
    /// Add an item
    Add(MediaAddArgs),
    /// Delete an item
    Rm(IdArg),
    /// Import a CSV file, skipping titles already in the library
    Import(MediaFileArgs),
    /// Export one media type as CSV
    Export(MediaFileArgs),
}

#[derive(Args)]
pub struct MediaListArgs {
    /// book, game, movie, show, anime or manga
    pub media_type: String,
    /// planned, in_progress, completed or dropped
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub min_rating: Option<u8>,
    /// Sort order: title, rating, updated
    #[arg(long, default_value = "title")]
    pub sort: String,
}

#[derive(Args)]
pub struct MediaAddArgs {
    pub media_type: String,
    pub title: String,
    #[arg(long)]
    pub creator: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    /// 1 to 10
    #[arg(long)]
    pub rating: Option<u8>,
    #[arg(long)]
    pub progress: Option<u32>,
}

#[derive(Args)]
pub struct MediaFileArgs {
    pub media_type: String,
    pub file: PathBuf,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct StatsArgs {
    /// First day (YYYY-MM-DD, default: 30 days ago)
    #[arg(long)]
    pub from: Option<String>,
    /// Last day (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub to: Option<String>,
    /// Bucket counts by day, week or month
    #[arg(long, default_value = "week")]
    pub by: String,
}

// ---------------------------------------------------------------------------
// Shared args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArg {
    pub id: Id,
}

#[derive(Args)]
pub struct RenameArgs {
    pub id: Id,
    pub name: String,
}

#[derive(Args)]
pub struct ReorderArgs {
    /// Parent scope (project for sections, section for tasks, task for checklists)
    pub scope: Id,
    /// Ids in their new order
    #[arg(required = true)]
    pub ids: Vec<Id>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_task_move() {
        let cli = Cli::try_parse_from(["pk", "--json", "tasks", "mv", "7", "3", "--at", "0"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Tasks(TasksCmd {
                action: TasksAction::Mv(args),
            }) => {
                assert_eq!((args.id, args.section, args.at), (7, 3, Some(0)));
            }
            _ => panic!("expected tasks mv"),
        }
    }

    #[test]
    fn test_recurring_days_split_on_commas() {
        let cli = Cli::try_parse_from([
            "pk", "recurring", "add", "Gym", "--section", "2", "--every", "weekly", "--days",
            "mon,wed,fri", "--time", "18:00",
        ])
        .unwrap();
        match cli.command {
            Commands::Recurring(RecurringCmd {
                action: Some(RecurringAction::Add(args)),
            }) => assert_eq!(args.days, vec!["mon", "wed", "fri"]),
            _ => panic!("expected recurring add"),
        }
    }

    #[test]
    fn test_project_mv_parent_conflicts_with_root() {
        assert!(Cli::try_parse_from(["pk", "projects", "mv", "1", "--parent", "2", "--root"]).is_err());
    }
}
