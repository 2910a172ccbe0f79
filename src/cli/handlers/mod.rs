use std::error::Error;
use std::path::Path;
use std::time::Instant;

use chrono::{Days, Utc};

use crate::api::{Api, HttpApi};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::load_config;
use crate::model::{
    ClientConfig, Id, MediaStatus, NewMedia, NewTask, NotePatch, Position, ProjectPatch, TaskPatch,
};
use crate::ops::check::CheckResult;
use crate::ops::filter::{MediaFilter, MediaSort, TaskFilter, TaskSort};
use crate::ops::reorder::ReorderOutcome;
use crate::ops::streak::Bucket;
use crate::store::{
    ChecklistStore, LabelStore, MediaStore, NoteStore, PriorityStore, ProjectStore,
    RecurrenceForm, RecurringStore, SectionStore, StatsStore, TaskStore,
};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(cli.config.as_deref(), cli.api_url.as_deref())?;
    let api = HttpApi::new(&config.api)?;
    tracing::debug!(base_url = api.base_url(), "api client ready");
    run(cli.command, &api, &config, cli.json)
}

/// Run one command against any `Api`.
pub fn run(
    command: Commands,
    api: &dyn Api,
    config: &ClientConfig,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let ctx = Ctx { api, config, json };
    match command {
        Commands::Projects(args) => cmd_projects(&ctx, args.action.unwrap_or(ProjectsAction::List)),
        Commands::Sections(args) => cmd_sections(&ctx, args.action),
        Commands::Tasks(args) => cmd_tasks(&ctx, args.action),
        Commands::Checklists(args) => cmd_checklists(&ctx, args.action),
        Commands::Labels(args) => cmd_labels(&ctx, args.action.unwrap_or(LabelsAction::List)),
        Commands::Priorities(args) => {
            cmd_priorities(&ctx, args.action.unwrap_or(PrioritiesAction::List))
        }
        Commands::Recurring(args) => {
            cmd_recurring(&ctx, args.action.unwrap_or(RecurringAction::List))
        }
        Commands::Notes(args) => cmd_notes(&ctx, args.action.unwrap_or(NotesAction::List)),
        Commands::Media(args) => cmd_media(&ctx, args.action),
        Commands::Stats(args) => cmd_stats(&ctx, args),
        Commands::Check => cmd_check(&ctx),
    }
}

fn resolve_config(path: Option<&Path>, api_url: Option<&str>) -> Result<ClientConfig, Box<dyn Error>> {
    let mut config = load_config(path)?;
    if let Some(url) = api_url {
        config.api.base_url = url.trim_end_matches('/').to_string();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Ctx<'a> {
    api: &'a dyn Api,
    config: &'a ClientConfig,
    json: bool,
}

impl Ctx<'_> {
    fn width(&self) -> usize {
        self.config.ui.title_width
    }
}

fn position(at: Option<usize>) -> Position {
    at.map(Position::At).unwrap_or_default()
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

/// Print how a reorder ended. A rollback is an error for the exit code.
fn report_outcome(ctx: &Ctx, outcome: &ReorderOutcome) -> Result<(), Box<dyn Error>> {
    if matches!(outcome, ReorderOutcome::Skipped) {
        return Ok(());
    }
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&outcome_to_json(outcome))?);
    } else {
        println!("{}", format_outcome(outcome));
    }
    match outcome {
        ReorderOutcome::RolledBack { error, .. } => Err(format!("reorder rolled back: {}", error).into()),
        _ => Ok(()),
    }
}

fn load_projects<'a>(ctx: &Ctx<'a>) -> Result<ProjectStore<'a>, Box<dyn Error>> {
    let mut projects = ProjectStore::with_config(ctx.api, &ctx.config.sync);
    projects.load()?;
    Ok(projects)
}

/// Load the sections of every project.
fn load_sections<'a>(ctx: &Ctx<'a>, projects: &ProjectStore) -> Result<SectionStore<'a>, Box<dyn Error>> {
    let mut sections = SectionStore::new(ctx.api);
    for project in projects.all() {
        sections.load(project.id)?;
    }
    Ok(sections)
}

/// Sections store with the section `id` and its siblings loaded.
fn locate_section<'a>(ctx: &Ctx<'a>, id: Id) -> Result<SectionStore<'a>, Box<dyn Error>> {
    let projects = load_projects(ctx)?;
    let sections = load_sections(ctx, &projects)?;
    if sections.get(id).is_none() {
        return Err(format!("section not found: {}", id).into());
    }
    Ok(sections)
}

/// Task store with the section holding task `id` loaded. Sections are
/// fetched one at a time until the task turns up.
fn locate_task<'a>(ctx: &Ctx<'a>, id: Id) -> Result<TaskStore<'a>, Box<dyn Error>> {
    let projects = load_projects(ctx)?;
    let sections = load_sections(ctx, &projects)?;
    let mut tasks = TaskStore::new(ctx.api);
    for section in sections.all() {
        tasks.load(section.id)?;
        if tasks.get(id).is_some() {
            return Ok(tasks);
        }
    }
    Err(format!("task not found: {}", id).into())
}

fn resolve_priority(priorities: &PriorityStore, name: Option<&str>) -> Result<Option<Id>, Box<dyn Error>> {
    match name {
        None => Ok(None),
        Some(name) => priorities
            .find(name)
            .map(|p| Some(p.id))
            .ok_or_else(|| -> Box<dyn Error> { format!("priority not found: {}", name).into() }),
    }
}

fn resolve_labels(labels: &LabelStore, names: &[String]) -> Result<Vec<Id>, Box<dyn Error>> {
    names
        .iter()
        .map(|name| {
            labels
                .find(name)
                .map(|l| l.id)
                .ok_or_else(|| -> Box<dyn Error> { format!("label not found: {}", name).into() })
        })
        .collect()
}

fn catalogs<'a>(ctx: &Ctx<'a>) -> Result<(LabelStore<'a>, PriorityStore<'a>), Box<dyn Error>> {
    let mut labels = LabelStore::new(ctx.api);
    labels.load()?;
    let mut priorities = PriorityStore::new(ctx.api);
    priorities.load()?;
    Ok((labels, priorities))
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

fn cmd_projects(ctx: &Ctx, action: ProjectsAction) -> Result<(), Box<dyn Error>> {
    let mut projects = load_projects(ctx)?;
    match action {
        ProjectsAction::List => {
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&project_tree_json(projects.all()))?);
            } else {
                print_lines(&format_project_tree(projects.all(), ctx.width()));
            }
            return Ok(());
        }
        ProjectsAction::Add(args) => {
            let project = projects.create(&args.name, args.parent, position(args.at), Instant::now())?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&project)?);
            } else {
                println!("{}", project.id);
            }
        }
        ProjectsAction::Rename(args) => {
            let project = projects.update(
                args.id,
                ProjectPatch {
                    name: Some(args.name),
                    ..Default::default()
                },
            )?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&project)?);
            }
        }
        ProjectsAction::Rm(args) => {
            let removed = projects.delete(args.id, Instant::now())?;
            if !ctx.json {
                println!("deleted {} project(s)", removed);
            }
        }
        ProjectsAction::Mv(args) => {
            let parent = if args.root {
                None
            } else {
                match args.parent {
                    Some(parent) => Some(parent),
                    None => projects
                        .get(args.id)
                        .ok_or_else(|| format!("project not found: {}", args.id))?
                        .parent_id,
                }
            };
            projects.move_to(args.id, parent, position(args.at), Instant::now())?;
        }
    }
    // the command is about to exit, so skip the debounce window
    let outcome = projects.flush()?;
    report_outcome(ctx, &outcome)
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn cmd_sections(ctx: &Ctx, action: SectionsAction) -> Result<(), Box<dyn Error>> {
    match action {
        SectionsAction::List(args) => {
            let mut sections = SectionStore::new(ctx.api);
            sections.load(args.project)?;
            let listed = sections.in_project(args.project);
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                for section in listed {
                    println!("{}", format_section_line(section, None, ctx.width()));
                }
            }
            Ok(())
        }
        SectionsAction::Add(args) => {
            let mut sections = SectionStore::new(ctx.api);
            sections.load(args.project)?;
            let section = sections.create(args.project, &args.name, position(args.at))?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&section)?);
            } else {
                println!("{}", section.id);
            }
            Ok(())
        }
        SectionsAction::Rename(args) => {
            let mut sections = locate_section(ctx, args.id)?;
            let section = sections.rename(args.id, &args.name)?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&section)?);
            }
            Ok(())
        }
        SectionsAction::Rm(args) => {
            let mut sections = locate_section(ctx, args.id)?;
            let outcome = sections.delete(args.id)?;
            report_outcome(ctx, &outcome)
        }
        SectionsAction::Reorder(args) => {
            let mut sections = SectionStore::new(ctx.api);
            sections.load(args.scope)?;
            let outcome = sections.reorder(args.scope, &args.ids)?;
            report_outcome(ctx, &outcome)
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn cmd_tasks(ctx: &Ctx, action: TasksAction) -> Result<(), Box<dyn Error>> {
    match action {
        TasksAction::List(args) => cmd_tasks_list(ctx, args),
        TasksAction::Add(args) => {
            let (labels, priorities) = catalogs(ctx)?;
            let draft = NewTask {
                section_id: args.section,
                title: args.title,
                description: args.description,
                due_date: args.due.as_deref().map(parse_date).transpose()?,
                priority_id: resolve_priority(&priorities, args.priority.as_deref())?,
                label_ids: resolve_labels(&labels, &args.labels)?,
                ..Default::default()
            };
            let mut tasks = TaskStore::new(ctx.api);
            tasks.load(args.section)?;
            let task = tasks.create(draft, position(args.at))?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                println!("{}", task.id);
            }
            Ok(())
        }
        TasksAction::Edit(args) => {
            let (labels, priorities) = catalogs(ctx)?;
            let patch = TaskPatch {
                title: args.title,
                description: args.description,
                due_date: args.due.as_deref().map(parse_date).transpose()?,
                priority_id: resolve_priority(&priorities, args.priority.as_deref())?,
                label_ids: if args.labels.is_empty() {
                    None
                } else {
                    Some(resolve_labels(&labels, &args.labels)?)
                },
            };
            let mut tasks = locate_task(ctx, args.id)?;
            let task = tasks.update(args.id, patch)?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                println!(
                    "{}",
                    format_task_line(&task, &[], priorities.all(), ctx.width())
                );
            }
            Ok(())
        }
        TasksAction::Rm(args) => {
            let mut tasks = locate_task(ctx, args.id)?;
            let outcome = tasks.delete(args.id)?;
            report_outcome(ctx, &outcome)
        }
        TasksAction::Done(args) => {
            let mut tasks = locate_task(ctx, args.id)?;
            let task = tasks.set_completed(args.id, !args.undo)?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                println!("{}", format_task_line(&task, &[], &[], ctx.width()));
            }
            Ok(())
        }
        TasksAction::Mv(args) => {
            let mut tasks = locate_task(ctx, args.id)?;
            tasks.load(args.section)?;
            let outcome = tasks.move_to(args.id, args.section, position(args.at))?;
            report_outcome(ctx, &outcome)
        }
        TasksAction::Reorder(args) => {
            let mut tasks = TaskStore::new(ctx.api);
            tasks.load(args.scope)?;
            let outcome = tasks.reorder(args.scope, &args.ids)?;
            report_outcome(ctx, &outcome)
        }
    }
}

fn cmd_tasks_list(ctx: &Ctx, args: TaskListArgs) -> Result<(), Box<dyn Error>> {
    let (labels, priorities) = catalogs(ctx)?;
    let sort = TaskSort::parse(&args.sort)
        .ok_or_else(|| format!("unknown sort '{}' (expected: order, due, priority, title)", args.sort))?;
    let filter = TaskFilter {
        completed: if args.done {
            Some(true)
        } else if args.open {
            Some(false)
        } else {
            None
        },
        label_id: match args.label.as_deref() {
            Some(name) => Some(resolve_labels(&labels, &[name.to_string()])?[0]),
            None => None,
        },
        priority_id: resolve_priority(&priorities, args.priority.as_deref())?,
        text: args.search,
        due_before: args.due_before.as_deref().map(parse_date).transpose()?,
    };

    let mut tasks = TaskStore::new(ctx.api);
    tasks.load(args.section)?;
    let listed = tasks.view(&filter, sort, priorities.all());

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
    } else {
        let all_labels: Vec<_> = labels.labels().into_iter().cloned().collect();
        for task in listed {
            println!(
                "{}",
                format_task_line(task, &all_labels, priorities.all(), ctx.width())
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Checklists
// ---------------------------------------------------------------------------

fn cmd_checklists(ctx: &Ctx, action: ChecklistsAction) -> Result<(), Box<dyn Error>> {
    let mut store = ChecklistStore::new(ctx.api);
    match action {
        ChecklistsAction::List(args) => {
            store.load(args.task)?;
            let assembled: Vec<_> = store
                .for_task(args.task)
                .into_iter()
                .filter_map(|c| store.assembled(c.id))
                .collect();
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&assembled)?);
            } else {
                for checklist in &assembled {
                    print_lines(&format_checklist(checklist));
                }
            }
            Ok(())
        }
        ChecklistsAction::Add(args) => {
            store.load(args.task)?;
            let checklist = store.create(args.task, &args.title, position(args.at))?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&checklist)?);
            } else {
                println!("{}", checklist.id);
            }
            Ok(())
        }
        ChecklistsAction::Rm(args) => {
            store.load(args.task)?;
            let outcome = store.delete(args.checklist)?;
            report_outcome(ctx, &outcome)
        }
        ChecklistsAction::Reorder(args) => {
            store.load(args.scope)?;
            let outcome = store.reorder(args.scope, &args.ids)?;
            report_outcome(ctx, &outcome)
        }
        ChecklistsAction::Item(cmd) => cmd_checklist_items(ctx, store, cmd.action),
    }
}

fn cmd_checklist_items(
    ctx: &Ctx,
    mut store: ChecklistStore,
    action: ChecklistItemAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        ChecklistItemAction::Add(args) => {
            store.load(args.task)?;
            let item = store.add_item(args.checklist, &args.content, position(args.at))?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                println!("{}", item.id);
            }
            Ok(())
        }
        ChecklistItemAction::Toggle(args) => {
            store.load(args.task)?;
            let item = store.toggle_item(args.item)?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                let check = if item.completed { 'x' } else { ' ' };
                println!("[{}] {} {}", check, item.id, item.content);
            }
            Ok(())
        }
        ChecklistItemAction::Rm(args) => {
            store.load(args.task)?;
            let outcome = store.delete_item(args.item)?;
            report_outcome(ctx, &outcome)
        }
        ChecklistItemAction::Reorder(args) => {
            store.load(args.task)?;
            let outcome = store.reorder_items(args.checklist, &args.ids)?;
            report_outcome(ctx, &outcome)
        }
    }
}

// ---------------------------------------------------------------------------
// Labels and priorities
// ---------------------------------------------------------------------------

fn cmd_labels(ctx: &Ctx, action: LabelsAction) -> Result<(), Box<dyn Error>> {
    let mut labels = LabelStore::new(ctx.api);
    labels.load()?;
    match action {
        LabelsAction::List => {
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&labels.labels())?);
            } else {
                for label in labels.labels() {
                    println!("{}", format_label_line(label));
                }
            }
        }
        LabelsAction::Add(args) => {
            let label = labels.create(&args.name, args.color.as_deref())?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&label)?);
            } else {
                println!("{}", label.id);
            }
        }
        LabelsAction::Rm(args) => {
            let id = labels
                .find(&args.name)
                .map(|l| l.id)
                .ok_or_else(|| format!("label not found: {}", args.name))?;
            labels.delete(id)?;
        }
    }
    Ok(())
}

fn cmd_priorities(ctx: &Ctx, action: PrioritiesAction) -> Result<(), Box<dyn Error>> {
    let mut priorities = PriorityStore::new(ctx.api);
    priorities.load()?;
    match action {
        PrioritiesAction::List => {
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&priorities.by_level())?);
            } else {
                for priority in priorities.by_level() {
                    println!("{}", format_priority_line(priority));
                }
            }
        }
        PrioritiesAction::Add(args) => {
            let priority = priorities.create(&args.name, args.level, args.color.as_deref())?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&priority)?);
            } else {
                println!("{}", priority.id);
            }
        }
        PrioritiesAction::Rm(args) => {
            let id = priorities
                .find(&args.name)
                .map(|p| p.id)
                .ok_or_else(|| format!("priority not found: {}", args.name))?;
            priorities.delete(id)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recurring tasks
// ---------------------------------------------------------------------------

fn cmd_recurring(ctx: &Ctx, action: RecurringAction) -> Result<(), Box<dyn Error>> {
    let mut recurring = RecurringStore::new(ctx.api);
    recurring.load()?;
    match action {
        RecurringAction::List => {
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(recurring.all())?);
            } else {
                for task in recurring.all() {
                    println!("{}", format_recurring_line(task));
                }
            }
        }
        RecurringAction::Add(args) => {
            let mut form = RecurrenceForm::new(
                &args.title,
                args.section,
                parse_recurrence_type(&args.recurrence)?,
            );
            form.days = parse_days(&args.days)?;
            form.time = Some(args.time);
            let created = recurring.create(&form)?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                println!("{}", format_recurring_line(&created));
            }
        }
        RecurringAction::Rm(args) => {
            recurring.delete(args.id)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

fn cmd_notes(ctx: &Ctx, action: NotesAction) -> Result<(), Box<dyn Error>> {
    let mut notes = NoteStore::new(ctx.api);
    notes.load()?;
    match action {
        NotesAction::List => {
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&notes.notes())?);
            } else {
                for note in notes.notes() {
                    println!("{}", format_note_line(note, ctx.width()));
                }
            }
        }
        NotesAction::Add(args) => {
            let note = notes.create(&args.title, &args.content)?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&note)?);
            } else {
                println!("{}", note.id);
            }
        }
        NotesAction::Show(args) => {
            let note = notes
                .get(args.id)
                .ok_or_else(|| format!("note not found: {}", args.id))?;
            let links = notes
                .links(args.id)
                .ok_or_else(|| format!("note not found: {}", args.id))?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&note_detail_json(note, &links))?);
            } else {
                print_lines(&format_note_detail(note, &links));
            }
        }
        NotesAction::Edit(args) => {
            let note = notes.update(
                args.id,
                NotePatch {
                    title: args.title,
                    content: args.content,
                },
            )?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&note)?);
            }
        }
        NotesAction::Rm(args) => {
            notes.delete(args.id)?;
        }
        NotesAction::Search(args) => {
            let hits = notes.search(&args.text);
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                for note in hits {
                    println!("{}", format_note_line(note, ctx.width()));
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

fn cmd_media(ctx: &Ctx, action: MediaAction) -> Result<(), Box<dyn Error>> {
    let mut media = MediaStore::new(ctx.api, ctx.config.media.page_size);
    match action {
        MediaAction::List(args) => {
            let media_type = parse_media_type(&args.media_type)?;
            let sort = MediaSort::parse(&args.sort)
                .ok_or_else(|| format!("unknown sort '{}' (expected: title, rating, updated)", args.sort))?;
            let filter = MediaFilter {
                status: args.status.as_deref().map(parse_media_status).transpose()?,
                text: args.search,
                min_rating: args.min_rating,
            };
            media.load(media_type)?;
            let listed = media.view(media_type, &filter, sort);
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                for item in listed {
                    println!("{}", format_media_line(item, ctx.width()));
                }
            }
        }
        MediaAction::Add(args) => {
            let media_type = parse_media_type(&args.media_type)?;
            let status = match args.status.as_deref() {
                Some(s) => parse_media_status(s)?,
                None => MediaStatus::default(),
            };
            let item = media.create(
                media_type,
                NewMedia {
                    title: args.title,
                    creator: args.creator,
                    status,
                    rating: args.rating,
                    progress: args.progress,
                    notes: None,
                },
            )?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                println!("{}", item.id);
            }
        }
        MediaAction::Rm(args) => {
            media.delete(args.id)?;
        }
        MediaAction::Import(args) => {
            let media_type = parse_media_type(&args.media_type)?;
            let summary = media.import_file(media_type, &args.file)?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_lines(&format_import_summary(&summary));
            }
        }
        MediaAction::Export(args) => {
            let media_type = parse_media_type(&args.media_type)?;
            let bytes = media.export_file(media_type, &args.file)?;
            if !ctx.json {
                println!("wrote {} bytes to {}", bytes, args.file.display());
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Stats and check
// ---------------------------------------------------------------------------

fn cmd_stats(ctx: &Ctx, args: StatsArgs) -> Result<(), Box<dyn Error>> {
    let today = Utc::now().date_naive();
    let to = match args.to.as_deref() {
        Some(s) => parse_date(s)?,
        None => today,
    };
    let from = match args.from.as_deref() {
        Some(s) => parse_date(s)?,
        None => to.checked_sub_days(Days::new(30)).unwrap_or(to),
    };
    let bucket = Bucket::parse(&args.by)
        .ok_or_else(|| format!("unknown bucket '{}' (expected: day, week, month)", args.by))?;

    let mut stats = StatsStore::new(ctx.api);
    stats.load(from, to)?;
    let summary = stats.summary(today);
    let buckets = stats.buckets(bucket);

    if ctx.json {
        let out = StatsJson {
            from,
            to,
            summary,
            buckets,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_lines(&format_stats(&summary, &buckets, bucket));
    }
    Ok(())
}

fn cmd_check(ctx: &Ctx) -> Result<(), Box<dyn Error>> {
    let projects = load_projects(ctx)?;
    let sections = load_sections(ctx, &projects)?;
    let mut tasks = TaskStore::new(ctx.api);
    for section in sections.all() {
        tasks.load(section.id)?;
    }

    let mut result = CheckResult::new();
    result.check_collection("project", projects.all());
    result.check_collection("section", sections.all());
    result.check_collection("task", tasks.all());

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_lines(&format_check(&result));
    }
    if result.valid {
        Ok(())
    } else {
        Err(format!("{} ordering problems found", result.errors.len()).into())
    }
}
