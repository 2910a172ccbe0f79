//! Store-level ordering behavior against the in-process API, plus a few
//! commands driven end to end through `handlers::run`.

use std::fs;

use clap::Parser;
use plank::api::{Api, MemoryApi};
use plank::cli::commands::Cli;
use plank::cli::handlers;
use plank::model::{ClientConfig, Id, NewProject, NewSection, NewTask, Position, Task};
use plank::ops::reorder::ReorderOutcome;
use plank::store::{ChecklistStore, SectionStore, TaskStore};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn board(api: &MemoryApi, sections: usize) -> Vec<Id> {
    let project = api
        .create_project(&NewProject {
            name: "Board".into(),
            ..Default::default()
        })
        .unwrap();
    (0..sections)
        .map(|i| {
            api.create_section(&NewSection {
                project_id: project.id,
                name: format!("Column {}", i),
                order_index: i as i64,
            })
            .unwrap()
            .id
        })
        .collect()
}

fn add_tasks(store: &mut TaskStore, section_id: Id, titles: &[&str]) -> Vec<Id> {
    titles
        .iter()
        .map(|title| {
            store
                .create(
                    NewTask {
                        section_id,
                        title: title.to_string(),
                        ..Default::default()
                    },
                    Position::End,
                )
                .unwrap()
                .id
        })
        .collect()
}

/// (id, order_index) pairs of a section, in board order
fn layout(tasks: &[&Task]) -> Vec<(Id, i64)> {
    tasks.iter().map(|t| (t.id, t.order_index)).collect()
}

fn run(api: &MemoryApi, args: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::try_parse_from(args)?;
    handlers::run(cli.command, api, &ClientConfig::default(), cli.json)
}

proptest! {
    #[test]
    fn settled_order_matches_submission(
        order in (1usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
    ) {
        let api = MemoryApi::new();
        let section = board(&api, 1)[0];
        let mut store = TaskStore::new(&api);
        let titles: Vec<String> = (0..order.len()).map(|i| format!("t{}", i)).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let ids = add_tasks(&mut store, section, &refs);
        let ordering: Vec<Id> = order.iter().map(|&i| ids[i]).collect();

        let outcome = store.reorder(section, &ordering).unwrap();
        prop_assert_eq!(outcome, ReorderOutcome::Settled);
        for (position, id) in ordering.iter().enumerate() {
            prop_assert_eq!(store.get(*id).unwrap().order_index, position as i64);
        }
        let mut indices: Vec<i64> = store.in_section(section).iter().map(|t| t.order_index).collect();
        indices.sort();
        prop_assert_eq!(indices, (0..ordering.len() as i64).collect::<Vec<_>>());

        let once = layout(&store.in_section(section));
        store.reorder(section, &ordering).unwrap();
        prop_assert_eq!(layout(&store.in_section(section)), once.clone());

        let server: Vec<(Id, i64)> = api.tasks_in(section).iter().map(|t| (t.id, t.order_index)).collect();
        prop_assert_eq!(server, once);
    }
}

#[test]
fn test_rollback_takes_server_state() {
    let api = MemoryApi::new();
    let section = board(&api, 1)[0];
    let mut store = TaskStore::new(&api);
    let ids = add_tasks(&mut store, section, &["A", "B", "C"]);

    // someone else adds a task the local cache has not seen
    let other = api
        .create_task(&NewTask {
            section_id: section,
            title: "D".into(),
            order_index: 3,
            ..Default::default()
        })
        .unwrap();

    api.fail("reorder_tasks");
    let outcome = store.reorder(section, &[ids[2], ids[0], ids[1]]).unwrap();
    assert!(matches!(outcome, ReorderOutcome::RolledBack { reload_error: None, .. }));
    assert!(store.error().is_some());

    let server: Vec<(Id, i64)> = api.tasks_in(section).iter().map(|t| (t.id, t.order_index)).collect();
    assert_eq!(layout(&store.in_section(section)), server);
    assert!(store.get(other.id).is_some());
    assert_eq!(store.get(ids[2]).unwrap().order_index, 2);
}

#[test]
fn test_failed_persist_reloads_scope_exactly_once() {
    let api = MemoryApi::new();
    let section = board(&api, 1)[0];
    let mut store = TaskStore::new(&api);
    let ids = add_tasks(&mut store, section, &["A", "B", "C"]);
    api.fail("reorder_tasks");
    api.clear_calls();

    store.reorder(section, &[ids[1], ids[0], ids[2]]).unwrap();
    assert!(store.error().is_some());
    assert_eq!(api.count("list_tasks", Some(section)), 1);
    assert_eq!(api.count_op("list_tasks"), 1);
}

#[test]
fn test_empty_reorders_make_no_calls() {
    let api = MemoryApi::new();
    let sections = board(&api, 2);
    api.clear_calls();

    let mut tasks = TaskStore::new(&api);
    let mut section_store = SectionStore::new(&api);
    let mut checklists = ChecklistStore::new(&api);
    assert_eq!(tasks.reorder(sections[0], &[]).unwrap(), ReorderOutcome::Skipped);
    assert_eq!(section_store.reorder(1, &[]).unwrap(), ReorderOutcome::Skipped);
    assert_eq!(checklists.reorder(99, &[]).unwrap(), ReorderOutcome::Skipped);
    assert!(api.calls().is_empty());
}

#[test]
fn test_cross_section_drag_through_cli() {
    let api = MemoryApi::new();
    let sections = board(&api, 2);
    let mut store = TaskStore::new(&api);
    let first = add_tasks(&mut store, sections[0], &["A", "B"]);
    let second = add_tasks(&mut store, sections[1], &["C"]);

    let task = first[0].to_string();
    let target = sections[1].to_string();
    run(&api, &["pk", "tasks", "mv", &task, &target, "--at", "0"]).unwrap();

    let s2: Vec<(Id, i64)> = api.tasks_in(sections[1]).iter().map(|t| (t.id, t.order_index)).collect();
    assert_eq!(s2, vec![(first[0], 0), (second[0], 1)]);
    let s1: Vec<(Id, i64)> = api.tasks_in(sections[0]).iter().map(|t| (t.id, t.order_index)).collect();
    assert_eq!(s1, vec![(first[1], 0)]);
    assert!(run(&api, &["pk", "check"]).is_ok());
}

#[test]
fn test_project_insert_and_move_through_cli() {
    let api = MemoryApi::new();
    run(&api, &["pk", "projects", "add", "Work"]).unwrap();
    run(&api, &["pk", "projects", "add", "Home"]).unwrap();
    run(&api, &["pk", "projects", "add", "Inbox", "--at", "0"]).unwrap();

    let names: Vec<String> = api.projects_in(None).into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Inbox", "Work", "Home"]);

    let roots = api.projects_in(None);
    let (inbox, work) = (roots[0].id.to_string(), roots[1].id.to_string());
    run(&api, &["pk", "projects", "mv", &inbox, "--parent", &work]).unwrap();

    let names: Vec<String> = api.projects_in(None).into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Work", "Home"]);
    let indices: Vec<i64> = api.projects_in(None).iter().map(|p| p.order_index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(api.projects_in(Some(roots[1].id)).len(), 1);
    assert!(run(&api, &["pk", "check"]).is_ok());
}

#[test]
fn test_rolled_back_reorder_fails_the_command() {
    let api = MemoryApi::new();
    let section = board(&api, 1)[0];
    let mut store = TaskStore::new(&api);
    let ids = add_tasks(&mut store, section, &["A", "B"]);
    api.fail("reorder_tasks");

    let scope = section.to_string();
    let (a, b) = (ids[0].to_string(), ids[1].to_string());
    let err = run(&api, &["pk", "tasks", "reorder", &scope, &b, &a]).unwrap_err();
    assert!(err.to_string().contains("rolled back"));
    assert_eq!(api.tasks_in(section)[0].id, ids[0]);
}

#[test]
fn test_media_import_through_cli() {
    let api = MemoryApi::new();
    for title in ["Book 2", "Book 5", "Book 9"] {
        run(&api, &["pk", "media", "add", "book", title]).unwrap();
    }
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("books.csv");
    let mut csv = String::from("title\n");
    for i in 1..=10 {
        csv.push_str(&format!("Book {}\n", i));
    }
    fs::write(&path, csv).unwrap();

    let file = path.to_string_lossy().into_owned();
    run(&api, &["pk", "media", "import", "books", &file]).unwrap();
    assert_eq!(api.media_count(), 10);
}
