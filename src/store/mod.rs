//! Cached resource stores.
//!
//! Each store owns the cached collection of one resource, talks to the
//! server through a borrowed `&dyn Api` and records the message of its last
//! failed action in `error`. Mutating methods take `&mut self`, so at most
//! one reorder per store is ever in flight.

pub mod checklist;
pub mod label;
pub mod media;
pub mod note;
pub mod priority;
pub mod project;
pub mod recurring;
pub mod section;
pub mod stats;
pub mod task;

use std::collections::HashSet;

use crate::api::{ApiError, ApiResult};
use crate::model::{Id, Ordered, Position, ReorderEntry};
use crate::ops::reorder::{
    self, ReorderError, ReorderOp, ReorderOutcome, ReorderPhase, ids_in_scope, ordering_with,
};

pub use checklist::ChecklistStore;
pub use label::LabelStore;
pub use media::MediaStore;
pub use note::{NoteLinks, NoteStore};
pub use priority::PriorityStore;
pub use project::ProjectStore;
pub use recurring::{RecurrenceForm, RecurringStore};
pub use section::SectionStore;
pub use stats::StatsStore;
pub use task::TaskStore;

/// Error type for store actions
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("unknown {resource} {id}")]
    UnknownId { resource: &'static str, id: Id },
    #[error(transparent)]
    Reorder(#[from] ReorderError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record `err` in a store's error slot and hand it back for `?`.
pub(crate) fn record(slot: &mut Option<String>, err: impl Into<StoreError>) -> StoreError {
    let err = err.into();
    tracing::warn!(error = %err, "store action failed");
    *slot = Some(err.to_string());
    err
}

pub(crate) fn require_text(value: &str, what: &str) -> StoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{} is required", what)));
    }
    Ok(value.to_string())
}

/// Swap the cached members of `scope` for a fresh server copy. Cached items
/// that now appear in `fresh` under another scope are dropped as well.
pub(crate) fn replace_scope<T: Ordered>(items: &mut Vec<T>, scope: T::Scope, fresh: Vec<T>) {
    let ids: HashSet<Id> = fresh.iter().map(|item| item.id()).collect();
    items.retain(|item| item.scope() != scope && !ids.contains(&item.id()));
    items.extend(fresh);
}

/// Run the optimistic reorder protocol over a cached collection.
///
/// The ordering is validated and applied to `items` first. The resulting
/// triples go out in one `persist` call; on failure every affected scope is
/// reloaded once through `reload`.
pub(crate) fn reorder_cached<T, P, L>(
    items: &mut Vec<T>,
    scope: T::Scope,
    ordered_ids: &[Id],
    error: &mut Option<String>,
    persist: P,
    reload: L,
) -> StoreResult<ReorderOutcome>
where
    T: Ordered,
    P: FnOnce(&[ReorderEntry<T::Scope>]) -> ApiResult<()>,
    L: FnMut(T::Scope) -> ApiResult<Vec<T>>,
{
    if ordered_ids.is_empty() {
        tracing::debug!(scope = ?scope, "empty ordering, nothing to persist");
        return Ok(ReorderOutcome::Skipped);
    }

    let mut op = ReorderOp::new();
    let applied =
        reorder::apply_order(items, scope, ordered_ids).map_err(|e| record(error, e))?;
    if !applied.added.is_empty() {
        tracing::debug!(scope = ?scope, added = ?applied.added, "items moved in from another scope");
    }
    op.advance(ReorderPhase::OptimisticallyApplied)?;
    persist_entries(
        items,
        &applied.entries,
        &applied.affected_scopes,
        &applied.added,
        error,
        op,
        persist,
        reload,
    )
}

/// Re-index `scope` after a removal and persist the compacted order.
pub(crate) fn compact_cached<T, P, L>(
    items: &mut Vec<T>,
    scope: T::Scope,
    error: &mut Option<String>,
    persist: P,
    reload: L,
) -> StoreResult<ReorderOutcome>
where
    T: Ordered,
    P: FnOnce(&[ReorderEntry<T::Scope>]) -> ApiResult<()>,
    L: FnMut(T::Scope) -> ApiResult<Vec<T>>,
{
    let entries = reorder::compact(items, scope);
    if entries.is_empty() {
        return Ok(ReorderOutcome::Skipped);
    }
    let mut op = ReorderOp::new();
    op.advance(ReorderPhase::OptimisticallyApplied)?;
    persist_entries(items, &entries, &[scope], &[], error, op, persist, reload)
}

/// Add a freshly created item to the cache. When it was created before the
/// end of its scope the later siblings are shifted and the order persisted.
pub(crate) fn place_created<T, P, L>(
    items: &mut Vec<T>,
    created: T,
    position: Position,
    error: &mut Option<String>,
    persist: P,
    reload: L,
) -> StoreResult<ReorderOutcome>
where
    T: Ordered,
    P: FnOnce(&[ReorderEntry<T::Scope>]) -> ApiResult<()>,
    L: FnMut(T::Scope) -> ApiResult<Vec<T>>,
{
    let (id, scope) = (created.id(), created.scope());
    let siblings = ids_in_scope(items, scope).len();
    items.push(created);
    match position {
        Position::At(index) if index < siblings => {
            let ordering = ordering_with(items, scope, id, position);
            reorder_cached(items, scope, &ordering, error, persist, reload)
        }
        _ => Ok(ReorderOutcome::Skipped),
    }
}

/// `scopes` lists the target first, then the sources that `moved` items
/// came from. On rollback sources are reloaded before the target, and an
/// item whose source could not be reloaded is put back at the end of it.
#[allow(clippy::too_many_arguments)]
fn persist_entries<T, P, L>(
    items: &mut Vec<T>,
    entries: &[ReorderEntry<T::Scope>],
    scopes: &[T::Scope],
    moved: &[(Id, T::Scope)],
    error: &mut Option<String>,
    mut op: ReorderOp,
    persist: P,
    mut reload: L,
) -> StoreResult<ReorderOutcome>
where
    T: Ordered,
    P: FnOnce(&[ReorderEntry<T::Scope>]) -> ApiResult<()>,
    L: FnMut(T::Scope) -> ApiResult<Vec<T>>,
{
    op.advance(ReorderPhase::Persisting)?;
    tracing::debug!(entries = entries.len(), "persisting order");
    match persist(entries) {
        Ok(()) => {
            op.advance(ReorderPhase::Settled)?;
            Ok(ReorderOutcome::Settled)
        }
        Err(err) => {
            tracing::warn!(error = %err, scopes = ?scopes, "reorder rejected, reloading");
            *error = Some(err.to_string());
            op.advance(ReorderPhase::RolledBack)?;
            let mut reload_error = None;
            let mut failed = Vec::new();
            for &scope in scopes.iter().skip(1).chain(scopes.first()) {
                match reload(scope) {
                    Ok(fresh) => {
                        let stranded = strand_moved(items, scope, &fresh, moved, &failed);
                        replace_scope(items, scope, fresh);
                        for (mut item, source) in stranded {
                            item.set_order_index(ids_in_scope(items, source).len() as i64);
                            item.set_scope(source);
                            items.push(item);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, scope = ?scope, "reload after rollback failed");
                        reload_error = Some(e.to_string());
                        failed.push(scope);
                    }
                }
            }
            op.advance(ReorderPhase::Idle)?;
            Ok(ReorderOutcome::RolledBack {
                error: err.to_string(),
                reload_error,
            })
        }
    }
}

/// Moved items cached under `scope` that `fresh` does not contain and whose
/// source scope failed to reload, paired with that source.
fn strand_moved<T: Ordered>(
    items: &mut Vec<T>,
    scope: T::Scope,
    fresh: &[T],
    moved: &[(Id, T::Scope)],
    failed: &[T::Scope],
) -> Vec<(T, T::Scope)> {
    let mut stranded = Vec::new();
    for &(id, source) in moved {
        if !failed.contains(&source) || fresh.iter().any(|f| f.id() == id) {
            continue;
        }
        if let Some(at) = items
            .iter()
            .position(|item| item.id() == id && item.scope() == scope)
        {
            stranded.push((items.remove(at), source));
        }
    }
    stranded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    fn section(id: Id, project_id: Id, order_index: i64) -> Section {
        Section {
            id,
            project_id,
            name: format!("s{}", id),
            order_index,
        }
    }

    #[test]
    fn test_replace_scope_keeps_other_scopes() {
        let mut items = vec![section(1, 1, 0), section(2, 1, 1), section(3, 2, 0)];
        replace_scope(&mut items, 1, vec![section(2, 1, 0)]);
        let ids: Vec<Id> = items.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_empty_ordering_never_persists() {
        let mut items = vec![section(1, 1, 0)];
        let mut error = None;
        let outcome = reorder_cached(
            &mut items,
            7,
            &[],
            &mut error,
            |_| panic!("persist must not be called"),
            |_| panic!("reload must not be called"),
        )
        .unwrap();
        assert_eq!(outcome, ReorderOutcome::Skipped);
    }

    #[test]
    fn test_validation_error_is_recorded() {
        let mut items = vec![section(1, 1, 0), section(2, 1, 1)];
        let mut error = None;
        let result = reorder_cached(
            &mut items,
            1,
            &[2],
            &mut error,
            |_| Ok(()),
            |_| Ok(Vec::new()),
        );
        assert!(matches!(result, Err(StoreError::Reorder(_))));
        assert!(error.is_some());
        assert_eq!(items[0].order_index, 0);
    }

    #[test]
    fn test_rollback_reloads_each_scope_once() {
        let mut items = vec![section(1, 1, 0), section(2, 1, 1), section(3, 2, 0)];
        let mut error = None;
        let mut reloaded = Vec::new();
        let outcome = reorder_cached(
            &mut items,
            2,
            &[1, 3],
            &mut error,
            |_| {
                Err(ApiError::Status {
                    status: 500,
                    body: String::new(),
                })
            },
            |scope| {
                reloaded.push(scope);
                Ok(match scope {
                    1 => vec![section(1, 1, 0), section(2, 1, 1)],
                    _ => vec![section(3, 2, 0)],
                })
            },
        )
        .unwrap();
        assert!(matches!(outcome, ReorderOutcome::RolledBack { reload_error: None, .. }));
        assert_eq!(reloaded, vec![1, 2]);
        assert!(error.is_some());
        let first = items.iter().find(|s| s.id == 1).unwrap();
        assert_eq!(first.project_id, 1);
    }

    #[test]
    fn test_moved_item_returns_to_source_when_its_reload_fails() {
        let mut items = vec![section(1, 1, 0), section(2, 1, 1), section(3, 2, 0)];
        let mut error = None;
        let outcome = reorder_cached(
            &mut items,
            2,
            &[1, 3],
            &mut error,
            |_| {
                Err(ApiError::Status {
                    status: 500,
                    body: String::new(),
                })
            },
            |scope| match scope {
                1 => Err(ApiError::Status {
                    status: 503,
                    body: String::new(),
                }),
                _ => Ok(vec![section(3, 2, 0)]),
            },
        )
        .unwrap();
        assert!(matches!(
            outcome,
            ReorderOutcome::RolledBack {
                reload_error: Some(_),
                ..
            }
        ));
        let mut layout: Vec<(Id, Id, i64)> = items
            .iter()
            .map(|s| (s.id, s.project_id, s.order_index))
            .collect();
        layout.sort();
        assert_eq!(layout, vec![(1, 1, 1), (2, 1, 0), (3, 2, 0)]);
    }
}
