use std::collections::HashSet;

use crate::model::ordered::{Id, Ordered, Position, ReorderEntry};

/// Error type for reorder computations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderError {
    #[error("duplicate id in ordering: {0}")]
    DuplicateId(Id),
    #[error("unknown id in ordering: {0}")]
    UnknownId(Id),
    #[error("ordering for scope {scope} is missing id {id}")]
    MissingId { scope: String, id: Id },
    #[error("invalid reorder transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ReorderPhase,
        to: ReorderPhase,
    },
}

/// Lifecycle of one reorder operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderPhase {
    #[default]
    Idle,
    OptimisticallyApplied,
    Persisting,
    Settled,
    RolledBack,
}

impl ReorderPhase {
    pub fn can_transition(self, to: ReorderPhase) -> bool {
        use ReorderPhase::*;
        matches!(
            (self, to),
            (Idle, OptimisticallyApplied)
                | (OptimisticallyApplied, Persisting)
                | (Persisting, Settled)
                | (Persisting, RolledBack)
                | (Settled, Idle)
                | (RolledBack, Idle)
        )
    }
}

/// Tracks the phase of a single reorder and rejects illegal jumps.
#[derive(Debug, Default)]
pub struct ReorderOp {
    phase: ReorderPhase,
}

impl ReorderOp {
    pub fn new() -> Self {
        ReorderOp::default()
    }

    pub fn phase(&self) -> ReorderPhase {
        self.phase
    }

    pub fn advance(&mut self, to: ReorderPhase) -> Result<(), ReorderError> {
        if !self.phase.can_transition(to) {
            return Err(ReorderError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::trace!(from = ?self.phase, to = ?to, "reorder phase");
        self.phase = to;
        Ok(())
    }
}

/// How a reorder ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Empty ordering, nothing was sent
    Skipped,
    /// Applied locally and waiting for a debounced flush
    Queued,
    /// The server accepted the new order
    Settled,
    /// The server rejected the order; the affected scopes were reloaded.
    RolledBack {
        error: String,
        /// Set when the reload itself failed and the cache may still be stale
        reload_error: Option<String>,
    },
}

impl ReorderOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, ReorderOutcome::Settled | ReorderOutcome::Skipped)
    }
}

/// Result of applying an ordering to a cached collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<S> {
    /// Triples to persist: the target scope first, then compacted sources
    pub entries: Vec<ReorderEntry<S>>,
    /// Items pulled in from another scope, with the scope they left
    pub added: Vec<(Id, S)>,
    /// Target scope followed by every source scope touched
    pub affected_scopes: Vec<S>,
}

/// Check an ordering against the cache without touching it.
///
/// The ordering may contain items from other scopes (cross-scope move), but
/// every item currently in `scope` must be present.
pub fn validate<T: Ordered>(
    items: &[T],
    scope: T::Scope,
    ordered_ids: &[Id],
) -> Result<(), ReorderError> {
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for &id in ordered_ids {
        if !seen.insert(id) {
            return Err(ReorderError::DuplicateId(id));
        }
        if !items.iter().any(|item| item.id() == id) {
            return Err(ReorderError::UnknownId(id));
        }
    }
    if let Some(missing) = items
        .iter()
        .find(|item| item.scope() == scope && !seen.contains(&item.id()))
    {
        return Err(ReorderError::MissingId {
            scope: format!("{:?}", scope),
            id: missing.id(),
        });
    }
    Ok(())
}

/// Apply `ordered_ids` to the cache: position i gets `order_index = i`, items
/// from another scope are stamped with `scope`, and the scopes they left are
/// compacted back to `0..n`.
pub fn apply_order<T: Ordered>(
    items: &mut [T],
    scope: T::Scope,
    ordered_ids: &[Id],
) -> Result<Applied<T::Scope>, ReorderError> {
    validate(items, scope, ordered_ids)?;

    let added = detect_added(items, scope, ordered_ids);
    let mut entries = Vec::with_capacity(ordered_ids.len());
    for (index, &id) in ordered_ids.iter().enumerate() {
        if let Some(item) = items.iter_mut().find(|item| item.id() == id) {
            item.set_scope(scope);
            item.set_order_index(index as i64);
            entries.push(ReorderEntry::of::<T>(id, scope, index as i64));
        }
    }

    let mut affected_scopes = vec![scope];
    for &(_, source) in &added {
        if !affected_scopes.contains(&source) {
            affected_scopes.push(source);
            entries.extend(compact(items, source));
        }
    }

    Ok(Applied {
        entries,
        added,
        affected_scopes,
    })
}

/// Items named in `ordered_ids` that currently belong to a different scope.
pub fn detect_added<T: Ordered>(
    items: &[T],
    scope: T::Scope,
    ordered_ids: &[Id],
) -> Vec<(Id, T::Scope)> {
    ordered_ids
        .iter()
        .filter_map(|&id| items.iter().find(|item| item.id() == id))
        .filter(|item| item.scope() != scope)
        .map(|item| (item.id(), item.scope()))
        .collect()
}

/// Re-index the items of one scope to `0..n`, keeping their relative order.
pub fn compact<T: Ordered>(items: &mut [T], scope: T::Scope) -> Vec<ReorderEntry<T::Scope>> {
    let ids = ids_in_scope(items, scope);
    let mut entries = Vec::with_capacity(ids.len());
    for (index, id) in ids.into_iter().enumerate() {
        if let Some(item) = items.iter_mut().find(|item| item.id() == id) {
            item.set_order_index(index as i64);
        }
        entries.push(ReorderEntry::of::<T>(id, scope, index as i64));
    }
    entries
}

/// Ids in `scope`, sorted by their current `order_index` (ties broken by id).
pub fn ids_in_scope<T: Ordered>(items: &[T], scope: T::Scope) -> Vec<Id> {
    let mut members: Vec<(i64, Id)> = items
        .iter()
        .filter(|item| item.scope() == scope)
        .map(|item| (item.order_index(), item.id()))
        .collect();
    members.sort();
    members.into_iter().map(|(_, id)| id).collect()
}

/// The ordering of `target` after moving `id` into it at `position`.
/// `id` is removed from wherever it sits in the current target ordering first.
pub fn ordering_with<T: Ordered>(
    items: &[T],
    target: T::Scope,
    id: Id,
    position: Position,
) -> Vec<Id> {
    let mut ids: Vec<Id> = ids_in_scope(items, target)
        .into_iter()
        .filter(|&other| other != id)
        .collect();
    insert_at(&mut ids, id, position);
    ids
}

/// Insert into an ordering, clamping out-of-range positions to the end.
pub fn insert_at(ids: &mut Vec<Id>, id: Id, position: Position) {
    match position {
        Position::End => ids.push(id),
        Position::At(index) => ids.insert(index.min(ids.len()), id),
    }
}

/// `order_index` for a new item at `position` in a scope of `len` items.
pub fn index_for(position: Position, len: usize) -> i64 {
    match position {
        Position::End => len as i64,
        Position::At(index) => index.min(len) as i64,
    }
}
