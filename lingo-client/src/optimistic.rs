//! Optimistic mutation reconciler.
//!
//! A field moves `Idle -> Pending(optimistic) -> Committed(server) |
//! RolledBack(original)`. Starting a new mutation on a field that is
//! already pending supersedes the older one: its server call still runs,
//! but its result is ignored when it lands.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use crate::api::{ApiError, ApiResult};

/// Where a field is in its mutation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

/// Handed out when a mutation starts; settles exactly that mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a pending mutation must be settled"]
pub struct MutationTicket {
    generation: u64,
}

/// How a settled mutation ended
#[derive(Debug)]
pub enum Reconciled<T> {
    /// Server accepted; holds the value now in local state
    Committed(T),
    /// Server refused; holds the restored value and the failure
    RolledBack { restored: T, error: ApiError },
    /// A newer mutation owns the field; this result was ignored
    Superseded,
}

impl<T> Reconciled<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Reconciled::Committed(_))
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Reconciled::RolledBack { .. })
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Reconciled::RolledBack { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// A locally editable value that remembers the last server-confirmed value
#[derive(Debug, Clone)]
pub struct Optimistic<T> {
    value: T,
    confirmed: T,
    generation: u64,
    pending: Option<u64>,
    state: MutationState,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(value: T) -> Self {
        Self {
            confirmed: value.clone(),
            value,
            generation: 0,
            pending: None,
            state: MutationState::Idle,
        }
    }

    /// Current local value, optimistic or not
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Last value the server agreed to
    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Replaces the value with fresh server data. Ignored while a mutation
    /// is pending so a background refetch cannot undo the user's edit.
    pub fn refresh(&mut self, server_value: T) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.confirmed = server_value.clone();
        self.value = server_value;
        self.state = MutationState::Idle;
        true
    }

    /// Applies `optimistic` locally and starts a mutation
    pub fn apply(&mut self, optimistic: T) -> MutationTicket {
        self.generation += 1;
        if self.pending.is_some() {
            log::debug!(target: "mutations", "superseding pending mutation");
        }
        self.pending = Some(self.generation);
        self.value = optimistic;
        self.state = MutationState::Pending;
        MutationTicket {
            generation: self.generation,
        }
    }

    fn owns(&self, ticket: MutationTicket) -> bool {
        self.pending == Some(ticket.generation)
    }

    /// Success. `server_value` replaces the optimistic value when the
    /// server returned a canonical form of it.
    pub fn commit(&mut self, ticket: MutationTicket, server_value: Option<T>) -> Reconciled<T> {
        if !self.owns(ticket) {
            return Reconciled::Superseded;
        }
        if let Some(value) = server_value {
            self.value = value;
        }
        self.confirmed = self.value.clone();
        self.pending = None;
        self.state = MutationState::Committed;
        Reconciled::Committed(self.value.clone())
    }

    /// Failure: restores the last confirmed value
    pub fn rollback(&mut self, ticket: MutationTicket, error: ApiError) -> Reconciled<T> {
        if !self.owns(ticket) {
            log::debug!(target: "mutations", "ignoring failure of superseded mutation: {}", error);
            return Reconciled::Superseded;
        }
        log::warn!(target: "mutations", "rolling back: {}", error);
        self.value = self.confirmed.clone();
        self.pending = None;
        self.state = MutationState::RolledBack;
        Reconciled::RolledBack {
            restored: self.value.clone(),
            error,
        }
    }

    pub fn settle(&mut self, ticket: MutationTicket, result: ApiResult<Option<T>>) -> Reconciled<T> {
        match result {
            Ok(server_value) => self.commit(ticket, server_value),
            Err(error) => self.rollback(ticket, error),
        }
    }
}

impl<T: Clone + Default> Default for Optimistic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Applies `optimistic`, runs `commit_fn`, and reconciles with its result.
///
/// `commit_fn` receives the optimistic value and returns the server's
/// canonical value, or `None` to keep the optimistic one.
pub async fn with_optimistic_update<T, F, Fut>(
    cell: &mut Optimistic<T>,
    optimistic: T,
    commit_fn: F,
) -> Reconciled<T>
where
    T: Clone,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = ApiResult<Option<T>>>,
{
    let ticket = cell.apply(optimistic.clone());
    let result = commit_fn(optimistic).await;
    cell.settle(ticket, result)
}

/// One [`Optimistic`] cell per key, created on first touch
#[derive(Debug, Clone)]
pub struct OptimisticMap<K, T> {
    cells: HashMap<K, Optimistic<T>>,
}

impl<K, T> Default for OptimisticMap<K, T> {
    fn default() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, T: Clone> OptimisticMap<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a mutation on `key`, seeding the cell with `current` if the
    /// key has no mutation history.
    pub fn apply(&mut self, key: K, current: T, optimistic: T) -> MutationTicket {
        self.cells
            .entry(key)
            .or_insert_with(|| Optimistic::new(current))
            .apply(optimistic)
    }

    pub fn settle(&mut self, key: &K, ticket: MutationTicket, result: ApiResult<Option<T>>) -> Reconciled<T> {
        match self.cells.get_mut(key) {
            Some(cell) => cell.settle(ticket, result),
            None => Reconciled::Superseded,
        }
    }

    pub fn get(&self, key: &K) -> Option<&T> {
        self.cells.get(key).map(Optimistic::get)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.cells.get(key).is_some_and(Optimistic::is_pending)
    }

    /// Forgets settled cells so fresh server data seeds the next mutation
    pub fn clear_settled(&mut self) {
        self.cells.retain(|_, cell| cell.is_pending());
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
