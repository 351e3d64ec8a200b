//! Published state of dispatcher handles

use tokio::sync::watch;

use crate::client::{FetchPolicy, GraphqlClient};
use crate::util::errors::AppError;

use super::CrudError;

/// Why a read did or did not execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionGate {
    #[default]
    Ready,
    /// The caller asked to skip (`QueryOptions::skip`)
    SkippedByCaller,
    /// Auth is required and no token is stored
    SkippedUnauthenticated,
    /// A required argument (such as the record id) is absent
    SkippedMissingParams,
}

impl ExecutionGate {
    pub fn is_ready(&self) -> bool {
        matches!(self, ExecutionGate::Ready)
    }

    pub fn is_skipped(&self) -> bool {
        !self.is_ready()
    }
}

/// Options shared by every read handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub skip: bool,
    pub require_auth: bool,
    pub fetch_policy: FetchPolicy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            skip: false,
            require_auth: true,
            fetch_policy: FetchPolicy::CacheAndNetwork,
        }
    }
}

impl QueryOptions {
    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Evaluate the gate against the client's current token.
    pub fn gate(&self, client: &GraphqlClient) -> ExecutionGate {
        if self.skip {
            ExecutionGate::SkippedByCaller
        } else if self.require_auth && !client.is_authenticated() {
            ExecutionGate::SkippedUnauthenticated
        } else {
            ExecutionGate::Ready
        }
    }
}

/// Snapshot of a read handle. `data` may hold stale results while `loading`.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<AppError>,
    pub gate: ExecutionGate,
}

impl<T> Default for OperationState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            gate: ExecutionGate::Ready,
        }
    }
}

impl<T> OperationState<T> {
    pub fn skipped(gate: ExecutionGate) -> Self {
        Self {
            gate,
            ..Default::default()
        }
    }
}

/// Lifecycle of a mutation handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of a mutation handle.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationState<T> {
    pub status: MutationStatus,
    pub data: Option<T>,
    pub error: Option<CrudError>,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self {
            status: MutationStatus::Idle,
            data: None,
            error: None,
        }
    }
}

impl<T> MutationState<T> {
    pub fn loading(&self) -> bool {
        self.status == MutationStatus::Loading
    }
}

/// Undoes a published loading flag if the future that set it is dropped
/// before it finishes. Call [`LoadingGuard::disarm`] once the final state
/// has been published.
pub(crate) struct LoadingGuard<'a, S> {
    state: &'a watch::Sender<S>,
    settle: fn(&mut S),
    armed: bool,
}

impl<'a, S> LoadingGuard<'a, S> {
    pub(crate) fn new(state: &'a watch::Sender<S>, settle: fn(&mut S)) -> Self {
        Self {
            state,
            settle,
            armed: true,
        }
    }

    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl<S> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(self.settle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = QueryOptions::default();
        assert!(options.require_auth);
        assert!(!options.skip);
        assert_eq!(options.fetch_policy, FetchPolicy::CacheAndNetwork);

        let state: OperationState<i64> = OperationState::skipped(ExecutionGate::SkippedMissingParams);
        assert!(!state.loading);
        assert!(state.data.is_none());
        assert!(state.gate.is_skipped());

        let mutation: MutationState<i64> = MutationState::default();
        assert_eq!(mutation.status, MutationStatus::Idle);
        assert!(!mutation.loading());
    }

    #[test]
    fn test_loading_guard_settles_only_when_armed() {
        let (state, _) = watch::channel(OperationState::<i64> {
            loading: true,
            ..Default::default()
        });
        drop(LoadingGuard::new(&state, |s| s.loading = false));
        assert!(!state.borrow().loading);

        state.send_modify(|s| s.loading = true);
        LoadingGuard::new(&state, |s| s.loading = false).disarm();
        assert!(state.borrow().loading);
    }
}
