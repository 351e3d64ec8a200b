//! Async actions with `{ data, error, loading }` state
//!
//! Errors are state here, not control flow: [`AsyncAction::execute`] never
//! returns the error, it stores a formatted message instead.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::dispatcher::state::LoadingGuard;
use crate::util::errors::format_error;

type ActionFn<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Snapshot of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionState<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub loading: bool,
}

impl<T> Default for ActionState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

/// Callbacks and the fallback message of an action.
pub struct AsyncActionOptions<T> {
    pub on_success: Option<Arc<dyn Fn(&T) + Send + Sync>>,
    pub on_error: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    /// Replaces the underlying error text in state when set.
    pub error_message: Option<String>,
}

impl<T> Default for AsyncActionOptions<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            error_message: None,
        }
    }
}

impl<T> AsyncActionOptions<T> {
    pub fn on_success(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// An async function wrapped with observable state.
pub struct AsyncAction<A, T> {
    action: ActionFn<A, T>,
    options: AsyncActionOptions<T>,
    state: watch::Sender<ActionState<T>>,
}

impl<A, T> fmt::Debug for AsyncAction<A, T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAction")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl<A, T> AsyncAction<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut, E>(action: F, options: AsyncActionOptions<T>) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let action: ActionFn<A, T> = Arc::new(move |args| {
            let fut = action(args);
            async move { fut.await.map_err(|e| format_error(&e)) }.boxed()
        });
        let (state, _) = watch::channel(ActionState::default());
        Self {
            action,
            options,
            state,
        }
    }

    pub fn state(&self) -> ActionState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionState<T>> {
        self.state.subscribe()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state.borrow().data.clone()
    }

    /// Run the action. On failure the message lands in state and `None` is
    /// returned. `loading` is false again whichever way it ends, including
    /// when this future is dropped before completion.
    pub async fn execute(&self, args: A) -> Option<T> {
        self.state.send_modify(|s| {
            s.error = None;
            s.loading = true;
        });
        let guard = LoadingGuard::new(&self.state, |s| s.loading = false);
        let result = (self.action)(args).await;
        guard.disarm();

        match result {
            Ok(data) => {
                self.state.send_modify(|s| {
                    s.data = Some(data.clone());
                    s.loading = false;
                });
                if let Some(callback) = &self.options.on_success {
                    callback(&data);
                }
                Some(data)
            }
            Err(message) => {
                warn!(error = %message, "Async action failed");
                let message = self.options.error_message.clone().unwrap_or(message);
                self.state.send_modify(|s| {
                    s.error = Some(message.clone());
                    s.loading = false;
                });
                if let Some(callback) = &self.options.on_error {
                    callback(&message);
                }
                None
            }
        }
    }

    pub fn reset(&self) {
        self.state.send_replace(ActionState::default());
    }
}

/// A fixed set of named actions sharing argument and result types.
///
/// The key set is decided at construction and cannot change afterwards.
pub struct AsyncActions<A, T> {
    actions: BTreeMap<String, AsyncAction<A, T>>,
}

impl<A, T> AsyncActions<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<I, K>(actions: I) -> Self
    where
        I: IntoIterator<Item = (K, AsyncAction<A, T>)>,
        K: Into<String>,
    {
        let actions: BTreeMap<_, _> = actions.into_iter().map(|(k, v)| (k.into(), v)).collect();
        debug!(count = actions.len(), "Async action set created");
        Self { actions }
    }

    pub fn get(&self, name: &str) -> Option<&AsyncAction<A, T>> {
        self.actions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn is_any_loading(&self) -> bool {
        self.actions.values().any(AsyncAction::loading)
    }

    pub fn has_any_error(&self) -> bool {
        self.actions.values().any(|action| action.error().is_some())
    }

    pub fn reset_all(&self) {
        for action in self.actions.values() {
            action.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::util::errors::AppError;

    fn doubler() -> AsyncAction<i32, i32> {
        AsyncAction::new(
            |n: i32| async move {
                if n < 0 {
                    Err(AppError::validation("negative input"))
                } else {
                    Ok(n * 2)
                }
            },
            AsyncActionOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_execute_stores_data() {
        let action = doubler();
        assert_eq!(action.execute(21).await, Some(42));
        let state = action.state();
        assert_eq!(state.data, Some(42));
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_error_becomes_state() {
        let action = doubler();
        assert_eq!(action.execute(-1).await, None);
        assert_eq!(action.error().as_deref(), Some("negative input"));
        assert!(!action.loading());

        // next run clears the previous error
        action.execute(1).await;
        assert!(action.error().is_none());
    }

    #[tokio::test]
    async fn test_callbacks_and_custom_message() {
        let failures = Arc::new(AtomicUsize::new(0));
        let seen = failures.clone();
        let action: AsyncAction<(), i32> = AsyncAction::new(
            |_| async { Err::<i32, _>("socket closed") },
            AsyncActionOptions::default()
                .error_message("Could not save")
                .on_error(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
        );
        action.execute(()).await;
        assert_eq!(action.error().as_deref(), Some("Could not save"));
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_execute_clears_loading() {
        let action: AsyncAction<(), i32> = AsyncAction::new(
            |_| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, AppError>(1)
            },
            AsyncActionOptions::default(),
        );

        let outcome = tokio::time::timeout(Duration::from_secs(1), action.execute(())).await;
        assert!(outcome.is_err());
        assert!(!action.loading());
        assert!(action.data().is_none());
    }

    #[tokio::test]
    async fn test_action_set() {
        let actions = AsyncActions::new([("save", doubler()), ("publish", doubler())]);
        assert_eq!(actions.names().collect::<Vec<_>>(), vec!["publish", "save"]);

        actions.get("save").unwrap().execute(-5).await;
        assert!(actions.has_any_error());
        assert!(!actions.is_any_loading());

        actions.reset_all();
        assert!(!actions.has_any_error());
        assert!(actions.get("missing").is_none());
    }
}
