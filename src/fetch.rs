//! Async fetch lifecycle
//!
//! [`FetchController`] wraps a zero-argument async operation and publishes
//! `{data, loading, error}` through a `watch` channel. Each `run()` and each
//! `reset()` takes a new epoch; a run only applies its outcome if no newer
//! epoch was taken while it was in flight, so a late, stale resolution can
//! never overwrite a reset or a newer run.

use crate::error::SearchError;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// The wrapped operation. Called synchronously at the start of each run, so
/// anything it captures is read at that moment.
pub type Operation<T> = Arc<dyn Fn() -> BoxFuture<Result<T, SearchError>> + Send + Sync>;

/// Observable state of a fetch.
///
/// `revision` counts successful publications over the controller's lifetime
/// and is left untouched by `reset()`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<SearchError>,
    pub revision: u64,
}

impl<T> FetchState<T> {
    pub fn not_started() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            revision: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.data.is_none() && !self.loading && self.error.is_none()
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::not_started()
    }
}

/// What became of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// The result was published.
    Applied(Result<T, SearchError>),
    /// A reset or newer run superseded this one; nothing was published.
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Start one run as soon as the controller is built. Requires a Tokio
    /// runtime.
    pub auto_run: bool,
}

struct Shared<T> {
    op: Operation<T>,
    state: watch::Sender<FetchState<T>>,
    /// Only modified inside `state`'s write lock.
    epoch: AtomicU64,
}

/// Runs an operation and owns its `FetchState`.
pub struct FetchController<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for FetchController<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> FetchController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(op: F, options: FetchOptions) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SearchError>> + Send + 'static,
    {
        let op: Operation<T> = Arc::new(move || Box::pin(op()) as BoxFuture<_>);
        let (state, _) = watch::channel(FetchState::not_started());
        let controller = Self {
            shared: Arc::new(Shared {
                op,
                state,
                epoch: AtomicU64::new(0),
            }),
        };

        if options.auto_run {
            log::debug!("Auto-running fetch on construction");
            tokio::spawn(controller.run());
        }

        controller
    }

    /// Start a run.
    ///
    /// The loading flag is raised and the operation is invoked before this
    /// returns; the returned future only waits for the result and publishes
    /// it. Previous data is kept while loading, the previous error is cleared.
    /// On failure previous data is kept as well.
    pub fn run(&self) -> impl Future<Output = FetchOutcome<T>> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        let mut ticket = 0;
        shared.state.send_modify(|state| {
            ticket = shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
            state.error = None;
        });
        let pending = (shared.op)();

        async move {
            let result = pending.await;
            let mut applied = false;
            shared.state.send_if_modified(|state| {
                if shared.epoch.load(Ordering::SeqCst) != ticket {
                    return false;
                }
                match &result {
                    Ok(data) => {
                        state.data = Some(data.clone());
                        state.error = None;
                        state.revision += 1;
                    }
                    Err(err) => {
                        state.error = Some(err.clone());
                    }
                }
                state.loading = false;
                applied = true;
                true
            });

            if applied {
                FetchOutcome::Applied(result)
            } else {
                log::debug!("Discarding stale fetch resolution (epoch {})", ticket);
                FetchOutcome::Stale
            }
        }
    }

    /// Return to not-started. Any run still in flight becomes stale.
    pub fn reset(&self) {
        let shared = &self.shared;
        shared.state.send_if_modified(|state| {
            shared.epoch.fetch_add(1, Ordering::SeqCst);
            let changed = !state.is_idle();
            state.data = None;
            state.loading = false;
            state.error = None;
            changed
        });
    }

    /// Make any run in flight stale without clearing published data.
    ///
    /// Used when the input that run was started for is no longer current but
    /// a replacement run has not started yet.
    pub fn abandon(&self) {
        let shared = &self.shared;
        shared.state.send_if_modified(|state| {
            shared.epoch.fetch_add(1, Ordering::SeqCst);
            let was_loading = state.loading;
            state.loading = false;
            was_loading
        });
    }

    pub fn snapshot(&self) -> FetchState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.shared.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn counting_op(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> BoxFuture<Result<Vec<u32>, SearchError>> + Send + Sync + 'static {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) as u32 + 1;
            let fut: BoxFuture<Result<Vec<u32>, SearchError>> = Box::pin(async move { Ok(vec![n]) });
            fut
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_not_started() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = FetchController::new(counting_op(calls.clone()), FetchOptions::default());
        assert!(fetch.snapshot().is_idle());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_sets_loading_synchronously_then_publishes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = FetchController::new(counting_op(calls.clone()), FetchOptions::default());

        let pending = fetch.run();
        assert!(fetch.is_loading());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(pending.await, FetchOutcome::Applied(Ok(vec![1])));
        let state = fetch.snapshot();
        assert_eq!(state.data, Some(vec![1]));
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.revision, 1);
    }

    #[tokio::test]
    async fn test_each_run_replaces_previous_outcome() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = FetchController::new(counting_op(calls), FetchOptions::default());

        fetch.run().await;
        fetch.run().await;
        assert_eq!(fetch.snapshot().data, Some(vec![2]));
        assert_eq!(fetch.snapshot().revision, 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_data() {
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = fail.clone();
        let fetch = FetchController::new(
            move || {
                let fail = flag.load(Ordering::SeqCst);
                async move {
                    if fail {
                        Err(SearchError::Api {
                            status: 500,
                            message: "Internal Server Error".to_string(),
                        })
                    } else {
                        Ok(vec![7u32])
                    }
                }
            },
            FetchOptions::default(),
        );

        fetch.run().await;
        fail.store(true, Ordering::SeqCst);
        let outcome = fetch.run().await;

        assert!(matches!(outcome, FetchOutcome::Applied(Err(SearchError::Api { status: 500, .. }))));
        let state = fetch.snapshot();
        assert_eq!(state.data, Some(vec![7]));
        assert!(!state.loading);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = FetchController::new(counting_op(calls), FetchOptions::default());
        fetch.run().await;

        fetch.reset();
        let once = fetch.snapshot();
        fetch.reset();
        let twice = fetch.snapshot();

        assert!(once.is_idle());
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_stale_resolution_after_reset_is_discarded() {
        let (release, gate) = oneshot::channel::<()>();
        let gate = std::sync::Mutex::new(Some(gate));
        let fetch = FetchController::new(
            move || {
                let gate = gate.lock().unwrap().take();
                async move {
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                    Ok(vec![42u32])
                }
            },
            FetchOptions::default(),
        );

        let pending = tokio::spawn(fetch.run());
        fetch.reset();
        release.send(()).unwrap();

        assert_eq!(pending.await.unwrap(), FetchOutcome::Stale);
        assert!(fetch.snapshot().is_idle());
    }

    #[tokio::test]
    async fn test_abandon_keeps_data_and_discards_in_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = FetchController::new(counting_op(calls), FetchOptions::default());
        fetch.run().await;

        let pending = fetch.run();
        fetch.abandon();
        assert!(!fetch.is_loading());
        assert_eq!(pending.await, FetchOutcome::Stale);
        assert_eq!(fetch.snapshot().data, Some(vec![1]));
    }

    #[tokio::test]
    async fn test_auto_run_starts_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = FetchController::new(
            counting_op(calls.clone()),
            FetchOptions { auto_run: true },
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut rx = fetch.subscribe();
        rx.wait_for(|s| !s.loading).await.unwrap();
        assert_eq!(fetch.snapshot().data, Some(vec![1]));
    }
}
