//! Debounced incremental search
//!
//! [`DebouncedSearchController`] turns raw query edits into at most one
//! catalog fetch per settled input:
//!
//! ```text
//! Idle ──edit──▶ Pending ──quiescence──▶ Fetching ──▶ Succeeded | Empty | Failed
//!   ▲               │  ▲                                   │
//!   └──blank edit───┘  └────────────────edit───────────────┘
//! ```
//!
//! Every edit cancels the pending timer before doing anything else. A blank
//! edit resets the fetch state on the spot; a non-blank edit arms a fresh
//! timer. Results of a fetch whose query is no longer current are dropped by
//! the [`FetchController`] epoch check.
//!
//! A successful non-empty fetch is reported to [`SearchAnalytics`] from the
//! post-fetch path and, under [`AnalyticsTrigger::AtLeastOnce`], again by an
//! observer of published results. Store failures are logged and never reach
//! the fetch state.

use crate::analytics::SearchAnalytics;
use crate::config::{AnalyticsTrigger, SearchSettings};
use crate::fetch::{FetchController, FetchOptions, FetchOutcome, FetchState};
use crate::search::debouncer::SearchDebouncer;
use crate::search::view::SearchView;
use crate::services::QueryClient;
use crate::types::{MovieRecord, SearchResults};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub type MovieFetchState = FetchState<SearchResults>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Query is blank.
    Idle,
    /// Timer armed, no fetch yet.
    Pending,
    Fetching,
    /// Fetch returned at least one movie.
    Succeeded,
    /// Fetch returned no movies.
    Empty,
    Failed,
}

struct Control {
    debouncer: SearchDebouncer,
    phase: SearchPhase,
    /// Bumped by every transition that makes an earlier fetch irrelevant.
    generation: u64,
    shut_down: bool,
}

struct Inner {
    fetch: FetchController<SearchResults>,
    analytics: Arc<dyn SearchAnalytics>,
    query: watch::Sender<String>,
    control: Mutex<Control>,
}

/// One search screen's worth of state. Create it when the screen appears,
/// drop it (or call [`shutdown`](Self::shutdown)) when it goes away.
pub struct DebouncedSearchController {
    inner: Arc<Inner>,
    observer: Option<JoinHandle<()>>,
}

impl DebouncedSearchController {
    /// Must be called from within a Tokio runtime.
    pub fn new(
        client: Arc<dyn QueryClient>,
        analytics: Arc<dyn SearchAnalytics>,
        settings: SearchSettings,
    ) -> Self {
        let (query, op_query) = watch::channel(String::new());

        let fetch = FetchController::new(
            move || {
                let query = op_query.borrow().clone();
                let client = Arc::clone(&client);
                async move {
                    let movies = client.fetch_movies(&query, None).await;
                    movies.map(|movies| SearchResults::new(query, movies))
                }
            },
            FetchOptions { auto_run: false },
        );

        let observer = match settings.analytics_trigger {
            AnalyticsTrigger::AtLeastOnce => Some(spawn_result_observer(
                fetch.subscribe(),
                Arc::clone(&analytics),
            )),
            AnalyticsTrigger::ExactlyOnce => None,
        };

        let control = Control {
            debouncer: SearchDebouncer::with_delay(settings.debounce_delay()),
            phase: SearchPhase::Idle,
            generation: 0,
            shut_down: false,
        };

        Self {
            inner: Arc::new(Inner {
                fetch,
                analytics,
                query,
                control: Mutex::new(control),
            }),
            observer,
        }
    }

    /// Replace the query text. Unchanged text is ignored.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        let inner = &self.inner;
        let mut control = inner.lock_control();
        if control.shut_down || *inner.query.borrow() == text {
            return;
        }

        control.debouncer.cancel();
        control.generation += 1;
        inner.query.send_replace(text.clone());

        if text.trim().is_empty() {
            inner.fetch.reset();
            control.phase = SearchPhase::Idle;
            log::debug!("Query cleared, search reset");
            return;
        }

        inner.fetch.abandon();
        let (ticket, token, delay) = control.debouncer.arm(text);
        control.phase = SearchPhase::Pending;
        drop(control);

        let timer_inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    timer_inner.on_timer_elapsed(ticket).await;
                }
            }
        });
    }

    /// Fetch the current query right away, skipping the quiescence window.
    ///
    /// Returns `false` when the query is blank or the controller is shut down.
    pub fn retry(&self) -> bool {
        let inner = &self.inner;
        let (query, generation, pending) = {
            let mut control = inner.lock_control();
            let query = inner.query.borrow().clone();
            if control.shut_down || query.trim().is_empty() {
                return false;
            }
            control.debouncer.cancel();
            control.generation += 1;
            control.phase = SearchPhase::Fetching;
            (query, control.generation, inner.fetch.run())
        };

        log::debug!("Manual retry for '{}'", query);
        tokio::spawn(Arc::clone(inner).settle(query, generation, pending));
        true
    }

    /// Cancel the pending timer and stop reporting. Idempotent.
    pub fn shutdown(&mut self) {
        {
            let mut control = self.inner.lock_control();
            if control.shut_down {
                return;
            }
            control.shut_down = true;
            control.debouncer.cancel();
            control.generation += 1;
        }
        self.inner.fetch.abandon();
        if let Some(observer) = self.observer.take() {
            observer.abort();
        }
        log::debug!("Search controller shut down");
    }

    pub fn query(&self) -> String {
        self.inner.query.borrow().clone()
    }

    pub fn phase(&self) -> SearchPhase {
        self.inner.lock_control().phase
    }

    pub fn snapshot(&self) -> MovieFetchState {
        self.inner.fetch.snapshot()
    }

    pub fn view(&self) -> SearchView {
        SearchView::from_state(&self.query(), &self.snapshot())
    }

    /// Notified on every published change to `{data, loading, error}`.
    pub fn subscribe(&self) -> watch::Receiver<MovieFetchState> {
        self.inner.fetch.subscribe()
    }

    pub fn subscribe_query(&self) -> watch::Receiver<String> {
        self.inner.query.subscribe()
    }
}

impl Drop for DebouncedSearchController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn on_timer_elapsed(self: Arc<Self>, ticket: u64) {
        let (query, generation, pending) = {
            let mut control = self.lock_control();
            let Some(query) = control.debouncer.take_ready(ticket) else {
                return;
            };
            control.phase = SearchPhase::Fetching;
            (query, control.generation, self.fetch.run())
        };

        log::debug!("Quiescence elapsed, fetching '{}'", query);
        self.settle(query, generation, pending).await;
    }

    async fn settle(
        self: Arc<Self>,
        query: String,
        generation: u64,
        pending: impl Future<Output = FetchOutcome<SearchResults>>,
    ) {
        let result = match pending.await {
            FetchOutcome::Applied(result) => result,
            FetchOutcome::Stale => {
                log::debug!("Dropped stale results for '{}'", query);
                return;
            }
        };

        let phase = match &result {
            Ok(results) if results.movies.is_empty() => SearchPhase::Empty,
            Ok(_) => SearchPhase::Succeeded,
            Err(_) => SearchPhase::Failed,
        };
        {
            let mut control = self.lock_control();
            if control.generation == generation {
                control.phase = phase;
            }
        }

        match result {
            Ok(results) => {
                log::info!("Search '{}' returned {} movies", query, results.movies.len());
                if let Some(first) = results.movies.into_iter().next() {
                    dispatch_hit(&self.analytics, query, first, "post-fetch");
                }
            }
            Err(err) if err.is_transient() => {
                log::warn!("Search '{}' failed, retry may succeed: {}", query, err);
            }
            Err(err) => {
                log::error!("Search '{}' failed: {}", query, err);
            }
        }
    }
}

/// Report a hit without waiting for the store.
fn dispatch_hit(
    analytics: &Arc<dyn SearchAnalytics>,
    query: String,
    representative: MovieRecord,
    path: &'static str,
) {
    let analytics = Arc::clone(analytics);
    tokio::spawn(async move {
        if let Err(err) = analytics.record_hit(&query, &representative).await {
            log::warn!(
                "Failed to record search hit for '{}' ({} path): {}",
                query,
                path,
                err
            );
        }
    });
}

/// Report every newly published non-empty result set under the query it was
/// fetched for.
fn spawn_result_observer(
    mut results: watch::Receiver<MovieFetchState>,
    analytics: Arc<dyn SearchAnalytics>,
) -> JoinHandle<()> {
    let mut last_revision = results.borrow().revision;
    tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let hit = {
                let state = results.borrow_and_update();
                if state.revision == last_revision {
                    continue;
                }
                last_revision = state.revision;
                state.data.as_ref().and_then(|published| {
                    published
                        .first()
                        .map(|first| (published.query.clone(), first.clone()))
                })
            };

            if let Some((query, first)) = hit {
                dispatch_hit(&analytics, query, first, "observer");
            }
        }
    })
}
