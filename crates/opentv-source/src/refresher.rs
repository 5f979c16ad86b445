//! Coalescing guide refresher.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tracing::instrument;

use super::api::GuideSource;
use super::loader::{GuideLoader, LoadedGuide};

/// Outcome shared between every caller of one refresh.
type SharedOutcome = Result<Arc<LoadedGuide>, Arc<anyhow::Error>>;

/// Handle to the refresh currently in flight.
type InFlight = Shared<BoxFuture<'static, SharedOutcome>>;

/// Loader callback producing a fresh guide for a reference instant.
type LoadFn = dyn Fn(DateTime<Utc>) -> BoxFuture<'static, Result<LoadedGuide>> + Send + Sync;

/// Mutable refresher state.
#[derive(Default)]
struct RefreshState {
    /// Refresh currently in flight, if any.
    in_flight: Option<InFlight>,
    /// Last successfully loaded guide.
    latest: Option<Arc<LoadedGuide>>,
}

/// Runs guide refreshes one at a time.
///
/// A refresh requested while another is in flight joins it instead of
/// starting a new load; every waiter observes the same outcome. The load runs
/// on its own task, so it settles even when every waiter goes away. The handle
/// is cleared once the refresh settles, and a successful result replaces the
/// cached guide.
pub struct GuideRefresher {
    load: Arc<LoadFn>,
    state: Arc<Mutex<RefreshState>>,
}

impl std::fmt::Debug for GuideRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuideRefresher").finish_non_exhaustive()
    }
}

impl GuideRefresher {
    /// Creates a refresher around an arbitrary load function.
    pub fn new<L, Fut>(load: L) -> Self
    where
        L: Fn(DateTime<Utc>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<LoadedGuide>> + Send + 'static,
    {
        Self {
            load: Arc::new(move |at| load(at).boxed()),
            state: Arc::new(Mutex::new(RefreshState::default())),
        }
    }

    /// Creates a refresher backed by a [`GuideLoader`].
    pub fn from_loader<P, F>(loader: GuideLoader<P, F>) -> Self
    where
        P: GuideSource + Send + Sync + 'static,
        F: GuideSource + Send + Sync + 'static,
    {
        let loader = Arc::new(loader);
        Self::new(move |at| {
            let loader = Arc::clone(&loader);
            async move { loader.load(at).await }
        })
    }

    /// Refreshes the guide, anchoring templates at `reference`.
    ///
    /// Joins the in-flight refresh if there is one; in that case the guide
    /// is anchored at the instant of the call that started it. Must be called
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the refresh error if loading failed.
    #[instrument(skip_all)]
    pub async fn refresh(&self, reference: DateTime<Utc>) -> Result<Arc<LoadedGuide>> {
        let pending = {
            let mut state = self.state.lock().await;
            if let Some(pending) = &state.in_flight {
                tracing::debug!("Joining in-flight guide refresh");
                pending.clone()
            } else {
                tracing::debug!(%reference, "Starting guide refresh");
                let pending = self.start(reference);
                state.in_flight = Some(pending.clone());
                tokio::spawn(pending.clone());
                pending
            }
        };

        pending.await.map_err(|err| anyhow!("{err:#}"))
    }

    /// Builds the shared load future. It settles its own state: the handle
    /// is cleared and `latest` updated before any waiter sees the outcome.
    fn start(&self, reference: DateTime<Utc>) -> InFlight {
        let load = (self.load)(reference);
        let state = Arc::clone(&self.state);
        async move {
            let outcome: SharedOutcome = load.await.map(Arc::new).map_err(Arc::new);
            let mut state = state.lock().await;
            state.in_flight = None;
            match &outcome {
                Ok(guide) => state.latest = Some(Arc::clone(guide)),
                Err(err) => tracing::debug!(error = %err, "Guide refresh failed"),
            }
            outcome
        }
        .boxed()
        .shared()
    }

    /// The last successfully loaded guide, if any.
    pub async fn latest(&self) -> Option<Arc<LoadedGuide>> {
        self.state.lock().await.latest.clone()
    }

    /// Returns `true` while a refresh is in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.state.lock().await.in_flight.is_some()
    }
}
