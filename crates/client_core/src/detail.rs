//! Detail controller: one user's profile and repositories, fetched together
//! and published as a single outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::try_join;
use shared::{
    domain::RepoQuery,
    protocol::{RepositorySummary, UserProfile},
};
use tokio::{runtime::Handle, sync::watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::gateway::{GatewayResult, UserGateway};

pub const DETAIL_LOAD_FAILED: &str = "Failed to load user data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading,
    Ready {
        profile: UserProfile,
        repos: Vec<RepositorySummary>,
    },
    Failed(String),
}

impl DetailState {
    pub fn is_loading(&self) -> bool {
        matches!(self, DetailState::Loading)
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            DetailState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Default)]
struct DetailInner {
    generation: u64,
    subject: Option<String>,
}

pub struct DetailController {
    gateway: Arc<dyn UserGateway>,
    runtime: Handle,
    repo_query: RepoQuery,
    inner: Mutex<DetailInner>,
    state: watch::Sender<DetailState>,
}

impl DetailController {
    pub fn new(gateway: Arc<dyn UserGateway>, runtime: Handle, repo_query: RepoQuery) -> Arc<Self> {
        let (state, _) = watch::channel(DetailState::Loading);
        Arc::new(Self {
            gateway,
            runtime,
            repo_query,
            inner: Mutex::new(DetailInner::default()),
            state,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    pub fn state_stream(&self) -> WatchStream<DetailState> {
        WatchStream::new(self.state.subscribe())
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    /// Subject of the most recent `load` call.
    pub fn subject(&self) -> Option<String> {
        self.lock().subject.clone()
    }

    /// Publishes `Loading` immediately, then fetches profile and
    /// repositories concurrently. Only the latest call may publish.
    pub fn load(self: &Arc<Self>, subject: impl Into<String>) {
        let subject = subject.into();
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.subject = Some(subject.clone());
            self.state.send_replace(DetailState::Loading);
            inner.generation
        };

        info!(subject = %subject, generation, "detail: loading profile and repositories");
        let controller = Arc::clone(self);
        self.runtime.spawn(async move {
            let outcome = fetch_profile_and_repos(
                controller.gateway.as_ref(),
                &subject,
                &controller.repo_query,
            )
            .await;
            controller.publish(generation, &subject, outcome);
        });
    }

    fn lock(&self) -> MutexGuard<'_, DetailInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(
        &self,
        generation: u64,
        subject: &str,
        outcome: GatewayResult<(UserProfile, Vec<RepositorySummary>)>,
    ) {
        let inner = self.lock();
        if inner.generation != generation {
            debug!(
                subject,
                generation,
                current = inner.generation,
                "detail: discarding superseded load"
            );
            return;
        }

        let next = match outcome {
            Ok((profile, repos)) => {
                info!(subject, repos = repos.len(), "detail: loaded");
                DetailState::Ready { profile, repos }
            }
            Err(err) => {
                let reason = err.reason_or(DETAIL_LOAD_FAILED);
                warn!(subject, "detail: load failed: {reason}");
                DetailState::Failed(reason)
            }
        };
        self.state.send_replace(next);
    }
}

/// Both fetches run concurrently. The first failure observed resolves the
/// join; the sibling fetch is dropped and its outcome never read.
async fn fetch_profile_and_repos(
    gateway: &dyn UserGateway,
    subject: &str,
    repo_query: &RepoQuery,
) -> GatewayResult<(UserProfile, Vec<RepositorySummary>)> {
    try_join(
        gateway.fetch_user(subject),
        gateway.fetch_user_repos(subject, repo_query),
    )
    .await
}

#[cfg(test)]
#[path = "tests/detail_tests.rs"]
mod tests;
