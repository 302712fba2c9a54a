//! Timeline refresh service.
//!
//! Owns the catalog client and the shared [`TimelineStore`]. A refresh builds
//! a complete timeline off to the side and installs it in one step; samples
//! keep resolving against the previous snapshot while a build is running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::retry::{with_retry, RetryPolicy};
use crate::catalog::CatalogClient;
use crate::error::{ErrorCode, RelayError, RelayResult};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::timeline::{build_timeline, Timeline, TimelineStore};

/// Counts from a completed refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub albums: usize,
    pub photos: usize,
    pub warnings: usize,
}

/// Rebuilds the timeline from the catalog.
pub struct TimelineService {
    catalog: Arc<dyn CatalogClient>,
    store: Arc<TimelineStore>,
    album_count: u32,
    photo_count: u32,
    refreshing: AtomicBool,
}

/// Clears the in-flight flag when a refresh ends, however it ends.
struct RefreshSlot<'a>(&'a AtomicBool);

impl Drop for RefreshSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TimelineService {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        store: Arc<TimelineStore>,
        album_count: u32,
        photo_count: u32,
    ) -> Self {
        Self {
            catalog,
            store,
            album_count,
            photo_count,
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<TimelineStore> {
        &self.store
    }

    /// Current timeline snapshot.
    pub fn snapshot(&self) -> Arc<Timeline> {
        self.store.snapshot()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    fn claim(&self) -> RelayResult<RefreshSlot<'_>> {
        self.refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| RefreshSlot(&self.refreshing))
            .map_err(|_| RelayError::RefreshInProgress)
    }

    /// Builds and installs a new timeline.
    ///
    /// On a catalog failure the previous timeline stays installed.
    pub async fn refresh(&self) -> RelayResult<RefreshSummary> {
        let slot = self.claim()?;
        self.refresh_claimed(slot).await
    }

    async fn refresh_claimed(&self, _slot: RefreshSlot<'_>) -> RelayResult<RefreshSummary> {
        log::info!("[Timeline] Refreshing from catalog");
        let build = match build_timeline(&*self.catalog, self.album_count, self.photo_count).await {
            Ok(build) => build,
            Err(e) => {
                log::error!(
                    "[Timeline] Refresh failed ({}), keeping previous timeline: {}",
                    e.code(),
                    e
                );
                return Err(e.into());
            }
        };

        let summary = RefreshSummary {
            albums: build.timeline.len(),
            photos: build.timeline.photo_count(),
            warnings: build.warnings.len(),
        };
        self.store.install(build.timeline);
        log::info!(
            "[Timeline] Installed timeline with {} album(s), {} photo(s)",
            summary.albums,
            summary.photos
        );
        Ok(summary)
    }

    /// Starts a refresh in the background.
    ///
    /// Fails immediately with [`RelayError::RefreshInProgress`] if one is
    /// already running.
    pub fn spawn_refresh(self: &Arc<Self>, spawner: &TokioSpawner) -> RelayResult<()> {
        if self.is_refreshing() {
            return Err(RelayError::RefreshInProgress);
        }
        let service = Arc::clone(self);
        spawner.spawn(async move {
            match service.refresh().await {
                Ok(_) => {}
                Err(RelayError::RefreshInProgress) => {
                    log::debug!("[Timeline] Refresh already running, skipped");
                }
                // Already logged by refresh_claimed
                Err(_) => {}
            }
        });
        Ok(())
    }

    /// Refreshes, retrying catalog failures per `policy`.
    ///
    /// Stops early if another refresh is already running.
    pub async fn refresh_with_retry(&self, policy: RetryPolicy) -> RelayResult<RefreshSummary> {
        with_retry("timeline refresh", policy, move || self.refresh()).await
    }

    /// Runs the startup build in the background, retrying while the catalog
    /// is unreachable.
    pub fn spawn_initial_refresh(self: &Arc<Self>, spawner: &TokioSpawner, policy: RetryPolicy) {
        let service = Arc::clone(self);
        spawner.spawn(async move {
            match service.refresh_with_retry(policy).await {
                Ok(_) => {}
                Err(RelayError::RefreshInProgress) => {
                    log::debug!("[Timeline] Startup build deferred to the running refresh");
                }
                Err(e) => {
                    log::error!(
                        "[Timeline] Startup build gave up after {} retries: {}",
                        policy.retries,
                        e
                    );
                }
            }
        });
    }

    /// Refreshes every `period` until `cancel` fires. The first refresh
    /// happens one period after the call.
    pub async fn run_periodic(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        log::info!("[Timeline] Periodic refresh every {}s", period.as_secs());
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(RelayError::RefreshInProgress) = self.refresh().await {
                        log::debug!("[Timeline] Periodic refresh skipped, one is already running");
                    }
                }
            }
        }
        log::info!("[Timeline] Periodic refresh stopped");
    }
}
