use juba::clock::{Clock, SystemClock};
use juba::config::{MarketplaceConfig, RateLimitConfig};
use juba::jobs::{Collaborators, JobLifecycleService, MemoryStore};
use juba::notifications::NotificationCenter;
use juba::rate_limit::{browse_limiter, BrowseLimiter};
use juba::ratings::RatingService;
use juba::reports::ReportService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every marketplace service sharing one in-memory store and one
/// notification center.
#[derive(Clone)]
pub(crate) struct Marketplace {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) notifications: Arc<NotificationCenter>,
    pub(crate) jobs: Arc<JobLifecycleService>,
    pub(crate) ratings: Arc<RatingService>,
    pub(crate) reports: Arc<ReportService>,
    pub(crate) limiter: Arc<BrowseLimiter>,
}

impl Marketplace {
    pub(crate) fn in_memory(rate_limit: &RateLimitConfig, config: &MarketplaceConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(MemoryStore::new());
        let notifications = Arc::new(NotificationCenter::new(clock.clone()));
        let collaborators =
            Collaborators::in_memory(store.clone(), notifications.clone()).with_clock(clock);

        let ratings = Arc::new(RatingService::new(&collaborators));
        let reports = Arc::new(ReportService::new(&collaborators));
        let jobs = Arc::new(JobLifecycleService::new(
            collaborators,
            config.policy,
            config.dispatch,
        ));

        Self {
            store,
            notifications,
            jobs,
            ratings,
            reports,
            limiter: browse_limiter(rate_limit),
        }
    }
}
