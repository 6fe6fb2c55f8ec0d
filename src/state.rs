use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::ListingCache;
use crate::notify::Templates;
use crate::rate_limit::{RateLimitProfiles, RateLimiter};
use crate::store::Store;
use crate::worker::Notifier;

pub type SharedState = Arc<AppState>;

// app's shared state
pub struct AppState {
    pub store: Store,
    pub rate_limiter: Arc<RateLimiter>,
    pub cache: ListingCache,     // public listing searches
    pub notifier: Notifier,      // queue to the mail worker
    pub templates: Templates,
    pub session_ttl: chrono::Duration,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        profiles: RateLimitProfiles,
        cache_ttl: Duration,
        session_ttl: chrono::Duration,
        templates: Templates,
        notifier: Notifier,
    ) -> Self {
        Self {
            store: Store::new(),
            rate_limiter: Arc::new(RateLimiter::new(profiles)),
            cache: ListingCache::new(cache_ttl),
            notifier,
            templates,
            session_ttl,
            started_at: Instant::now(),
        }
    }
}
