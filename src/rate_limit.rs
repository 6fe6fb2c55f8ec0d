//! Fixed-window request counting keyed by identifier.
//!
//! Each key owns one window. The first request opens it, later requests
//! increment the count until `max_requests` is reached, and everything
//! after that is rejected until the window has fully elapsed.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

// Rate limit entry - tracks requests per IP/key
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
    pub window: Duration,
}

/// Limit applied to a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Route families that share a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitProfile {
    /// Login and registration.
    Auth,
    /// General API traffic.
    Api,
    /// Inquiry and newsletter forms.
    Contact,
    /// Password changes and account deletion.
    Sensitive,
}

impl RateLimitProfile {
    pub const ALL: [RateLimitProfile; 4] = [
        RateLimitProfile::Auth,
        RateLimitProfile::Api,
        RateLimitProfile::Contact,
        RateLimitProfile::Sensitive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitProfile::Auth => "auth",
            RateLimitProfile::Api => "api",
            RateLimitProfile::Contact => "contact",
            RateLimitProfile::Sensitive => "sensitive",
        }
    }

    pub fn default_config(&self) -> RateLimitConfig {
        match self {
            RateLimitProfile::Auth => RateLimitConfig::new(5, 15 * MINUTE), // 5 per 15 minutes
            RateLimitProfile::Api => RateLimitConfig::new(100, MINUTE),      // 100 per minute
            RateLimitProfile::Contact => RateLimitConfig::new(5, HOUR),      // 5 per hour
            RateLimitProfile::Sensitive => RateLimitConfig::new(3, HOUR),    // 3 per hour
        }
    }
}

impl fmt::Display for RateLimitProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective limit for every profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitProfiles {
    auth: RateLimitConfig,
    api: RateLimitConfig,
    contact: RateLimitConfig,
    sensitive: RateLimitConfig,
}

impl Default for RateLimitProfiles {
    fn default() -> Self {
        Self {
            auth: RateLimitProfile::Auth.default_config(),
            api: RateLimitProfile::Api.default_config(),
            contact: RateLimitProfile::Contact.default_config(),
            sensitive: RateLimitProfile::Sensitive.default_config(),
        }
    }
}

impl RateLimitProfiles {
    pub fn get(&self, profile: RateLimitProfile) -> RateLimitConfig {
        match profile {
            RateLimitProfile::Auth => self.auth,
            RateLimitProfile::Api => self.api,
            RateLimitProfile::Contact => self.contact,
            RateLimitProfile::Sensitive => self.sensitive,
        }
    }

    /// Override the request budget of one profile, keeping its window.
    pub fn with_max_requests(mut self, profile: RateLimitProfile, max_requests: u32) -> Self {
        let slot = match profile {
            RateLimitProfile::Auth => &mut self.auth,
            RateLimitProfile::Api => &mut self.api,
            RateLimitProfile::Contact => &mut self.contact,
            RateLimitProfile::Sensitive => &mut self.sensitive,
        };
        slot.max_requests = max_requests;
        self
    }

    fn longest_window(&self) -> Duration {
        RateLimitProfile::ALL
            .iter()
            .map(|p| self.get(*p).window)
            .max()
            .unwrap_or(MINUTE)
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time left until the current window closes.
    pub reset_after: Duration,
}

impl RateLimitResult {
    /// Whole seconds a rejected client should wait, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        let secs = if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        secs.max(1)
    }

    /// Window reset as a Unix timestamp in seconds.
    pub fn reset_unix(&self) -> i64 {
        chrono::Utc::now().timestamp() + self.retry_after_secs() as i64
    }
}

pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    profiles: RateLimitProfiles,
}

impl RateLimiter {
    pub fn new(profiles: RateLimitProfiles) -> Self {
        Self {
            entries: DashMap::new(),
            profiles,
        }
    }

    pub fn profiles(&self) -> &RateLimitProfiles {
        &self.profiles
    }

    pub fn check(&self, key: &str, config: RateLimitConfig) -> RateLimitResult {
        self.check_at(key, config, Instant::now())
    }

    /// Count one request for `key` as of `now`.
    pub fn check_at(&self, key: &str, config: RateLimitConfig, now: Instant) -> RateLimitResult {
        if config.max_requests == 0 {
            return RateLimitResult {
                success: false,
                limit: 0,
                remaining: 0,
                reset_after: config.window,
            };
        }

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
                window: config.window,
            });

        // window expired (or fresh entry)..? start a new one
        let elapsed = now.saturating_duration_since(entry.window_start);
        if entry.count == 0 || elapsed >= entry.window {
            entry.count = 1;
            entry.window_start = now;
            entry.window = config.window;
            return RateLimitResult {
                success: true,
                limit: config.max_requests,
                remaining: config.max_requests - 1,
                reset_after: config.window,
            };
        }

        let reset_after = entry.window - elapsed;

        // under limit.? Allow
        if entry.count < config.max_requests {
            entry.count += 1;
            return RateLimitResult {
                success: true,
                limit: config.max_requests,
                remaining: config.max_requests - entry.count,
                reset_after,
            };
        }

        debug!(key, count = entry.count, limit = config.max_requests, "rate limit exceeded");
        RateLimitResult {
            success: false,
            limit: config.max_requests,
            remaining: 0,
            reset_after,
        }
    }

    /// Check `identifier` against one profile; profiles never share counters.
    pub fn check_profile(&self, profile: RateLimitProfile, identifier: &str) -> RateLimitResult {
        let key = profile_key(profile, identifier);
        self.check(&key, self.profiles.get(profile))
    }

    /// Drop every entry whose window has closed. Returns how many were removed.
    pub fn cleanup_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) < entry.window);
        before.saturating_sub(self.entries.len())
    }

    pub fn reset(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("entries", &self.entries.len())
            .field("profiles", &self.profiles)
            .finish()
    }
}

pub fn profile_key(profile: RateLimitProfile, identifier: &str) -> String {
    format!("{}:{}", profile.as_str(), identifier)
}

/// Sweep expired windows on a fixed interval until the runtime shuts down.
pub fn spawn_cleanup(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        info!(
            interval = ?every,
            longest_window = ?limiter.profiles().longest_window(),
            "rate limit cleanup started"
        );

        loop {
            ticker.tick().await;
            let removed = limiter.cleanup_expired(Instant::now());
            if removed > 0 {
                debug!(removed, remaining = limiter.len(), "expired rate limit windows removed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimitProfiles::default())
    }

    #[test]
    fn allows_up_to_max_then_rejects() {
        let limiter = limiter();
        let config = RateLimitConfig::new(3, Duration::from_secs(60));
        let now = Instant::now();

        let remaining: Vec<u32> = (0..3)
            .map(|_| limiter.check_at("1.2.3.4", config, now).remaining)
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let rejected = limiter.check_at("1.2.3.4", config, now);
        assert!(!rejected.success);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.limit, 3);
    }

    #[test]
    fn window_resets_after_elapsed() {
        let limiter = limiter();
        let config = RateLimitConfig::new(1, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.check_at("k", config, start).success);
        assert!(!limiter.check_at("k", config, start + Duration::from_secs(9)).success);

        let after = limiter.check_at("k", config, start + Duration::from_secs(10));
        assert!(after.success);
        assert_eq!(after.remaining, 0);
        assert_eq!(after.reset_after, Duration::from_secs(10));
    }

    #[test]
    fn rejection_does_not_extend_window() {
        let limiter = limiter();
        let config = RateLimitConfig::new(1, Duration::from_secs(10));
        let start = Instant::now();

        limiter.check_at("k", config, start);
        let rejected = limiter.check_at("k", config, start + Duration::from_secs(4));
        assert_eq!(rejected.reset_after, Duration::from_secs(6));
        assert!(limiter.check_at("k", config, start + Duration::from_secs(10)).success);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter();
        let config = RateLimitConfig::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("a", config, now).success);
        assert!(limiter.check_at("b", config, now).success);
        assert!(!limiter.check_at("a", config, now).success);
    }

    #[test]
    fn profiles_do_not_share_counters() {
        let profiles = RateLimitProfiles::default()
            .with_max_requests(RateLimitProfile::Auth, 1)
            .with_max_requests(RateLimitProfile::Contact, 1);
        let limiter = RateLimiter::new(profiles);

        assert!(limiter.check_profile(RateLimitProfile::Auth, "10.0.0.1").success);
        assert!(limiter.check_profile(RateLimitProfile::Contact, "10.0.0.1").success);
        assert!(!limiter.check_profile(RateLimitProfile::Auth, "10.0.0.1").success);
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn zero_budget_always_rejects() {
        let limiter = limiter();
        let result = limiter.check("k", RateLimitConfig::new(0, Duration::from_secs(5)));
        assert!(!result.success);
        assert!(limiter.is_empty());
    }

    #[test]
    fn cleanup_removes_only_closed_windows() {
        let limiter = limiter();
        let start = Instant::now();
        limiter.check_at("short", RateLimitConfig::new(5, Duration::from_secs(1)), start);
        limiter.check_at("long", RateLimitConfig::new(5, Duration::from_secs(100)), start);

        assert_eq!(limiter.cleanup_expired(start + Duration::from_secs(2)), 1);
        assert_eq!(limiter.len(), 1);
        assert!(!limiter.reset("short"));
        assert!(limiter.reset("long"));
    }

    #[test]
    fn retry_after_rounds_up_and_is_never_zero() {
        let mut result = RateLimitResult {
            success: false,
            limit: 1,
            remaining: 0,
            reset_after: Duration::from_millis(1500),
        };
        assert_eq!(result.retry_after_secs(), 2);
        result.reset_after = Duration::ZERO;
        assert_eq!(result.retry_after_secs(), 1);
    }

    #[test]
    fn default_profiles() {
        let profiles = RateLimitProfiles::default();
        assert_eq!(profiles.get(RateLimitProfile::Auth).max_requests, 5);
        assert_eq!(profiles.get(RateLimitProfile::Auth).window, Duration::from_secs(900));
        assert_eq!(profiles.get(RateLimitProfile::Api).max_requests, 100);
        assert_eq!(profiles.get(RateLimitProfile::Sensitive).max_requests, 3);
        assert_eq!(profiles.longest_window(), HOUR);
    }
}
