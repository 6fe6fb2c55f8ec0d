use clap::Parser;
use std::time::Duration;

use crate::rate_limit::{RateLimitProfile, RateLimitProfiles};

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "estate-gateway")]
#[command(about = "Real-estate listing marketplace API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Listing search cache TTL in seconds
    #[arg(short, long, env = "CACHE_TTL", default_value_t = 30)]
    pub cache_ttl: u64,

    // How often expired rate-limit windows and sessions are swept, in seconds
    #[arg(long, env = "CLEANUP_INTERVAL", default_value_t = 60)]
    pub cleanup_interval: u64,

    // Per-profile request budgets (windows are fixed per profile)
    #[arg(long, env = "AUTH_RATE_LIMIT", default_value_t = 5)]
    pub auth_limit: u32,

    #[arg(long, env = "API_RATE_LIMIT", default_value_t = 100)]
    pub api_limit: u32,

    #[arg(long, env = "CONTACT_RATE_LIMIT", default_value_t = 5)]
    pub contact_limit: u32,

    #[arg(long, env = "SENSITIVE_RATE_LIMIT", default_value_t = 3)]
    pub sensitive_limit: u32,

    // Session lifetime in hours
    #[arg(long, env = "SESSION_TTL_HOURS", default_value_t = 72)]
    pub session_ttl: i64,

    // SMTP relay; when absent, mail is only logged
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    #[arg(long, env = "FROM_EMAIL", default_value = "no-reply@localhost")]
    pub from_email: String,

    #[arg(long, env = "SITE_NAME", default_value = "Estate Gateway")]
    pub site_name: String,

    // Public site URL used for links in e-mails
    #[arg(long, env = "SITE_URL", default_value = "http://localhost:3000")]
    pub site_url: String,

    // Bootstrap admin account, created at startup if missing
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    // Notification queue capacity
    #[arg(long, env = "MAIL_QUEUE", default_value_t = 256)]
    pub mail_queue: usize,
}

impl Args {
    pub fn rate_limit_profiles(&self) -> RateLimitProfiles {
        RateLimitProfiles::default()
            .with_max_requests(RateLimitProfile::Auth, self.auth_limit)
            .with_max_requests(RateLimitProfile::Api, self.api_limit)
            .with_max_requests(RateLimitProfile::Contact, self.contact_limit)
            .with_max_requests(RateLimitProfile::Sensitive, self.sensitive_limit)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl.max(1))
    }
}
