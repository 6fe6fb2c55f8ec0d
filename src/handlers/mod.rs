pub mod admin;
pub mod auth;
pub mod faqs;
pub mod favorites;
mod health;
pub mod inquiries;
mod metrics;
pub mod newsletter;
pub mod properties;

pub use health::health_handler;
pub use metrics::metrics_handler;
