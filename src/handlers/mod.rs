mod health;
mod metrics;
mod journal;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use journal::journal_handler;
