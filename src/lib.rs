pub mod browser;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod testing;
pub mod utils;
pub mod workflow;

pub use browser::{ChromeDriver, Driver};
pub use config::Config;
pub use delivery::{ArtifactSink, FailureReport, HttpSink, Notifier, WebhookNotifier};
pub use errors::{CourierError, Result};
pub use workflow::{run_attempt, ReportScraper};
