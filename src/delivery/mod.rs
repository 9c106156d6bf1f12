pub mod notify;
pub mod sink;

pub use notify::{FailureReport, Notifier, WebhookNotifier};
pub use sink::{ArtifactSink, HttpSink};
