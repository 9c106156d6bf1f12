use report_courier::utils::date::{stamped_filename, today_in};
use report_courier::{
    run_attempt, ArtifactSink, ChromeDriver, Config, FailureReport, HttpSink, Notifier, Result,
    WebhookNotifier,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::from_env()?;
    let notifier = config
        .delivery
        .webhook_url
        .clone()
        .map(|url| WebhookNotifier::new(url, config.delivery.webhook_auth_header.clone()));

    match fetch_and_deliver(&config).await {
        Ok(()) => {
            if let Some(notifier) = &notifier {
                let subject = format!("{} Available", config.report_friendly_name);
                let body = format!(
                    "{} Available for {}",
                    config.report_friendly_name,
                    today_in(config.timezone, "%Y/%m/%d")
                );
                if let Err(e) = notifier.success(&subject, &body).await {
                    warn!(error = %e, "success notification failed");
                }
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "report retrieval failed");
            if let Some(notifier) = &notifier {
                let report = FailureReport::from_error(&e, &config.report_friendly_name);
                if let Err(notify_err) = notifier.failure(&report).await {
                    warn!(error = %notify_err, "failure notification also failed");
                }
            }
            Err(e.into())
        }
    }
}

/// One unattended attempt: retrieve the report, then hand it to the sink.
async fn fetch_and_deliver(config: &Config) -> Result<()> {
    info!(url = %config.login_url, "starting retrieval attempt");

    let mut driver = ChromeDriver::launch(config).await?;
    let artifact = run_attempt(&mut driver, config).await?;

    match &config.delivery.upload_url {
        Some(url) => {
            let sink = HttpSink::new(url.clone(), config.delivery.upload_auth_header.clone());
            let name = stamped_filename(&config.report_filename, config.timezone);
            sink.store(artifact, &name).await?;
        }
        None => {
            warn!(
                path = %config.artifact_path().display(),
                "UPLOAD_URL not set; leaving artifact in place"
            );
        }
    }

    Ok(())
}
