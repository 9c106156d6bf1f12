use crate::browser::Driver;
use crate::config::Config;
use crate::errors::{CourierError, Result};
use std::time::Duration;
use tokio::fs::File;
use tracing::{debug, info};

/// Drives the browser through the fixed login → report → menu → export
/// sequence and opens the downloaded artifact as a byte stream.
///
/// The scraper borrows the driver for exactly one attempt; it never owns the
/// session, so the caller can guarantee teardown on every exit path (see
/// [`run_attempt`]). Every wait or lookup failure aborts the whole sequence
/// immediately; there are no retries and no partial-success state.
pub struct ReportScraper<'a, D: Driver> {
    driver: &'a D,
    config: &'a Config,
}

impl<'a, D: Driver> ReportScraper<'a, D> {
    pub fn new(driver: &'a D, config: &'a Config) -> Self {
        Self { driver, config }
    }

    /// Retrieve today's report, returning an open stream over the downloaded
    /// file.
    pub async fn scrape_report(&self) -> Result<File> {
        debug!("logging in");
        self.login().await?;
        debug!("logged in");

        debug!("opening menu");
        self.open_reports_menu().await?;
        debug!("opened menu");

        debug!("exporting report");
        self.export_pdf_report().await?;
        debug!("exported report");

        let path = self.config.artifact_path();
        let file = File::open(&path)
            .await
            .map_err(|source| CourierError::ArtifactUnavailable {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "report artifact opened");
        Ok(file)
    }

    async fn login(&self) -> Result<()> {
        let selectors = &self.config.selectors;
        let timeout = self.visible_timeout();

        self.driver.navigate(&self.config.login_url).await?;

        let username_input = self.driver.find(&selectors.username).await?;
        let password_input = self.driver.find(&selectors.password).await?;
        let login_btn = self.driver.find(&selectors.login).await?;

        self.driver.wait_visible(&username_input, timeout).await?;
        self.driver.wait_visible(&password_input, timeout).await?;
        self.driver.wait_visible(&login_btn, timeout).await?;

        self.driver
            .send_keys(&username_input, &self.config.credentials.username)
            .await?;
        self.driver
            .send_keys(&password_input, &self.config.credentials.password)
            .await?;
        self.driver.click(&login_btn).await?;

        // Login success is only verified when a probe selector is configured;
        // without one the sequence proceeds on faith and the report-region
        // wait is the first thing that would notice a rejected login.
        if let Some(probe) = &selectors.post_login_probe {
            let marker = self.driver.find(probe).await?;
            self.driver.wait_visible(&marker, timeout).await?;
        }

        Ok(())
    }

    /// The report pane renders behind a loading dialog; it must be visible
    /// before the export controls accept interaction.
    async fn wait_for_report(&self) -> Result<()> {
        let report = self.driver.find(&self.config.selectors.report_region).await?;
        self.driver
            .wait_visible(&report, self.visible_timeout())
            .await?;
        // Visibility of the container does not mean its interactive children
        // are ready; give trailing scripts a moment to finish.
        self.settle(self.config.waits.settle_ms).await;
        Ok(())
    }

    async fn open_reports_menu(&self) -> Result<()> {
        self.wait_for_report().await?;

        let trigger = self.driver.find(&self.config.selectors.menu_trigger).await?;
        self.driver
            .wait_visible(&trigger, self.visible_timeout())
            .await?;
        self.settle(self.config.waits.settle_ms).await;
        self.driver.click(&trigger).await?;

        Ok(())
    }

    async fn export_pdf_report(&self) -> Result<()> {
        let menu = self.driver.find(&self.config.selectors.menu).await?;
        self.driver
            .wait_visible(&menu, self.visible_timeout())
            .await?;

        let pdf_link = self.find_pdf_link(&menu).await?;
        self.driver.click(&pdf_link).await?;

        // There is no download-complete signal to query; give the browser's
        // download manager time to finish writing the file.
        self.settle(self.config.waits.download_settle_ms).await;

        Ok(())
    }

    /// Scan the menu's links for the one titled "pdf" (case-insensitive).
    /// The single-pass scan keeps overwriting its candidate, so when several
    /// links match the last one wins.
    async fn find_pdf_link(&self, menu: &D::Element) -> Result<D::Element> {
        let links = self.driver.find_all(menu, "a").await?;

        let mut pdf_link = None;
        for link in links {
            let title = self.driver.attribute(&link, "title").await?;
            if title.is_some_and(|t| t.eq_ignore_ascii_case("pdf")) {
                pdf_link = Some(link);
            }
        }

        pdf_link.ok_or(CourierError::ExportLinkNotFound)
    }

    fn visible_timeout(&self) -> Duration {
        Duration::from_millis(self.config.waits.visible_timeout_ms)
    }

    async fn settle(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Run one full retrieval attempt, guaranteeing the browser session is torn
/// down exactly once whether the sequence succeeds or fails. A workflow error
/// takes precedence over a teardown error.
pub async fn run_attempt<D: Driver>(driver: &mut D, config: &Config) -> Result<File> {
    let outcome = ReportScraper::new(&*driver, config).scrape_report().await;
    let teardown = driver.terminate().await;

    let artifact = outcome?;
    teardown?;
    Ok(artifact)
}
