//! Test support: a scripted driver double and a ready-made config.
//!
//! `FakeDriver` plays back a small scripted page model so the retrieval
//! sequence can be exercised end-to-end without a browser process. Element
//! visibility is expressed as "visible once the session is this old", which
//! is enough to script both late-rendering and never-rendering controls.

use crate::browser::Driver;
use crate::config::{
    BrowserConfig, Config, Credentials, DeliveryConfig, ExecutionMode, Selectors, WaitConfig,
};
use crate::errors::{CourierError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const FAKE_PDF: &[u8] = b"%PDF-1.4\nfake report\n";

/// Config with tiny wait budgets, pointed at a test download directory.
pub fn test_config(download_dir: &Path) -> Config {
    Config {
        mode: ExecutionMode::Development,
        login_url: "https://reports.example.com/login".to_string(),
        credentials: Credentials::new("reports-bot", "hunter2").unwrap(),
        report_filename: "AR_AgingDetail.pdf".to_string(),
        report_friendly_name: "AR Aging Detail".to_string(),
        timezone: chrono_tz::America::New_York,
        browser: BrowserConfig {
            download_dir: download_dir.to_path_buf(),
            ..Default::default()
        },
        waits: WaitConfig {
            visible_timeout_ms: 500,
            settle_ms: 1,
            download_settle_ms: 1,
        },
        selectors: Selectors::default(),
        delivery: DeliveryConfig::default(),
    }
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub selector: String,
    pub index: usize,
}

#[derive(Debug, Clone)]
struct FakeNode {
    visible_after: Duration,
}

/// A link inside a scripted menu. Clicking it can materialize a file, the
/// way a real export click side-effects a download.
#[derive(Debug, Clone, Default)]
pub struct FakeAnchor {
    pub title: Option<String>,
    pub writes_file: Option<PathBuf>,
}

impl FakeAnchor {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            writes_file: None,
        }
    }

    pub fn untitled() -> Self {
        Self::default()
    }

    pub fn writing(mut self, path: PathBuf) -> Self {
        self.writes_file = Some(path);
        self
    }
}

pub struct FakeDriver {
    started: Instant,
    nodes: HashMap<String, FakeNode>,
    anchors: HashMap<String, Vec<FakeAnchor>>,
    navigations: Mutex<Vec<String>>,
    clicks: Mutex<Vec<(String, usize)>>,
    typed: Mutex<Vec<(String, String)>>,
    terminations: Mutex<usize>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            nodes: HashMap::new(),
            anchors: HashMap::new(),
            navigations: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            typed: Mutex::new(Vec::new()),
            terminations: Mutex::new(0),
        }
    }

    /// Script a node that is present and immediately visible.
    pub fn with_node(self, selector: &str) -> Self {
        self.with_node_visible_after(selector, Duration::ZERO)
    }

    /// Script a node that turns visible once the session is `after` old.
    pub fn with_node_visible_after(mut self, selector: &str, after: Duration) -> Self {
        self.nodes.insert(
            selector.to_string(),
            FakeNode {
                visible_after: after,
            },
        );
        self
    }

    /// Script a node that is present but never becomes visible.
    pub fn with_hidden_node(self, selector: &str) -> Self {
        self.with_node_visible_after(selector, Duration::MAX)
    }

    /// Script the anchor children of an already-scripted node.
    pub fn with_anchors(mut self, scope: &str, anchors: Vec<FakeAnchor>) -> Self {
        self.anchors.insert(scope.to_string(), anchors);
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.typed.lock().unwrap().clone()
    }

    /// Indices of recorded clicks on the given selector.
    pub fn clicks_on(&self, selector: &str) -> Vec<usize> {
        self.clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == selector)
            .map(|(_, index)| *index)
            .collect()
    }

    pub fn terminations(&self) -> usize {
        *self.terminations.lock().unwrap()
    }

    /// Resolve an anchor-list element back to its scripted anchor, if the
    /// selector was produced by `find_all(scope, "a")`.
    fn anchor_for(&self, element: &FakeElement) -> Option<&FakeAnchor> {
        let scope = element.selector.strip_suffix(" a")?;
        self.anchors.get(scope)?.get(element.index)
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for FakeDriver {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<FakeElement> {
        if !self.nodes.contains_key(selector) {
            return Err(CourierError::ElementNotFound(selector.to_string()));
        }
        Ok(FakeElement {
            selector: selector.to_string(),
            index: 0,
        })
    }

    async fn find_all(&self, scope: &FakeElement, selector: &str) -> Result<Vec<FakeElement>> {
        let compound = format!("{} {}", scope.selector, selector);
        let count = self
            .anchors
            .get(&scope.selector)
            .map(|anchors| anchors.len())
            .unwrap_or(0);

        Ok((0..count)
            .map(|index| FakeElement {
                selector: compound.clone(),
                index,
            })
            .collect())
    }

    async fn wait_visible(&self, element: &FakeElement, timeout: Duration) -> Result<()> {
        // Anchor children inherit their menu's visibility.
        if self.anchor_for(element).is_some() {
            return Ok(());
        }

        let node = self
            .nodes
            .get(&element.selector)
            .ok_or_else(|| CourierError::ElementNotFound(element.selector.clone()))?;

        let start = Instant::now();
        loop {
            if self.started.elapsed() >= node.visible_after {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(CourierError::TimeoutExceeded {
                    subject: element.selector.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn click(&self, element: &FakeElement) -> Result<()> {
        self.clicks
            .lock()
            .unwrap()
            .push((element.selector.clone(), element.index));

        if let Some(anchor) = self.anchor_for(element) {
            if let Some(path) = &anchor.writes_file {
                std::fs::write(path, FAKE_PDF)?;
            }
        }

        Ok(())
    }

    async fn send_keys(&self, element: &FakeElement, text: &str) -> Result<()> {
        self.typed
            .lock()
            .unwrap()
            .push((element.selector.clone(), text.to_string()));
        Ok(())
    }

    async fn attribute(&self, element: &FakeElement, name: &str) -> Result<Option<String>> {
        if name == "title" {
            if let Some(anchor) = self.anchor_for(element) {
                return Ok(anchor.title.clone());
            }
        }
        Ok(None)
    }

    async fn terminate(&mut self) -> Result<()> {
        *self.terminations.lock().unwrap() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anchors_are_enumerated_under_their_scope() {
        let driver = FakeDriver::new().with_node("#menu").with_anchors(
            "#menu",
            vec![FakeAnchor::titled("Word"), FakeAnchor::untitled()],
        );

        let menu = driver.find("#menu").await.unwrap();
        let links = driver.find_all(&menu, "a").await.unwrap();
        assert_eq!(links.len(), 2);

        let title = driver.attribute(&links[0], "title").await.unwrap();
        assert_eq!(title.as_deref(), Some("Word"));
        assert_eq!(driver.attribute(&links[1], "title").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clicking_a_scripted_anchor_materializes_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");

        let driver = FakeDriver::new().with_node("#menu").with_anchors(
            "#menu",
            vec![FakeAnchor::titled("PDF").writing(path.clone())],
        );

        let menu = driver.find("#menu").await.unwrap();
        let links = driver.find_all(&menu, "a").await.unwrap();
        driver.click(&links[0]).await.unwrap();

        assert!(path.exists());
    }
}
