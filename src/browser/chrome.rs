use crate::browser::driver::Driver;
use crate::config::Config;
use crate::errors::{CourierError, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a node located in the session's single tab, addressed by its
/// selector and position within the selector's match list.
#[derive(Debug, Clone)]
pub struct ChromeElement {
    selector: String,
    index: usize,
}

impl ChromeElement {
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// JavaScript expression resolving this handle to its DOM node.
    fn js_node(&self) -> String {
        format!(
            "document.querySelectorAll('{}')[{}]",
            self.selector.replace('\\', "\\\\").replace('\'', "\\'"),
            self.index
        )
    }
}

/// Chrome implementation of the driver, one headless process per session.
pub struct ChromeDriver {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeDriver {
    /// Launch a headless Chrome configured for a constrained container
    /// runtime: sandboxing off, GPU off, single-process, and an isolated
    /// profile/cache tree so runs never contaminate each other. Downloads are
    /// pinned to the configured directory. Fails fatally if the process
    /// cannot start.
    pub async fn launch(config: &Config) -> Result<Self> {
        let browser_config = &config.browser;

        let window_size_arg = format!(
            "--window-size={},{}",
            browser_config.viewport.width, browser_config.viewport.height
        );
        let data_path_arg = format!("--data-path={}", browser_config.data_path.display());
        let homedir_arg = format!("--homedir={}", browser_config.home_dir.display());
        let cache_dir_arg = format!("--disk-cache-dir={}", browser_config.cache_dir.display());

        let args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-dev-tools"),
            OsStr::new("--no-zygote"),
            OsStr::new("--single-process"),
            OsStr::new(&window_size_arg),
            OsStr::new(&data_path_arg),
            OsStr::new(&homedir_arg),
            OsStr::new(&cache_dir_arg),
        ];

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .path(browser_config.binary_path.clone())
            .user_data_dir(Some(browser_config.user_data_dir.clone()))
            // The visibility budget can dwarf the default idle timeout.
            .idle_browser_timeout(Duration::from_millis(
                config.waits.visible_timeout_ms + 60_000,
            ))
            .args(args)
            .build()
            .map_err(|e| CourierError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| CourierError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| CourierError::LaunchFailed(e.to_string()))?;

        tab.call_method(Page::SetDownloadBehavior {
            behavior: Page::SetDownloadBehaviorBehaviorOption::Allow,
            download_path: Some(browser_config.download_dir.display().to_string()),
        })
        .map_err(|e| CourierError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            browser: Some(browser),
            tab: Some(tab),
        })
    }

    fn tab(&self) -> Result<&Arc<Tab>> {
        self.tab.as_ref().ok_or(CourierError::SessionClosed)
    }

    fn evaluate(&self, script: &str) -> Result<Option<serde_json::Value>> {
        let result = self
            .tab()?
            .evaluate(script, false)
            .map_err(|e| CourierError::JavaScriptFailed(e.to_string()))?;

        Ok(result.value)
    }

    fn is_visible(&self, element: &ChromeElement) -> Result<bool> {
        let script = format!(
            r#"
            (function() {{
                const element = {};
                if (!element) return false;

                const rect = element.getBoundingClientRect();
                const style = window.getComputedStyle(element);

                return rect.width > 0 &&
                       rect.height > 0 &&
                       style.visibility !== 'hidden' &&
                       style.display !== 'none' &&
                       parseFloat(style.opacity) > 0;
            }})()
        "#,
            element.js_node()
        );

        Ok(self
            .evaluate(&script)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    type Element = ChromeElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        let tab = self.tab()?;

        tab.navigate_to(url)
            .map_err(|e| CourierError::NavigationFailed(e.to_string()))?;

        tab.wait_until_navigated()
            .map_err(|e| CourierError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<ChromeElement> {
        self.tab()?
            .find_element(selector)
            .map_err(|e| CourierError::ElementNotFound(format!("{}: {}", selector, e)))?;

        Ok(ChromeElement {
            selector: selector.to_string(),
            index: 0,
        })
    }

    async fn find_all(&self, scope: &ChromeElement, selector: &str) -> Result<Vec<ChromeElement>> {
        let compound = format!("{} {}", scope.selector, selector);
        let script = format!(
            "document.querySelectorAll('{}').length",
            compound.replace('\\', "\\\\").replace('\'', "\\'")
        );

        let count = self
            .evaluate(&script)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        Ok((0..count)
            .map(|index| ChromeElement {
                selector: compound.clone(),
                index,
            })
            .collect())
    }

    async fn wait_visible(&self, element: &ChromeElement, timeout: Duration) -> Result<()> {
        let start = Instant::now();

        loop {
            if self.is_visible(element)? {
                return Ok(());
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Err(CourierError::TimeoutExceeded {
                    subject: element.selector.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn click(&self, element: &ChromeElement) -> Result<()> {
        let script = format!(
            r#"
            (function() {{
                const element = {};
                if (element) {{
                    element.click();
                    return true;
                }}
                return false;
            }})()
        "#,
            element.js_node()
        );

        if let Some(value) = self.evaluate(&script)? {
            if value.as_bool() == Some(true) {
                return Ok(());
            }
        }

        Err(CourierError::ElementNotFound(element.selector.clone()))
    }

    async fn send_keys(&self, element: &ChromeElement, text: &str) -> Result<()> {
        let script = format!(
            r#"
            (function() {{
                const element = {};
                if (element) {{
                    element.focus();
                    element.value = '{}';
                    element.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    element.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }}
                return false;
            }})()
        "#,
            element.js_node(),
            text.replace('\\', "\\\\").replace('\'', "\\'")
        );

        if let Some(value) = self.evaluate(&script)? {
            if value.as_bool() == Some(true) {
                return Ok(());
            }
        }

        Err(CourierError::ElementNotFound(element.selector.clone()))
    }

    async fn attribute(&self, element: &ChromeElement, name: &str) -> Result<Option<String>> {
        let script = format!(
            r#"
            (function() {{
                const element = {};
                if (element) {{
                    return element.getAttribute('{}');
                }}
                return null;
            }})()
        "#,
            element.js_node(),
            name.replace('\'', "\\'")
        );

        Ok(self
            .evaluate(&script)?
            .and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    async fn terminate(&mut self) -> Result<()> {
        // Dropping the handles tears the process down; a second call is a no-op.
        self.tab = None;
        self.browser = None;
        Ok(())
    }
}
