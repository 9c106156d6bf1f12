use crate::errors::{CourierError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use url::Url;

/// Everything the courier needs for one attempt, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mode: ExecutionMode,
    pub login_url: String,
    pub credentials: Credentials,
    pub report_filename: String,
    pub report_friendly_name: String,
    pub timezone: Tz,
    pub browser: BrowserConfig,
    pub waits: WaitConfig,
    pub selectors: Selectors,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Production,
    Development,
}

impl ExecutionMode {
    pub fn is_production(self) -> bool {
        self == ExecutionMode::Production
    }

    fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => ExecutionMode::Production,
            _ => ExecutionMode::Development,
        }
    }
}

/// Immutable login pair, read-only for the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return Err(CourierError::MissingCredentials);
        }
        Ok(Self { username, password })
    }

    fn from_env() -> Result<Self> {
        Self::new(
            env::var("AUTH_USERNAME").unwrap_or_default(),
            env::var("AUTH_PASSWORD").unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Browser process configuration: binary, isolated profile tree, download target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub binary_path: Option<PathBuf>,
    pub user_data_dir: PathBuf,
    pub data_path: PathBuf,
    pub home_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub download_dir: PathBuf,
    pub viewport: Viewport,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            user_data_dir: PathBuf::from("/tmp/chromium"),
            data_path: PathBuf::from("/tmp/data-path"),
            home_dir: PathBuf::from("/tmp"),
            cache_dir: PathBuf::from("/tmp/cache-dir"),
            download_dir: PathBuf::from("/tmp"),
            viewport: Viewport::default(),
        }
    }
}

impl BrowserConfig {
    fn from_env(mode: ExecutionMode) -> Self {
        let binary_path = env_opt("BROWSER_BINARY").map(PathBuf::from).or_else(|| {
            if mode.is_production() {
                Some(PathBuf::from("/opt/chromium/chrome"))
            } else {
                None
            }
        });

        let download_dir = env_opt("DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_download_dir(mode));

        Self {
            binary_path,
            download_dir,
            ..Default::default()
        }
    }
}

fn default_download_dir(mode: ExecutionMode) -> PathBuf {
    if mode.is_production() {
        PathBuf::from("/tmp")
    } else {
        dirs::download_dir().unwrap_or_else(env::temp_dir)
    }
}

/// Wait budgets for the retrieval sequence, all in milliseconds.
///
/// The settle delays are unconditional sleeps layered on top of the visibility
/// waits; they approximate "fully rendered" for a page that exposes no
/// readiness signal, and are a heuristic rather than a guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    pub visible_timeout_ms: u64,
    pub settle_ms: u64,
    pub download_settle_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            visible_timeout_ms: 120_000,
            settle_ms: 2_000,
            download_settle_ms: 10_000,
        }
    }
}

impl WaitConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            visible_timeout_ms: env_ms("VISIBLE_TIMEOUT_MS", defaults.visible_timeout_ms)?,
            settle_ms: env_ms("SETTLE_MS", defaults.settle_ms)?,
            download_settle_ms: env_ms("DOWNLOAD_SETTLE_MS", defaults.download_settle_ms)?,
        })
    }
}

/// CSS selectors for the report viewer's controls.
///
/// Defaults target the legacy report viewer's generated control ids. The
/// optional post-login probe enables a visibility check after the login click;
/// left unset, login success is not verified before the sequence proceeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selectors {
    pub username: String,
    pub password: String,
    pub login: String,
    pub report_region: String,
    pub menu_trigger: String,
    pub menu: String,
    pub post_login_probe: Option<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            username: "#txtUsername".to_string(),
            password: "#txtPassword".to_string(),
            login: "#btnLogin".to_string(),
            report_region: "#rvMainReportView_ctl13".to_string(),
            menu_trigger: "#rvMainReportView_ctl09_ctl04_ctl00".to_string(),
            menu: "#rvMainReportView_ctl09_ctl04_ctl00_Menu".to_string(),
            post_login_probe: None,
        }
    }
}

impl Selectors {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            username: env_or("SELECTOR_USERNAME", &defaults.username),
            password: env_or("SELECTOR_PASSWORD", &defaults.password),
            login: env_or("SELECTOR_LOGIN", &defaults.login),
            report_region: env_or("SELECTOR_REPORT_REGION", &defaults.report_region),
            menu_trigger: env_or("SELECTOR_MENU_TRIGGER", &defaults.menu_trigger),
            menu: env_or("SELECTOR_MENU", &defaults.menu),
            post_login_probe: env_opt("POST_LOGIN_SELECTOR"),
        }
    }
}

/// Endpoints for the artifact sink and the notification webhook.
/// Either may be unset, in which case that leg is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub upload_url: Option<String>,
    pub upload_auth_header: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_auth_header: Option<String>,
}

impl DeliveryConfig {
    fn from_env() -> Self {
        Self {
            upload_url: env_opt("UPLOAD_URL"),
            upload_auth_header: env_opt("UPLOAD_AUTH_HEADER"),
            webhook_url: env_opt("NOTIFY_WEBHOOK_URL"),
            webhook_auth_header: env_opt("NOTIFY_AUTH_HEADER"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mode = ExecutionMode::from_env();
        let credentials = Credentials::from_env()?;

        let login_url = env_opt("LOGIN_URL").ok_or_else(|| {
            CourierError::ConfigurationError("LOGIN_URL is not set".to_string())
        })?;
        Url::parse(&login_url)
            .map_err(|e| CourierError::ConfigurationError(format!("LOGIN_URL: {}", e)))?;

        let timezone = env_or("REPORT_TIMEZONE", "America/New_York")
            .parse::<Tz>()
            .map_err(|e| CourierError::ConfigurationError(format!("REPORT_TIMEZONE: {}", e)))?;

        Ok(Self {
            mode,
            login_url,
            credentials,
            report_filename: env_or("REPORT_FILENAME", "Report.pdf"),
            report_friendly_name: env_or("REPORT_FRIENDLY_NAME", "Report"),
            timezone,
            browser: BrowserConfig::from_env(mode),
            waits: WaitConfig::from_env()?,
            selectors: Selectors::from_env(),
            delivery: DeliveryConfig::from_env(),
        })
    }

    /// Absolute path the export click is expected to write the artifact to.
    pub fn artifact_path(&self) -> PathBuf {
        self.browser.download_dir.join(&self.report_filename)
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_ms(key: &str, default: u64) -> Result<u64> {
    match env_opt(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| CourierError::ConfigurationError(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: &[&str] = &[
        "APP_ENV",
        "LOGIN_URL",
        "AUTH_USERNAME",
        "AUTH_PASSWORD",
        "REPORT_FILENAME",
        "REPORT_FRIENDLY_NAME",
        "REPORT_TIMEZONE",
        "VISIBLE_TIMEOUT_MS",
        "SETTLE_MS",
        "DOWNLOAD_SETTLE_MS",
        "DOWNLOAD_DIR",
        "BROWSER_BINARY",
        "POST_LOGIN_SELECTOR",
        "SELECTOR_USERNAME",
        "SELECTOR_PASSWORD",
        "SELECTOR_LOGIN",
        "SELECTOR_REPORT_REGION",
        "SELECTOR_MENU_TRIGGER",
        "SELECTOR_MENU",
        "UPLOAD_URL",
        "UPLOAD_AUTH_HEADER",
        "NOTIFY_WEBHOOK_URL",
        "NOTIFY_AUTH_HEADER",
    ];

    fn reset_env() {
        for key in ALL_VARS {
            env::remove_var(key);
        }
        env::set_var("LOGIN_URL", "https://reports.example.com/login");
        env::set_var("AUTH_USERNAME", "reports-bot");
        env::set_var("AUTH_PASSWORD", "hunter2");
        env::set_var("REPORT_FILENAME", "AR_AgingDetail.pdf");
    }

    #[test]
    #[serial]
    fn missing_username_is_fatal() {
        reset_env();
        env::remove_var("AUTH_USERNAME");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CourierError::MissingCredentials));
    }

    #[test]
    #[serial]
    fn empty_password_is_fatal() {
        reset_env();
        env::set_var("AUTH_PASSWORD", "");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CourierError::MissingCredentials));
    }

    #[test]
    #[serial]
    fn missing_login_url_is_fatal() {
        reset_env();
        env::remove_var("LOGIN_URL");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CourierError::ConfigurationError(_)));
    }

    #[test]
    #[serial]
    fn invalid_login_url_is_fatal() {
        reset_env();
        env::set_var("LOGIN_URL", "not a url");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CourierError::ConfigurationError(_)));
    }

    #[test]
    #[serial]
    fn default_budgets_and_selectors() {
        reset_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.mode, ExecutionMode::Development);
        assert_eq!(config.waits.visible_timeout_ms, 120_000);
        assert_eq!(config.waits.settle_ms, 2_000);
        assert_eq!(config.waits.download_settle_ms, 10_000);
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.selectors.username, "#txtUsername");
        assert!(config.selectors.post_login_probe.is_none());
        assert!(config.browser.binary_path.is_none());
    }

    #[test]
    #[serial]
    fn production_pins_browser_and_download_dir() {
        reset_env();
        env::set_var("APP_ENV", "production");
        let config = Config::from_env().unwrap();
        assert!(config.mode.is_production());
        assert_eq!(config.browser.download_dir, PathBuf::from("/tmp"));
        assert_eq!(
            config.browser.binary_path,
            Some(PathBuf::from("/opt/chromium/chrome"))
        );
        assert_eq!(
            config.artifact_path(),
            PathBuf::from("/tmp/AR_AgingDetail.pdf")
        );
    }

    #[test]
    #[serial]
    fn overrides_take_effect() {
        reset_env();
        env::set_var("VISIBLE_TIMEOUT_MS", "500");
        env::set_var("DOWNLOAD_DIR", "/srv/reports");
        env::set_var("POST_LOGIN_SELECTOR", "#dashboard");
        let config = Config::from_env().unwrap();
        assert_eq!(config.waits.visible_timeout_ms, 500);
        assert_eq!(config.browser.download_dir, PathBuf::from("/srv/reports"));
        assert_eq!(
            config.selectors.post_login_probe.as_deref(),
            Some("#dashboard")
        );
    }

    #[test]
    #[serial]
    fn malformed_timeout_is_fatal() {
        reset_env();
        env::set_var("SETTLE_MS", "soon");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CourierError::ConfigurationError(_)));
    }
}
