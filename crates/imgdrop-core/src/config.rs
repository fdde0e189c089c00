//! Configuration management for imgdrop
//!
//! Site selectors, browser launch options and every poll constant live here.
//! The poll constants are empirical tuning values for one external site, so
//! none of them is hard-coded in the runner.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{DropError, Result};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "imgdrop.toml";

/// Top-level configuration
///
/// Loaded from `imgdrop.toml` (or an explicit path); every section falls back
/// to defaults when missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImgdropConfig {
    /// Target site: URLs, selectors and control texts
    #[serde(default)]
    pub site: SiteConfig,

    /// Browser launch or attach options
    #[serde(default)]
    pub browser: BrowserOptions,

    /// Poll intervals, attempt counts and timeouts
    #[serde(default)]
    pub timing: TimingConfig,

    /// Where the images come from
    #[serde(default)]
    pub source: SourceConfig,
}

/// Target site description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Page holding the upload form
    #[serde(default = "default_upload_route")]
    pub upload_route: String,

    /// Authentication entry point
    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// CSS selector of the file input (the ready element)
    #[serde(default = "default_input_selector")]
    pub input_selector: String,

    /// Exact visible text of the action button
    #[serde(default = "default_upload_button_text")]
    pub upload_button_text: String,

    /// Exact visible text of the remove control
    #[serde(default = "default_remove_button_text")]
    pub remove_button_text: String,

    /// Case-insensitive substrings accepted when the exact remove text is absent
    #[serde(default = "default_remove_synonyms")]
    pub remove_synonyms: Vec<String>,

    /// Selector of the landmark heading used to scope the upload button search
    #[serde(default = "default_landmark_selector")]
    pub landmark_selector: String,

    /// Text the landmark heading contains. Set it to `""` in the config
    /// file to search the whole document without landmark scoping.
    #[serde(default = "default_landmark_text")]
    pub landmark_text: Option<String>,

    /// How many ancestor levels above the landmark to search
    #[serde(default = "default_landmark_depth")]
    pub landmark_depth: usize,

    /// Computed opacity the site uses to render a disabled button
    #[serde(default = "default_disabled_opacity")]
    pub disabled_opacity: String,
}

/// Browser launch options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserOptions {
    /// Run without a window. Manual login needs a window, so this is off by default.
    #[serde(default)]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Chrome/Chromium binary; auto-detected when unset
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Profile directory, so an existing login can be reused
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,

    #[serde(default)]
    pub sandbox: bool,

    /// DevTools idle timeout; must outlast the manual login
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Attach to a running Chrome (DevTools websocket URL) instead of launching
    #[serde(default)]
    pub connect_url: Option<String>,
}

/// Poll intervals, attempt counts and timeouts, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Fast-path wait for the ready element right after navigation
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Wait for the ready element after manual login; unbounded when unset
    #[serde(default)]
    pub auth_timeout_ms: Option<u64>,

    /// Wait for the file input to report an attached file
    #[serde(default = "default_attach_timeout_ms")]
    pub attach_timeout_ms: u64,

    /// Wait for the upload button to show up after attaching
    #[serde(default = "default_button_appear_timeout_ms")]
    pub button_appear_timeout_ms: u64,

    /// Spacing between polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Attempts before a button is declared stuck disabled
    #[serde(default = "default_max_enable_polls")]
    pub max_enable_polls: u32,

    /// Wait for the remove control to disappear after clicking it
    #[serde(default = "default_removal_confirm_timeout_ms")]
    pub removal_confirm_timeout_ms: u64,

    /// Wait for the file input to come back after a reload
    #[serde(default = "default_reload_timeout_ms")]
    pub reload_timeout_ms: u64,

    /// Pause after triggering an action
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Source directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_dir")]
    pub dir: PathBuf,

    /// Allowed extensions, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

// Default value providers
fn default_base_url() -> String {
    "https://www.x-vertice.com".to_string()
}

fn default_upload_route() -> String {
    "/analysis".to_string()
}

fn default_login_route() -> String {
    "/sign-in".to_string()
}

fn default_input_selector() -> String {
    "#file-upload".to_string()
}

fn default_upload_button_text() -> String {
    "Upload".to_string()
}

fn default_remove_button_text() -> String {
    "Remove file".to_string()
}

fn default_remove_synonyms() -> Vec<String> {
    vec!["remove".to_string(), "delete".to_string(), "clear".to_string()]
}

fn default_landmark_selector() -> String {
    "h2".to_string()
}

fn default_landmark_text() -> Option<String> {
    Some("Upload Your Document".to_string())
}

fn default_landmark_depth() -> usize {
    3
}

fn default_disabled_opacity() -> String {
    "0.5".to_string()
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

fn default_ready_timeout_ms() -> u64 {
    5_000
}

fn default_attach_timeout_ms() -> u64 {
    5_000
}

fn default_button_appear_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_enable_polls() -> u32 {
    100
}

fn default_removal_confirm_timeout_ms() -> u64 {
    5_000
}

fn default_reload_timeout_ms() -> u64 {
    10_000
}

fn default_settle_ms() -> u64 {
    500
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "png".to_string()]
}

impl ImgdropConfig {
    /// Load from an explicit path, or `./imgdrop.toml`, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::load_from(&local)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            DropError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| DropError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make every poll loop meaningless
    pub fn validate(&self) -> Result<()> {
        if !self.site.base_url.contains("://") {
            return Err(DropError::Config(format!(
                "base_url must include a scheme: {}",
                self.site.base_url
            )));
        }
        if self.timing.poll_interval_ms == 0 {
            return Err(DropError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.timing.max_enable_polls == 0 {
            return Err(DropError::Config(
                "max_enable_polls must be greater than zero".to_string(),
            ));
        }
        if self.source.extensions.is_empty() {
            return Err(DropError::Config(
                "at least one file extension is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl SiteConfig {
    /// Full URL of the upload page
    pub fn upload_url(&self) -> String {
        join_url(&self.base_url, &self.upload_route)
    }

    /// Full URL of the login page
    pub fn login_url(&self) -> String {
        join_url(&self.base_url, &self.login_route)
    }
}

fn join_url(base: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

impl TimingConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn auth_timeout(&self) -> Option<Duration> {
        self.auth_timeout_ms.map(Duration::from_millis)
    }

    pub fn attach_timeout(&self) -> Duration {
        Duration::from_millis(self.attach_timeout_ms)
    }

    pub fn button_appear_timeout(&self) -> Duration {
        Duration::from_millis(self.button_appear_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn removal_confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.removal_confirm_timeout_ms)
    }

    pub fn reload_timeout(&self) -> Duration {
        Duration::from_millis(self.reload_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            upload_route: default_upload_route(),
            login_route: default_login_route(),
            input_selector: default_input_selector(),
            upload_button_text: default_upload_button_text(),
            remove_button_text: default_remove_button_text(),
            remove_synonyms: default_remove_synonyms(),
            landmark_selector: default_landmark_selector(),
            landmark_text: default_landmark_text(),
            landmark_depth: default_landmark_depth(),
            disabled_opacity: default_disabled_opacity(),
        }
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            chrome_path: None,
            user_data_dir: None,
            sandbox: false,
            idle_timeout_secs: default_idle_timeout_secs(),
            connect_url: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: default_ready_timeout_ms(),
            auth_timeout_ms: None,
            attach_timeout_ms: default_attach_timeout_ms(),
            button_appear_timeout_ms: default_button_appear_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_enable_polls: default_max_enable_polls(),
            removal_confirm_timeout_ms: default_removal_confirm_timeout_ms(),
            reload_timeout_ms: default_reload_timeout_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: default_source_dir(),
            extensions: default_extensions(),
        }
    }
}
