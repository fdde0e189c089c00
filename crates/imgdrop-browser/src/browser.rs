//! Browser lifecycle management using Chrome DevTools Protocol

use crate::driver::{ButtonScope, ButtonSnapshot, ElementHandle, ElementState, PageDriver};
use crate::error::{DropError, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use imgdrop_core::BrowserOptions;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const LIST_BUTTONS_JS: &str = r#"(() => {
  const scope = __SCOPE__;
  const page = window.__imgdropPage || (window.__imgdropPage = Math.random().toString(36).slice(2, 8));
  const stamp = (el) => {
    if (!el.hasAttribute('data-imgdrop-handle')) {
      window.__imgdropSeq = (window.__imgdropSeq || 0) + 1;
      el.setAttribute('data-imgdrop-handle', page + '-' + window.__imgdropSeq);
    }
    return el.getAttribute('data-imgdrop-handle');
  };
  let root = document;
  if (scope) {
    const heading = Array.from(document.querySelectorAll(scope.selector))
      .find((h) => h.textContent.includes(scope.text));
    if (!heading) return JSON.stringify(null);
    let container = heading.parentElement;
    for (let i = 1; i < scope.depth && container; i++) container = container.parentElement;
    if (!container) return JSON.stringify(null);
    root = container;
  }
  return JSON.stringify(Array.from(root.querySelectorAll('button')).map((el) => ({
    token: stamp(el),
    text: (el.textContent || '').trim(),
    disabled: !!el.disabled,
    opacity: window.getComputedStyle(el).opacity,
  })));
})()"#;

const INSPECT_JS: &str = r#"(() => {
  const el = document.querySelector(__SELECTOR__);
  if (!el) return JSON.stringify(null);
  return JSON.stringify({
    tag: el.tagName,
    attached: document.body.contains(el),
    disabled: !!el.disabled,
    opacity: window.getComputedStyle(el).opacity,
  });
})()"#;

/// Button as serialized by [`LIST_BUTTONS_JS`]
#[derive(Debug, Deserialize)]
struct RawButton {
    token: String,
    text: String,
    disabled: bool,
    opacity: String,
}

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
}

impl BrowserSession {
    /// Launch Chrome, or attach to a running one when `connect_url` is set
    pub async fn open(options: &BrowserOptions) -> Result<Self> {
        match &options.connect_url {
            Some(url) => Self::connect(url).await,
            None => Self::launch_with_options(options).await,
        }
    }

    /// Launch browser with custom configuration
    pub async fn launch_with_options(options: &BrowserOptions) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            options.headless, options.window_width, options.window_height
        );

        let mut launch_options = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(options.sandbox)
            .window_size(Some((options.window_width, options.window_height)))
            .path(options.chrome_path.clone())
            .user_data_dir(options.user_data_dir.clone())
            .idle_browser_timeout(Duration::from_secs(options.idle_timeout_secs))
            .build()
            .map_err(|e| DropError::Browser(format!("Failed to launch browser: {}", e)))?;

        launch_options.args.push(OsStr::new("--start-maximized"));
        launch_options.args.push(OsStr::new("--disable-dev-shm-usage"));

        let browser = Browser::new(launch_options)
            .map_err(|e| DropError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| DropError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Browser launched successfully");

        Ok(Self { browser, tab })
    }

    /// Connect to an existing browser instance
    ///
    /// # Arguments
    /// * `ws_url` - DevTools websocket URL printed by `chrome --remote-debugging-port=9222`
    pub async fn connect(ws_url: &str) -> Result<Self> {
        info!("Connecting to existing browser at {}", ws_url);

        let browser = Browser::connect(ws_url.to_string())
            .map_err(|e| DropError::Browser(format!("Failed to connect to browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| DropError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Connected to browser successfully");

        Ok(Self { browser, tab })
    }

    /// Execute JavaScript in the page context
    ///
    /// # Returns
    /// JSON result from JavaScript execution (primitives only)
    pub async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| DropError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Evaluate a script that returns `JSON.stringify(..)` and decode it
    async fn evaluate_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let value = self.evaluate_script(script).await?;
        let text = value.as_str().ok_or_else(|| {
            DropError::Browser(format!("Expected a JSON string from script, got {}", value))
        })?;
        Ok(serde_json::from_str(text)?)
    }
}

/// Quote `value` as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn scope_json(scope: &ButtonScope) -> String {
    match scope {
        ButtonScope::Document => "null".to_string(),
        ButtonScope::Landmark {
            selector,
            text,
            depth,
        } => serde_json::json!({ "selector": selector, "text": text, "depth": depth }).to_string(),
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| DropError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| DropError::Browser(format!("Navigation timeout for {}: {}", url, e)))?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        debug!("Reloading page");

        self.tab
            .reload(false, None)
            .map_err(|e| DropError::Browser(format!("Failed to reload page: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| DropError::Browser(format!("Reload did not settle: {}", e)))?;

        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        let result = self.evaluate_script(&script).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn list_buttons(&self, scope: &ButtonScope) -> Result<Option<Vec<ButtonSnapshot>>> {
        let script = LIST_BUTTONS_JS.replace("__SCOPE__", &scope_json(scope));
        let raw: Option<Vec<RawButton>> = self.evaluate_json(&script).await?;

        Ok(raw.map(|buttons| {
            buttons
                .into_iter()
                .map(|b| ButtonSnapshot {
                    handle: ElementHandle::button(b.token),
                    text: b.text,
                    disabled: b.disabled,
                    opacity: b.opacity,
                })
                .collect()
        }))
    }

    async fn inspect(&self, handle: &ElementHandle) -> Result<Option<ElementState>> {
        let script = INSPECT_JS.replace("__SELECTOR__", &js_string(&handle.selector()));
        self.evaluate_json(&script).await
    }

    async fn click(&self, handle: &ElementHandle) -> Result<()> {
        debug!("Clicking {}", handle.token);

        let element = self
            .tab
            .find_element(&handle.selector())
            .map_err(|_e| DropError::Stale(handle.token.clone()))?;

        element
            .click()
            .map_err(|e| DropError::Browser(format!("Click failed: {}", e)))?;

        Ok(())
    }

    async fn clear_file_input(&self, selector: &str) -> Result<()> {
        let script = format!(
            "(() => {{ const input = document.querySelector({}); if (input) input.value = ''; return true; }})()",
            js_string(selector)
        );
        self.evaluate_script(&script).await?;
        Ok(())
    }

    async fn attach_file(&self, selector: &str, path: &Path) -> Result<()> {
        let path_str = path.to_str().ok_or_else(|| {
            DropError::Other(format!("Path is not valid UTF-8: {}", path.display()))
        })?;

        let input = self
            .tab
            .find_element(selector)
            .map_err(|_e| DropError::NotFound(selector.to_string()))?;

        input
            .set_input_files(&[path_str])
            .map_err(|e| DropError::Browser(format!("Failed to attach {}: {}", path_str, e)))?;

        debug!("Attached {} to {}", path_str, selector);
        Ok(())
    }

    async fn attached_file_count(&self, selector: &str) -> Result<usize> {
        let script = format!(
            "(() => {{ const input = document.querySelector({}); return input && input.files ? input.files.length : 0; }})()",
            js_string(selector)
        );
        let result = self.evaluate_script(&script).await?;
        Ok(result.as_u64().unwrap_or(0) as usize)
    }

    async fn close(&self) -> Result<()> {
        info!("Closing browser session");
        self.tab
            .close(false)
            .map_err(|e| DropError::Browser(format!("Failed to close tab: {}", e)))?;
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, Chrome exits with its last handle");
    }
}
