//! Mock page driver for testing
//!
//! Simulates the upload form: a file input, an "Upload" button that enables
//! once a file is attached, and a remove control that appears after an upload
//! is triggered. Navigation and reload bump a generation counter, which makes
//! every previously listed handle stale. Clones share state, so a test can keep
//! one clone for assertions while the runner owns another.

use crate::driver::{ButtonScope, ButtonSnapshot, ElementHandle, ElementState, PageDriver};
use crate::error::{DropError, Result};
use async_trait::async_trait;
use imgdrop_core::SiteConfig;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const UPLOAD_INDEX: usize = 0;
const REMOVE_INDEX: usize = 1;
const EXTRA_OFFSET: usize = 2;

/// How the remove control behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveMode {
    /// Appears after upload and clears the form when clicked
    Works,
    /// Never appears
    Missing,
    /// Appears, but clicking it changes nothing
    Sticky,
    /// Appears, but clicking it errors
    ClickFails,
    /// Appears and stays disabled
    Disabled,
}

#[derive(Debug)]
struct MockState {
    upload_url: String,
    login_url: String,
    input_selector: String,
    upload_text: String,
    remove_text: String,
    disabled_opacity: String,

    url: Option<String>,
    generation: u64,
    authenticated: bool,
    login_on_visit: bool,
    input_missing: bool,
    lose_input_on_reload: bool,

    attached: Option<String>,
    upload_inspections: u32,
    enable_after_polls: u32,
    remove_visible: bool,
    remove_mode: RemoveMode,
    stuck_files: HashSet<String>,
    flaky_files: HashMap<String, u32>,
    attached_stuck: bool,
    unregistered_files: HashSet<String>,
    landmark: Option<(String, usize)>,
    extra_buttons: Vec<String>,
    rerenders_pending: u32,
    attached_paths: Vec<PathBuf>,

    uploads: Vec<String>,
    navigations: Vec<String>,
    reloads: usize,
    removals: usize,
    closed: bool,
}

/// In-memory upload form implementing [`PageDriver`]
#[derive(Debug, Clone)]
pub struct MockPage {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPage {
    /// Upload form for the default site configuration
    pub fn new() -> Self {
        Self::for_site(&SiteConfig::default())
    }

    /// Upload form using the URLs, selector and button texts of `site`
    pub fn for_site(site: &SiteConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                upload_url: site.upload_url(),
                login_url: site.login_url(),
                input_selector: site.input_selector.clone(),
                upload_text: site.upload_button_text.clone(),
                remove_text: site.remove_button_text.clone(),
                disabled_opacity: site.disabled_opacity.clone(),
                url: None,
                generation: 0,
                authenticated: false,
                login_on_visit: true,
                input_missing: false,
                lose_input_on_reload: false,
                attached: None,
                upload_inspections: 0,
                enable_after_polls: 0,
                remove_visible: false,
                remove_mode: RemoveMode::Works,
                stuck_files: HashSet::new(),
                flaky_files: HashMap::new(),
                attached_stuck: false,
                unregistered_files: HashSet::new(),
                landmark: None,
                extra_buttons: Vec::new(),
                rerenders_pending: 0,
                attached_paths: Vec::new(),
                uploads: Vec::new(),
                navigations: Vec::new(),
                reloads: 0,
                removals: 0,
                closed: false,
            })),
        }
    }

    /// A page with no form and no buttons
    pub fn blank() -> Self {
        let page = Self::new();
        page.lock().input_missing = true;
        page
    }

    pub fn authenticated(self, authenticated: bool) -> Self {
        self.lock().authenticated = authenticated;
        self
    }

    /// Whether visiting the login URL logs the session in (stands in for the human)
    pub fn login_on_visit(self, login: bool) -> Self {
        self.lock().login_on_visit = login;
        self
    }

    /// Upload button stays at the disabled opacity while this file is attached
    pub fn with_stuck_file(self, file: &str) -> Self {
        self.lock().stuck_files.insert(file.to_string());
        self
    }

    /// Like [`MockPage::with_stuck_file`], but only for the first `attempts` attaches
    pub fn with_flaky_file(self, file: &str, attempts: u32) -> Self {
        self.lock().flaky_files.insert(file.to_string(), attempts);
        self
    }

    /// Attaching this file never shows up in the input's file list
    pub fn with_unregistered_file(self, file: &str) -> Self {
        self.lock().unregistered_files.insert(file.to_string());
        self
    }

    pub fn with_remove_mode(self, mode: RemoveMode) -> Self {
        self.lock().remove_mode = mode;
        self
    }

    /// Heading containing `text`; the form's buttons sit `depth` ancestors above it
    pub fn with_landmark(self, text: &str, depth: usize) -> Self {
        self.lock().landmark = Some((text.to_string(), depth));
        self
    }

    /// Static button present on every page
    pub fn with_extra_button(self, text: &str) -> Self {
        self.lock().extra_buttons.push(text.to_string());
        self
    }

    /// Upload button reports disabled for the first `polls` inspections after each attach
    pub fn enable_after_polls(self, polls: u32) -> Self {
        self.lock().enable_after_polls = polls;
        self
    }

    /// The next `times` inspections re-render the page first: the form keeps
    /// its state but every handle listed before goes stale
    pub fn rerender_on_inspect(self, times: u32) -> Self {
        self.lock().rerenders_pending = times;
        self
    }

    /// The file input disappears for good on the next reload
    pub fn lose_input_on_reload(self) -> Self {
        self.lock().lose_input_on_reload = true;
        self
    }

    pub fn upload_url(&self) -> String {
        self.lock().upload_url.clone()
    }

    pub fn login_url(&self) -> String {
        self.lock().login_url.clone()
    }

    /// Files whose upload button was clicked while enabled, in order
    pub fn uploads(&self) -> Vec<String> {
        self.lock().uploads.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn reload_count(&self) -> usize {
        self.lock().reloads
    }

    pub fn removal_count(&self) -> usize {
        self.lock().removals
    }

    pub fn attached(&self) -> Option<String> {
        self.lock().attached.clone()
    }

    /// Every path handed to the file input, as given
    pub fn attached_paths(&self) -> Vec<PathBuf> {
        self.lock().attached_paths.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Put a leftover file and remove control on the form, as a previous run would
    pub fn leave_leftover(&self, file: &str) {
        let mut state = self.lock();
        state.attached = Some(file.to_string());
        state.attached_stuck = false;
        state.remove_visible = true;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MockState {
    fn form_visible(&self) -> bool {
        if self.input_missing {
            return false;
        }
        self.authenticated && self.url.as_deref() == Some(self.upload_url.as_str())
    }

    fn reset_form(&mut self) {
        self.generation += 1;
        self.attached = None;
        self.attached_stuck = false;
        self.upload_inspections = 0;
        self.remove_visible = false;
    }

    fn upload_enabled(&self) -> bool {
        self.attached.is_some()
            && !self.attached_stuck
            && self.upload_inspections >= self.enable_after_polls
    }

    /// Whether the next attach of `file` should leave the upload button stuck
    fn take_stuck(&mut self, file: &str) -> bool {
        if self.stuck_files.contains(file) {
            return true;
        }
        match self.flaky_files.get_mut(file) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn remove_present(&self) -> bool {
        self.form_visible() && self.remove_visible && self.remove_mode != RemoveMode::Missing
    }

    /// (index, text, disabled, opacity) of every button currently on the page
    fn buttons(&self) -> Vec<(usize, String, bool, String)> {
        let mut buttons = Vec::new();

        if self.form_visible() {
            let (disabled, opacity) = if self.attached.is_some() && self.attached_stuck {
                (false, self.disabled_opacity.clone())
            } else if self.upload_enabled() {
                (false, "1".to_string())
            } else {
                (true, "1".to_string())
            };
            buttons.push((UPLOAD_INDEX, self.upload_text.clone(), disabled, opacity));
        }

        if self.remove_present() {
            let disabled = self.remove_mode == RemoveMode::Disabled;
            buttons.push((REMOVE_INDEX, self.remove_text.clone(), disabled, "1".to_string()));
        }

        for (i, text) in self.extra_buttons.iter().enumerate() {
            buttons.push((EXTRA_OFFSET + i, text.clone(), false, "1".to_string()));
        }

        buttons
    }

    fn token(&self, index: usize) -> String {
        format!("g{}-b{}", self.generation, index)
    }

    /// Index of the live button behind `token`, if any
    fn resolve(&self, token: &str) -> Option<usize> {
        let (generation, index) = token.strip_prefix('g')?.split_once("-b")?;
        if generation.parse::<u64>().ok()? != self.generation {
            return None;
        }
        let index = index.parse::<usize>().ok()?;
        self.buttons()
            .iter()
            .any(|(i, ..)| *i == index)
            .then_some(index)
    }

    fn snapshot(&self) -> Vec<ButtonSnapshot> {
        self.buttons()
            .into_iter()
            .map(|(index, text, disabled, opacity)| ButtonSnapshot {
                handle: ElementHandle::button(self.token(index)),
                text,
                disabled,
                opacity,
            })
            .collect()
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.lock();
        state.navigations.push(url.to_string());
        if url == state.login_url && state.login_on_visit {
            state.authenticated = true;
        }
        state.url = Some(url.to_string());
        state.reset_form();
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let mut state = self.lock();
        state.reloads += 1;
        if state.lose_input_on_reload {
            state.input_missing = true;
        }
        state.reset_form();
        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        let state = self.lock();
        Ok(selector == state.input_selector && state.form_visible())
    }

    async fn list_buttons(&self, scope: &ButtonScope) -> Result<Option<Vec<ButtonSnapshot>>> {
        let state = self.lock();
        match scope {
            ButtonScope::Document => Ok(Some(state.snapshot())),
            ButtonScope::Landmark { text, depth, .. } => match &state.landmark {
                Some((heading, form_depth)) if heading.contains(text.as_str()) => {
                    if *depth > form_depth + 2 {
                        Ok(None)
                    } else if depth < form_depth {
                        Ok(Some(Vec::new()))
                    } else {
                        Ok(Some(state.snapshot()))
                    }
                }
                _ => Ok(None),
            },
        }
    }

    async fn inspect(&self, handle: &ElementHandle) -> Result<Option<ElementState>> {
        let mut state = self.lock();
        if state.rerenders_pending > 0 {
            state.rerenders_pending -= 1;
            state.generation += 1;
        }
        let Some(index) = state.resolve(&handle.token) else {
            return Ok(None);
        };
        if index == UPLOAD_INDEX {
            state.upload_inspections += 1;
        }
        Ok(state
            .buttons()
            .into_iter()
            .find(|(i, ..)| *i == index)
            .map(|(_, _, disabled, opacity)| ElementState {
                tag: "BUTTON".to_string(),
                attached: true,
                disabled,
                opacity,
            }))
    }

    async fn click(&self, handle: &ElementHandle) -> Result<()> {
        let mut state = self.lock();
        let index = state
            .resolve(&handle.token)
            .ok_or_else(|| DropError::Stale(handle.token.clone()))?;

        match index {
            UPLOAD_INDEX => {
                if state.upload_enabled() {
                    if let Some(file) = state.attached.clone() {
                        state.uploads.push(file);
                        state.remove_visible = true;
                    }
                }
            }
            REMOVE_INDEX => match state.remove_mode {
                RemoveMode::Works => {
                    state.removals += 1;
                    state.attached = None;
                    state.attached_stuck = false;
                    state.upload_inspections = 0;
                    state.remove_visible = false;
                }
                RemoveMode::ClickFails => {
                    return Err(DropError::Browser("click intercepted".to_string()));
                }
                RemoveMode::Sticky | RemoveMode::Disabled | RemoveMode::Missing => {}
            },
            _ => {}
        }
        Ok(())
    }

    async fn clear_file_input(&self, _selector: &str) -> Result<()> {
        let mut state = self.lock();
        state.attached = None;
        state.attached_stuck = false;
        state.upload_inspections = 0;
        Ok(())
    }

    async fn attach_file(&self, selector: &str, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if selector != state.input_selector || !state.form_visible() {
            return Err(DropError::NotFound(selector.to_string()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        state.attached_paths.push(path.to_path_buf());
        state.attached_stuck = state.take_stuck(&name);
        state.attached = Some(name);
        state.upload_inspections = 0;
        Ok(())
    }

    async fn attached_file_count(&self, _selector: &str) -> Result<usize> {
        let state = self.lock();
        Ok(match &state.attached {
            Some(file) if !state.unregistered_files.contains(file) => 1,
            _ => 0,
        })
    }

    async fn close(&self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}
