//! Page driver abstraction (allows a mock page in tests)

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Attribute stamped on every listed element so a handle can find it again
pub const HANDLE_ATTRIBUTE: &str = "data-imgdrop-handle";

/// Kind of control a handle is expected to point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Button,
}

impl ElementKind {
    /// Upper-case DOM tag name
    pub fn tag_name(&self) -> &'static str {
        match self {
            Self::Button => "BUTTON",
        }
    }
}

/// Opaque, possibly stale reference to an element on the page.
///
/// Holds the token written into [`HANDLE_ATTRIBUTE`] when the element was
/// listed. A reload wipes the attribute, so old handles stop resolving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub token: String,
    pub kind: ElementKind,
}

impl ElementHandle {
    pub fn button(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind: ElementKind::Button,
        }
    }

    /// CSS selector resolving this handle on the live page
    pub fn selector(&self) -> String {
        format!("[{}=\"{}\"]", HANDLE_ATTRIBUTE, self.token)
    }
}

/// A button as seen when listing the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSnapshot {
    pub handle: ElementHandle,
    /// Trimmed text content
    pub text: String,
    pub disabled: bool,
    /// Computed style opacity, as the browser reports it
    pub opacity: String,
}

/// Live state of the element behind a handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Upper-case tag name
    pub tag: String,
    /// Still contained in `document.body`
    pub attached: bool,
    pub disabled: bool,
    pub opacity: String,
}

impl ElementState {
    /// Enabled means neither disabled nor rendered at the site's disabled opacity
    pub fn is_enabled(&self, disabled_opacity: &str) -> bool {
        !self.disabled && self.opacity != disabled_opacity
    }
}

/// Where to list buttons from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonScope {
    /// Every button in the document
    Document,
    /// Buttons inside the `depth`-th ancestor of the first heading matching
    /// `selector` whose text contains `text` (depth 1 is the parent)
    Landmark {
        selector: String,
        text: String,
        depth: usize,
    },
}

/// The capability set the runner needs from a browser page
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the navigation to settle
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the current page
    async fn reload(&self) -> Result<()>;

    /// Whether `selector` currently matches an element
    async fn element_exists(&self, selector: &str) -> Result<bool>;

    /// List buttons in `scope`.
    ///
    /// `None` means the scope itself does not exist (no landmark heading, or
    /// fewer ancestors than `depth`).
    async fn list_buttons(&self, scope: &ButtonScope) -> Result<Option<Vec<ButtonSnapshot>>>;

    /// Current state of the element behind `handle`, `None` if nothing carries its token
    async fn inspect(&self, handle: &ElementHandle) -> Result<Option<ElementState>>;

    /// Click the element behind `handle`
    async fn click(&self, handle: &ElementHandle) -> Result<()>;

    /// Reset the value of the file input
    async fn clear_file_input(&self, selector: &str) -> Result<()>;

    /// Set `path` as the file input's selected file
    async fn attach_file(&self, selector: &str, path: &Path) -> Result<()>;

    /// Length of the file input's `files` list
    async fn attached_file_count(&self, selector: &str) -> Result<usize>;

    /// Close the page
    async fn close(&self) -> Result<()>;
}
