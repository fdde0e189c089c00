//! Text-based button lookup and handle re-validation
//!
//! Absence is an ordinary outcome here: lookups return `Ok(None)`, and a
//! handle that no longer resolves is reported as [`HandleCheck::Stale`].

use crate::driver::{ButtonScope, ButtonSnapshot, ElementHandle, ElementState, PageDriver};
use crate::error::Result;
use tracing::debug;

/// Glyphs that mark a close/remove control with no readable text
const CLOSE_GLYPHS: [&str; 3] = ["×", "✕", "✖"];

/// What a button's visible text must look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonQuery {
    /// Preferred exact (trimmed) text
    pub exact: String,
    /// Case-insensitive substrings accepted when no exact match exists
    pub synonyms: Vec<String>,
    /// Accept a close glyph as a last resort
    pub close_glyphs: bool,
}

impl ButtonQuery {
    pub fn exact(text: impl Into<String>) -> Self {
        Self {
            exact: text.into(),
            synonyms: Vec::new(),
            close_glyphs: false,
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_close_glyphs(mut self) -> Self {
        self.close_glyphs = true;
        self
    }

    pub fn matches_exact(&self, text: &str) -> bool {
        text.trim() == self.exact
    }

    fn matches_synonym(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.synonyms
            .iter()
            .any(|s| lower.contains(&s.to_lowercase()))
    }

    fn matches_glyph(&self, text: &str) -> bool {
        self.close_glyphs && CLOSE_GLYPHS.iter().any(|g| text.contains(g))
    }

    /// Pick the best button: exact text, then synonym, then close glyph
    pub fn select<'a>(&self, buttons: &'a [ButtonSnapshot]) -> Option<&'a ButtonSnapshot> {
        buttons
            .iter()
            .find(|b| self.matches_exact(&b.text))
            .or_else(|| buttons.iter().find(|b| self.matches_synonym(&b.text)))
            .or_else(|| buttons.iter().find(|b| self.matches_glyph(&b.text)))
    }

    /// Whether any button on the list would be selected
    pub fn any_match(&self, buttons: &[ButtonSnapshot]) -> bool {
        self.select(buttons).is_some()
    }
}

/// Heading used to disambiguate between several similar controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landmark {
    pub selector: String,
    pub text: String,
    /// Ancestor levels to walk up, starting from the heading's parent
    pub depth: usize,
}

impl Landmark {
    pub fn new(selector: impl Into<String>, text: impl Into<String>, depth: usize) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
            depth,
        }
    }

    fn scope(&self, depth: usize) -> ButtonScope {
        ButtonScope::Landmark {
            selector: self.selector.clone(),
            text: self.text.clone(),
            depth,
        }
    }
}

/// Find the first button matching `query`.
///
/// With a landmark, each ancestor level is searched for an exact match, then
/// the outermost container for a synonym match. Without a landmark, or when the
/// landmark yields nothing, the whole document is searched.
pub async fn locate<D>(
    driver: &D,
    query: &ButtonQuery,
    landmark: Option<&Landmark>,
) -> Result<Option<ElementHandle>>
where
    D: PageDriver + ?Sized,
{
    if let Some(landmark) = landmark {
        let mut outermost: Option<Vec<ButtonSnapshot>> = None;

        for depth in 1..=landmark.depth.max(1) {
            let Some(buttons) = driver.list_buttons(&landmark.scope(depth)).await? else {
                break;
            };
            if let Some(button) = buttons.iter().find(|b| query.matches_exact(&b.text)) {
                debug!("Found '{}' near landmark at depth {}", query.exact, depth);
                return Ok(Some(button.handle.clone()));
            }
            outermost = Some(buttons);
        }

        if let Some(button) = outermost.as_deref().and_then(|b| query.select(b)) {
            return Ok(Some(button.handle.clone()));
        }

        debug!(
            "Landmark '{}' gave no match for '{}', searching whole document",
            landmark.text, query.exact
        );
    }

    let buttons = driver
        .list_buttons(&ButtonScope::Document)
        .await?
        .unwrap_or_default();

    Ok(query.select(&buttons).map(|b| b.handle.clone()))
}

/// Whether `query` currently matches anything in the document
pub async fn is_present<D>(driver: &D, query: &ButtonQuery) -> Result<bool>
where
    D: PageDriver + ?Sized,
{
    let buttons = driver
        .list_buttons(&ButtonScope::Document)
        .await?
        .unwrap_or_default();
    Ok(query.any_match(&buttons))
}

/// Outcome of re-checking a handle before use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleCheck {
    /// Attached and of the expected kind
    Valid(ElementState),
    Stale,
}

/// Re-check that `handle` is still attached and still the expected kind of element
pub async fn revalidate<D>(driver: &D, handle: &ElementHandle) -> Result<HandleCheck>
where
    D: PageDriver + ?Sized,
{
    match driver.inspect(handle).await? {
        Some(state)
            if state.attached && state.tag.eq_ignore_ascii_case(handle.kind.tag_name()) =>
        {
            Ok(HandleCheck::Valid(state))
        }
        _ => Ok(HandleCheck::Stale),
    }
}

/// Handle kept across files, re-checked before every use
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HandleCache {
    #[default]
    NeedsLookup,
    Cached(ElementHandle),
}

impl HandleCache {
    /// Forget the handle; the next use performs a fresh lookup
    pub fn invalidate(&mut self) {
        *self = Self::NeedsLookup;
    }

    pub fn get(&self) -> Option<&ElementHandle> {
        match self {
            Self::Cached(handle) => Some(handle),
            Self::NeedsLookup => None,
        }
    }

    /// Return the cached handle if it still validates, otherwise look it up again
    pub async fn resolve<D>(
        &mut self,
        driver: &D,
        query: &ButtonQuery,
        landmark: Option<&Landmark>,
    ) -> Result<Option<ElementHandle>>
    where
        D: PageDriver + ?Sized,
    {
        if let Self::Cached(handle) = self {
            match revalidate(driver, handle).await? {
                HandleCheck::Valid(_) => {
                    debug!("Using cached handle {}", handle.token);
                    return Ok(Some(handle.clone()));
                }
                HandleCheck::Stale => {
                    debug!("Cached handle {} is stale, looking up again", handle.token);
                    self.invalidate();
                }
            }
        }

        let found = locate(driver, query, landmark).await?;
        if let Some(handle) = &found {
            *self = Self::Cached(handle.clone());
        }
        Ok(found)
    }
}
