//! Browser error types - re-exports the unified DropError from imgdrop-core
//!
//! Browser failures use these variants:
//! - Browser(String) - launch, navigation, CDP and script evaluation failures
//! - NotFound(String) - a selector matched nothing where something was required
//! - Stale(String) - a handle no longer resolves to a live element
//! - Timeout { .. } - a bounded wait ran out

pub use imgdrop_core::{DropError, Result};
