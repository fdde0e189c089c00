//! # imgdrop-core
//!
//! Core types for imgdrop, a browser-driven bulk image uploader.
//!
//! - [`UploadQueue`] is the ordered list of files built from the source directory
//! - [`Ledger`] records per-file outcomes across passes
//! - [`ImgdropConfig`] holds site selectors, browser options and poll constants
//! - [`DropError`] is the single error type shared by every crate

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::{BrowserOptions, ImgdropConfig, SiteConfig, SourceConfig, TimingConfig};
pub use error::{DropError, Result};
pub use types::*;
