//! Browser control for imgdrop
//!
//! The runner only ever talks to a page through the [`PageDriver`] trait:
//! navigate, reload, query buttons, inspect and click a handle, fill the file
//! input. Two implementations exist:
//!
//! - [`BrowserSession`]: a real Chrome/Chromium tab over the DevTools Protocol
//! - [`MockPage`]: an in-memory upload form for tests
//!
//! # Example
//!
//! ```no_run
//! use imgdrop_browser::{locate, BrowserSession, ButtonQuery, PageDriver};
//! use imgdrop_core::BrowserOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = BrowserSession::launch_with_options(&BrowserOptions::default()).await?;
//!     session.navigate("https://example.com/analysis").await?;
//!
//!     let query = ButtonQuery::exact("Upload");
//!     match locate(&session, &query, None).await? {
//!         Some(handle) => session.click(&handle).await?,
//!         None => println!("no upload button on this page"),
//!     }
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`driver`]: the `PageDriver` trait and the values crossing it
//! - [`browser`]: Chrome session lifecycle
//! - [`mock`]: scriptable in-memory page
//! - [`locator`]: text-based button lookup and handle re-validation
//! - [`wait`]: bounded polls and element waits

pub mod browser;
pub mod driver;
pub mod error;
pub mod locator;
pub mod mock;
pub mod wait;

// Re-export commonly used types
pub use browser::BrowserSession;
pub use driver::{ButtonScope, ButtonSnapshot, ElementHandle, ElementKind, ElementState, PageDriver};
pub use error::{DropError, Result};
pub use locator::{is_present, locate, revalidate, ButtonQuery, HandleCache, HandleCheck, Landmark};
pub use mock::{MockPage, RemoveMode};
pub use wait::{poll_until, wait_for_element, PollPolicy, Wait};
