//! # imgdrop-runner
//!
//! The upload run: bootstrap the session, list the source directory, then
//! push every file through the upload and cleanup steps under the retry
//! controller.
//!
//! ## Architecture
//!
//! - [`lister`]: source directory to [`UploadQueue`]
//! - [`bootstrap`]: reach the upload page, waiting for a manual login if needed
//! - [`form`]: the page, its selectors and the cached upload-button handle
//! - [`upload`] / [`cleanup`]: one file in, form back to empty
//! - [`state_machine`]: pure retry-loop transitions
//! - [`controller`]: executes the transitions against a page and a console
//! - [`console`] / [`progress`]: human input and progress output

pub mod bootstrap;
pub mod cleanup;
pub mod console;
pub mod controller;
pub mod form;
pub mod lister;
pub mod progress;
pub mod state_machine;
pub mod upload;

pub use bootstrap::{bootstrap, Authentication};
pub use cleanup::{cleanup, clear_leftover, CleanupOutcome};
pub use console::{Console, ScriptedConsole, StdConsole};
pub use controller::{RetryController, RunOutcome};
pub use form::UploadForm;
pub use lister::{build_queue, list_images, source_root};
pub use progress::{Category, ProgressEntry, ProgressLog, Status};
pub use state_machine::{transition, Action, Event, MenuChoice, State};
pub use upload::upload_file;

use imgdrop_browser::PageDriver;
use imgdrop_core::{ImgdropConfig, Result, UploadQueue};

/// Bootstrap, build the queue, and run the retry controller to the end
pub async fn run_session<D, C>(
    driver: &D,
    console: &mut C,
    config: &ImgdropConfig,
    progress: &ProgressLog,
) -> Result<(UploadQueue, RunOutcome)>
where
    D: PageDriver + ?Sized,
    C: Console + ?Sized,
{
    bootstrap(driver, console, config, progress).await?;

    let queue = build_queue(&config.source)?;
    progress
        .info(
            Category::Files,
            format!("{} files queued from {}", queue.len(), config.source.dir.display()),
        )
        .await;

    let outcome = RetryController::new(driver, console, config, progress)
        .run(queue.clone())
        .await?;
    Ok((queue, outcome))
}
