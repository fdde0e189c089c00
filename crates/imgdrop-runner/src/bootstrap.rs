//! Session bootstrap: reach the upload page with a logged-in session

use crate::console::Console;
use crate::progress::{Category, ProgressLog};
use imgdrop_browser::{wait_for_element, PageDriver, Wait};
use imgdrop_core::{DropError, ImgdropConfig, Result};
use tracing::info;

/// How the session got past authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    /// The file input was already on the upload page
    AlreadyAuthenticated,
    /// A human logged in through the login page
    ManualLogin,
}

/// Navigate to the upload page and make sure the file input is there.
///
/// If the input does not show up within the ready timeout, the login page is
/// opened and the run blocks until a human confirms on the console. The
/// post-login wait is unbounded unless an auth timeout is configured. Any
/// failure to reach the input is fatal.
pub async fn bootstrap<D, C>(
    driver: &D,
    console: &mut C,
    config: &ImgdropConfig,
    progress: &ProgressLog,
) -> Result<Authentication>
where
    D: PageDriver + ?Sized,
    C: Console + ?Sized,
{
    let site = &config.site;
    let timing = &config.timing;
    let upload_url = site.upload_url();

    progress
        .info(Category::Setup, format!("Opening {}", upload_url))
        .await;
    driver.navigate(&upload_url).await?;

    match wait_for_element(
        driver,
        &site.input_selector,
        Wait::Within(timing.ready_timeout()),
        timing.poll_interval(),
    )
    .await
    {
        Ok(()) => {
            progress
                .ok(Category::Setup, "Upload form ready, session already logged in")
                .await;
            return Ok(Authentication::AlreadyAuthenticated);
        }
        Err(DropError::Timeout { .. }) => {}
        Err(e) => return Err(e),
    }

    let login_url = site.login_url();
    progress
        .warn(Category::Setup, format!("Not logged in, opening {}", login_url))
        .await;
    driver.navigate(&login_url).await?;

    console
        .prompt("Log in using the browser window, then press Enter to continue... ")
        .await?;

    info!("Login confirmed, returning to {}", upload_url);
    driver.navigate(&upload_url).await?;

    let wait = Wait::from(timing.auth_timeout());
    progress
        .info(Category::Setup, format!("Waiting for {}", site.input_selector))
        .await;
    wait_for_element(driver, &site.input_selector, wait, timing.poll_interval())
        .await
        .map_err(|e| match e {
            DropError::Timeout { waited, .. } => DropError::Fatal(format!(
                "Upload form never appeared after login (waited {:?})",
                waited
            )),
            other => other,
        })?;

    progress.ok(Category::Setup, "Upload form ready").await;
    Ok(Authentication::ManualLogin)
}
