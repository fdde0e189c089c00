//! Cleanup step: put the form back to its empty state after an upload

use crate::form::UploadForm;
use crate::progress::Category;
use imgdrop_browser::{
    is_present, locate, poll_until, revalidate, HandleCheck, PageDriver, PollPolicy,
};
use imgdrop_core::{DropError, Result};
use tracing::debug;

/// How the form was cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The remove control was clicked and disappeared
    Removed,
    /// The page was reloaded
    Reset,
}

/// Click the remove control, falling back to a page reload.
///
/// Only errors when the reload itself fails to bring the file input back.
pub async fn cleanup<D>(form: &mut UploadForm<'_, D>) -> Result<CleanupOutcome>
where
    D: PageDriver + ?Sized,
{
    match remove_attached(form).await {
        Ok(true) => {
            form.progress.ok(Category::Cleanup, "File removed").await;
            return Ok(CleanupOutcome::Removed);
        }
        Ok(false) => {
            form.progress
                .warn(Category::Cleanup, "No remove control found")
                .await;
        }
        Err(e) => {
            form.progress
                .warn(Category::Cleanup, format!("Remove failed: {}", e))
                .await;
        }
    }

    form.reset_form().await?;
    Ok(CleanupOutcome::Reset)
}

/// Run [`cleanup`] if a remove control from an earlier attempt is still on the page.
///
/// Only the exact remove text counts here; unrelated "clear" or "delete"
/// buttons elsewhere on the page are not a leftover.
pub async fn clear_leftover<D>(form: &mut UploadForm<'_, D>) -> Result<Option<CleanupOutcome>>
where
    D: PageDriver + ?Sized,
{
    if !is_present(form.driver, &form.exact_remove_query()).await? {
        return Ok(None);
    }

    form.progress
        .info(Category::Cleanup, "Leftover file on the form, clearing it first")
        .await;
    cleanup(form).await.map(Some)
}

/// `Ok(false)` when there is no remove control to click
async fn remove_attached<D>(form: &UploadForm<'_, D>) -> Result<bool>
where
    D: PageDriver + ?Sized,
{
    let driver = form.driver;
    let progress = form.progress;
    let timing = form.timing;
    let opacity = form.site.disabled_opacity.as_str();
    let query = form.remove_query();
    let landmark = form.landmark();

    let Some(handle) = locate(driver, &query, landmark.as_ref()).await? else {
        return Ok(false);
    };
    debug!("Remove control found: {}", handle.token);

    let policy = PollPolicy::within(timing.removal_confirm_timeout(), timing.poll_interval());
    let button = &handle;
    poll_until(policy, "remove control to enable", |attempt| async move {
        match revalidate(driver, button).await? {
            HandleCheck::Valid(state) if state.is_enabled(opacity) => {
                Ok::<_, DropError>(Some(()))
            }
            HandleCheck::Valid(_) => {
                progress
                    .attempt(
                        Category::Cleanup,
                        "Waiting for remove control to enable",
                        attempt,
                        policy.max_attempts,
                    )
                    .await;
                Ok(None)
            }
            HandleCheck::Stale => Err(DropError::Stale(button.token.clone())),
        }
    })
    .await?;

    driver.click(&handle).await?;

    // Gone means the clicked control detached and no exact remove control replaced it
    let exact = &form.exact_remove_query();
    poll_until(policy, "remove control to disappear", |attempt| async move {
        let gone = revalidate(driver, button).await? == HandleCheck::Stale
            && !is_present(driver, exact).await?;
        if !gone {
            progress
                .attempt(
                    Category::Cleanup,
                    "Confirming removal",
                    attempt,
                    policy.max_attempts,
                )
                .await;
        }
        Ok::<_, DropError>(gone.then_some(()))
    })
    .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressLog;
    use crate::upload::upload_file;
    use imgdrop_browser::{HandleCache, MockPage, RemoveMode};
    use imgdrop_core::ImgdropConfig;
    use std::path::Path;

    fn fast_config() -> ImgdropConfig {
        let mut config = ImgdropConfig::default();
        config.timing.poll_interval_ms = 1;
        config.timing.attach_timeout_ms = 5;
        config.timing.button_appear_timeout_ms = 5;
        config.timing.max_enable_polls = 5;
        config.timing.removal_confirm_timeout_ms = 5;
        config.timing.reload_timeout_ms = 5;
        config.timing.settle_ms = 0;
        config
    }

    async fn uploaded(mode: RemoveMode) -> MockPage {
        let page = MockPage::new().authenticated(true).with_remove_mode(mode);
        page.navigate(&page.upload_url()).await.unwrap();
        page
    }

    #[tokio::test]
    async fn test_remove_control_clears_form() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = uploaded(RemoveMode::Works).await;

        let mut form = UploadForm::new(&page, &config, &progress);
        upload_file(&mut form, Path::new("."), "a.jpg").await.unwrap();

        let outcome = cleanup(&mut form).await.unwrap();
        assert_eq!(outcome, CleanupOutcome::Removed);
        assert_eq!(page.removal_count(), 1);
        assert_eq!(page.reload_count(), 0);
        assert!(page.attached().is_none());
    }

    #[tokio::test]
    async fn test_falls_back_to_reload() {
        for mode in [
            RemoveMode::Missing,
            RemoveMode::Sticky,
            RemoveMode::ClickFails,
            RemoveMode::Disabled,
        ] {
            let config = fast_config();
            let progress = ProgressLog::new().quiet();
            let page = uploaded(mode).await;

            let mut form = UploadForm::new(&page, &config, &progress);
            upload_file(&mut form, Path::new("."), "a.jpg").await.unwrap();

            let outcome = cleanup(&mut form).await.unwrap();
            assert_eq!(outcome, CleanupOutcome::Reset, "mode {:?}", mode);
            assert_eq!(page.reload_count(), 1, "mode {:?}", mode);
            assert!(page.element_exists("#file-upload").await.unwrap());
            assert_eq!(form.upload_button(), &HandleCache::NeedsLookup);
        }
    }

    #[tokio::test]
    async fn test_cleanup_on_clean_page_reloads_harmlessly() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = uploaded(RemoveMode::Works).await;

        let mut form = UploadForm::new(&page, &config, &progress);
        assert_eq!(cleanup(&mut form).await.unwrap(), CleanupOutcome::Reset);
        assert!(page.element_exists("#file-upload").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_reset_is_reported() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = uploaded(RemoveMode::Missing).await.lose_input_on_reload();

        let mut form = UploadForm::new(&page, &config, &progress);
        assert!(cleanup(&mut form).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_leftover() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = uploaded(RemoveMode::Works).await;

        let mut form = UploadForm::new(&page, &config, &progress);
        assert_eq!(clear_leftover(&mut form).await.unwrap(), None);

        page.leave_leftover("old.jpg");
        assert_eq!(
            clear_leftover(&mut form).await.unwrap(),
            Some(CleanupOutcome::Removed)
        );
        assert!(page.attached().is_none());
    }

    #[tokio::test]
    async fn test_unrelated_clear_button_is_not_a_leftover() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = uploaded(RemoveMode::Works)
            .await
            .with_extra_button("Clear history");

        let mut form = UploadForm::new(&page, &config, &progress);
        assert_eq!(clear_leftover(&mut form).await.unwrap(), None);
        assert_eq!(page.reload_count(), 0);
    }

    #[tokio::test]
    async fn test_removal_confirmed_despite_unrelated_clear_button() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = uploaded(RemoveMode::Works)
            .await
            .with_extra_button("Clear history");

        let mut form = UploadForm::new(&page, &config, &progress);
        upload_file(&mut form, Path::new("."), "a.jpg").await.unwrap();

        assert_eq!(cleanup(&mut form).await.unwrap(), CleanupOutcome::Removed);
        assert_eq!(page.removal_count(), 1);
        assert_eq!(page.reload_count(), 0);
    }
}
