//! Upload step: attach one file and trigger the upload button

use crate::form::UploadForm;
use crate::progress::Category;
use imgdrop_browser::{poll_until, revalidate, ElementHandle, HandleCheck, PageDriver, PollPolicy};
use imgdrop_core::{DropError, Result};
use std::path::Path;
use tracing::debug;

/// Attach `dir/file`, wait for the input to register it, wait for the upload
/// button to enable, click it.
///
/// Every stage is bounded. The first stage that fails returns its error; the
/// caller turns that into the file's failure reason.
pub async fn upload_file<D>(form: &mut UploadForm<'_, D>, dir: &Path, file: &str) -> Result<()>
where
    D: PageDriver + ?Sized,
{
    let driver = form.driver;
    let progress = form.progress;
    let timing = form.timing;
    let site = form.site;
    let selector = site.input_selector.as_str();
    let interval = timing.poll_interval();

    if !driver.element_exists(selector).await? {
        return Err(DropError::NotFound(selector.to_string()));
    }

    progress.info(Category::Upload, format!("Attaching {}", file)).await;
    driver.clear_file_input(selector).await?;
    driver.attach_file(selector, &dir.join(file)).await?;

    let policy = PollPolicy::within(timing.attach_timeout(), interval);
    poll_until(policy, "file input to register the file", |attempt| async move {
        let count = driver.attached_file_count(selector).await?;
        if count == 0 {
            progress
                .attempt(Category::Upload, "Waiting for file input", attempt, policy.max_attempts)
                .await;
        }
        Ok::<_, DropError>((count > 0).then_some(()))
    })
    .await?;

    let mut button = find_upload_button(form).await?;

    let opacity = site.disabled_opacity.as_str();
    let policy = PollPolicy::new(interval, timing.max_enable_polls);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match revalidate(driver, &button).await? {
            HandleCheck::Valid(state) if state.is_enabled(opacity) => break,
            HandleCheck::Valid(_) => {
                progress
                    .attempt(
                        Category::Upload,
                        "Waiting for Upload to enable",
                        attempt,
                        policy.max_attempts,
                    )
                    .await;
            }
            HandleCheck::Stale => {
                debug!("Upload button {} went stale, looking it up again", button.token);
                form.upload_button.invalidate();
                button = find_upload_button(form).await?;
            }
        }

        if attempt >= policy.max_attempts {
            return Err(DropError::timeout("upload button to enable", policy.ceiling()));
        }
        tokio::time::sleep(policy.interval).await;
    }

    driver.click(&button).await?;
    tokio::time::sleep(timing.settle()).await;

    progress.ok(Category::Upload, format!("{} uploaded", file)).await;
    Ok(())
}

/// Cached upload button if it still validates, otherwise poll for a fresh one
async fn find_upload_button<D>(form: &mut UploadForm<'_, D>) -> Result<ElementHandle>
where
    D: PageDriver + ?Sized,
{
    let query = form.upload_query();
    let landmark = form.landmark();
    let policy = PollPolicy::within(
        form.timing.button_appear_timeout(),
        form.timing.poll_interval(),
    );

    for attempt in 1..=policy.max_attempts {
        if let Some(handle) = form
            .upload_button
            .resolve(form.driver, &query, landmark.as_ref())
            .await?
        {
            return Ok(handle);
        }

        form.progress
            .attempt(
                Category::Upload,
                format!("Looking for '{}' button", query.exact),
                attempt,
                policy.max_attempts,
            )
            .await;

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(DropError::timeout(
        format!("'{}' button", query.exact),
        policy.ceiling(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressLog;
    use imgdrop_browser::{HandleCache, MockPage};
    use imgdrop_core::ImgdropConfig;

    fn fast_config() -> ImgdropConfig {
        let mut config = ImgdropConfig::default();
        config.timing.poll_interval_ms = 1;
        config.timing.attach_timeout_ms = 5;
        config.timing.button_appear_timeout_ms = 5;
        config.timing.max_enable_polls = 5;
        config.timing.settle_ms = 0;
        config
    }

    async fn ready_page(page: MockPage) -> MockPage {
        let page = page.authenticated(true);
        page.navigate(&page.upload_url()).await.unwrap();
        page
    }

    #[tokio::test]
    async fn test_upload_clicks_enabled_button() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = ready_page(MockPage::new().enable_after_polls(2)).await;

        let mut form = UploadForm::new(&page, &config, &progress);
        upload_file(&mut form, Path::new("/photos"), "a.jpg").await.unwrap();

        assert_eq!(page.uploads(), vec!["a.jpg".to_string()]);
        assert!(matches!(form.upload_button(), HandleCache::Cached(_)));
    }

    #[tokio::test]
    async fn test_button_never_enabling_times_out() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = ready_page(MockPage::new().with_stuck_file("a.jpg")).await;

        let mut form = UploadForm::new(&page, &config, &progress);
        let err = upload_file(&mut form, Path::new("/photos"), "a.jpg")
            .await
            .unwrap_err();

        assert!(matches!(err, DropError::Timeout { .. }));
        assert!(page.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_file_times_out() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = ready_page(MockPage::new().with_unregistered_file("a.jpg")).await;

        let mut form = UploadForm::new(&page, &config, &progress);
        let err = upload_file(&mut form, Path::new("/photos"), "a.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, DropError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_input_is_not_found() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = MockPage::new();

        let mut form = UploadForm::new(&page, &config, &progress);
        let err = upload_file(&mut form, Path::new("/photos"), "a.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, DropError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stale_cached_button_is_looked_up_again() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = ready_page(MockPage::new()).await;

        let mut form = UploadForm::new(&page, &config, &progress);
        upload_file(&mut form, Path::new("/photos"), "a.jpg").await.unwrap();
        let first = form.upload_button().get().cloned().unwrap();

        // A reload behind the form's back detaches the cached handle
        page.reload().await.unwrap();
        upload_file(&mut form, Path::new("/photos"), "b.png").await.unwrap();
        let second = form.upload_button().get().cloned().unwrap();

        assert_ne!(first, second);
        assert_eq!(page.uploads(), vec!["a.jpg".to_string(), "b.png".to_string()]);
    }

    #[tokio::test]
    async fn test_rerender_while_waiting_to_enable_finds_button_again() {
        let config = fast_config();
        let progress = ProgressLog::new().quiet();
        let page = ready_page(MockPage::new().rerender_on_inspect(1)).await;

        let mut form = UploadForm::new(&page, &config, &progress);
        upload_file(&mut form, Path::new("/photos"), "a.jpg").await.unwrap();

        assert_eq!(page.uploads(), vec!["a.jpg".to_string()]);
        assert_eq!(page.reload_count(), 0);
        let cached = form.upload_button().get().cloned().unwrap();
        assert_eq!(cached.token, "g2-b0");
    }
}
