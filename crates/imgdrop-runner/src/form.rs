//! The upload form as the runner sees it: one page, its selectors, and the
//! cached upload-button handle

use crate::progress::{Category, ProgressLog};
use imgdrop_browser::{wait_for_element, ButtonQuery, HandleCache, Landmark, PageDriver, Wait};
use imgdrop_core::{DropError, ImgdropConfig, Result, SiteConfig, TimingConfig};

pub struct UploadForm<'a, D: PageDriver + ?Sized> {
    pub(crate) driver: &'a D,
    pub(crate) site: &'a SiteConfig,
    pub(crate) timing: &'a TimingConfig,
    pub(crate) progress: &'a ProgressLog,
    pub(crate) upload_button: HandleCache,
}

impl<'a, D: PageDriver + ?Sized> UploadForm<'a, D> {
    pub fn new(driver: &'a D, config: &'a ImgdropConfig, progress: &'a ProgressLog) -> Self {
        Self {
            driver,
            site: &config.site,
            timing: &config.timing,
            progress,
            upload_button: HandleCache::default(),
        }
    }

    pub fn driver(&self) -> &'a D {
        self.driver
    }

    /// Cached upload-button handle, if one is held
    pub fn upload_button(&self) -> &HandleCache {
        &self.upload_button
    }

    pub(crate) fn upload_query(&self) -> ButtonQuery {
        ButtonQuery::exact(self.site.upload_button_text.clone())
    }

    pub(crate) fn remove_query(&self) -> ButtonQuery {
        self.exact_remove_query()
            .with_synonyms(self.site.remove_synonyms.iter().cloned())
            .with_close_glyphs()
    }

    /// Remove control by its exact text only, for presence checks
    pub(crate) fn exact_remove_query(&self) -> ButtonQuery {
        ButtonQuery::exact(self.site.remove_button_text.clone())
    }

    /// Landmark scoping, off when the configured text is unset or empty
    pub(crate) fn landmark(&self) -> Option<Landmark> {
        let text = self.site.landmark_text.as_ref().filter(|t| !t.is_empty());
        text.map(|text| {
            Landmark::new(
                self.site.landmark_selector.clone(),
                text.clone(),
                self.site.landmark_depth,
            )
        })
    }

    /// Reload the page and wait for the file input to come back.
    ///
    /// Safe to call on a clean page. Always drops the cached upload-button
    /// handle since the reload detaches it.
    pub async fn reset_form(&mut self) -> Result<()> {
        self.upload_button.invalidate();
        self.progress
            .info(Category::Cleanup, "Reloading page to reset the form")
            .await;

        self.driver.reload().await?;

        let timeout = self.timing.reload_timeout();
        wait_for_element(
            self.driver,
            &self.site.input_selector,
            Wait::Within(timeout),
            self.timing.poll_interval(),
        )
        .await
        .map_err(|e| match e {
            DropError::Timeout { .. } => DropError::NotFound(format!(
                "{} did not come back after reload",
                self.site.input_selector
            )),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgdrop_browser::MockPage;

    #[tokio::test]
    async fn test_reset_form_is_idempotent() {
        let config = ImgdropConfig::default();
        let progress = ProgressLog::new().quiet();
        let page = MockPage::new().authenticated(true);
        page.navigate(&page.upload_url()).await.unwrap();

        let mut form = UploadForm::new(&page, &config, &progress);
        form.reset_form().await.unwrap();
        form.reset_form().await.unwrap();

        assert_eq!(page.reload_count(), 2);
        assert!(page.element_exists("#file-upload").await.unwrap());
        assert_eq!(form.upload_button(), &HandleCache::NeedsLookup);
    }

    #[tokio::test]
    async fn test_reset_form_reports_missing_input() {
        let mut config = ImgdropConfig::default();
        config.timing.reload_timeout_ms = 5;
        config.timing.poll_interval_ms = 1;
        let progress = ProgressLog::new().quiet();
        let page = MockPage::new().authenticated(true).lose_input_on_reload();
        page.navigate(&page.upload_url()).await.unwrap();

        let mut form = UploadForm::new(&page, &config, &progress);
        let err = form.reset_form().await.unwrap_err();
        assert!(matches!(err, DropError::NotFound(_)));
    }

    #[test]
    fn test_landmark_follows_site_config() {
        let mut config = ImgdropConfig::default();
        let progress = ProgressLog::new().quiet();
        let page = MockPage::new();

        let form = UploadForm::new(&page, &config, &progress);
        let landmark = form.landmark().unwrap();
        assert_eq!(landmark.text, "Upload Your Document");
        assert_eq!(landmark.depth, 3);

        config.site.landmark_text = None;
        let form = UploadForm::new(&page, &config, &progress);
        assert!(form.landmark().is_none());

        config.site.landmark_text = Some(String::new());
        let form = UploadForm::new(&page, &config, &progress);
        assert!(form.landmark().is_none());
    }
}
