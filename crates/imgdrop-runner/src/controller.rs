//! Retry controller - executes the state machine's actions
//!
//! Owns the ledger and the upload form for the whole run. Each action may
//! produce one follow-up event, which is fed back into [`transition`] until the
//! machine stops producing events.

use crate::cleanup::{cleanup, clear_leftover, CleanupOutcome};
use crate::console::Console;
use crate::form::UploadForm;
use crate::lister::source_root;
use crate::progress::{Category, ProgressLog};
use crate::state_machine::{transition, Action, Event, MenuChoice, State};
use crate::upload::upload_file;
use imgdrop_browser::PageDriver;
use imgdrop_core::{
    DropError, ImgdropConfig, Ledger, PassSummary, Result, RunExit, UploadOutcome, UploadQueue,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const MENU_PROMPT: &str = "Choose an option (1-3): ";
const FILE_PROMPT: &str = "File name to retry: ";

/// Final state of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit: RunExit,
    pub ledger: Ledger,
    pub passes: usize,
}

pub struct RetryController<'a, D: PageDriver + ?Sized, C: Console + ?Sized> {
    form: UploadForm<'a, D>,
    console: &'a mut C,
    progress: &'a ProgressLog,
    source_dir: PathBuf,
    ledger: Ledger,
    passes: usize,
}

impl<'a, D, C> RetryController<'a, D, C>
where
    D: PageDriver + ?Sized,
    C: Console + ?Sized,
{
    pub fn new(
        driver: &'a D,
        console: &'a mut C,
        config: &'a ImgdropConfig,
        progress: &'a ProgressLog,
    ) -> Self {
        Self {
            form: UploadForm::new(driver, config, progress),
            console,
            progress,
            source_dir: config.source.dir.clone(),
            ledger: Ledger::new(),
            passes: 0,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Process `queue`, then follow the menu until the run ends
    pub async fn run(mut self, queue: UploadQueue) -> Result<RunOutcome> {
        self.source_dir = source_root(&self.source_dir)?;
        debug!("Uploading from {}", self.source_dir.display());

        let mut state = State::Idle;
        let mut events = VecDeque::from([Event::Start { queue }]);

        while let Some(event) = events.pop_front() {
            debug!("Retry loop event: {:?}", event);
            let (next, actions) = transition(state, event);
            state = next;

            for action in actions {
                if let Some(event) = self.execute(action).await? {
                    events.push_back(event);
                }
            }
        }

        let exit = match state {
            State::Terminated { exit } => exit,
            State::PassComplete { ref failed, .. } if failed.is_empty() => RunExit::Completed,
            State::Failed { error } => return Err(DropError::Fatal(error)),
            other => {
                return Err(DropError::Fatal(format!(
                    "Retry loop stopped in state {:?}",
                    other
                )))
            }
        };

        info!("Run finished after {} passes ({:?})", self.passes, exit);
        Ok(RunOutcome {
            exit,
            ledger: self.ledger,
            passes: self.passes,
        })
    }

    async fn execute(&mut self, action: Action) -> Result<Option<Event>> {
        match action {
            Action::Log { message } => {
                self.progress.info(Category::Retry, message).await;
                Ok(None)
            }
            Action::ClearFailures { queue } => {
                self.ledger.begin_retry(&queue);
                Ok(None)
            }
            Action::RunPass { queue, pass } => {
                let summary = self.run_pass(&queue, pass).await?;
                Ok(Some(Event::PassFinished {
                    summary,
                    failed: self.ledger.failed_files(),
                }))
            }
            Action::ShowSummary { pass, summary } => {
                self.show_summary(pass, summary).await;
                Ok(None)
            }
            Action::PresentMenu { failed } => self.present_menu(&failed).await.map(Some),
            Action::CloseSession => {
                self.close_session().await;
                Ok(None)
            }
        }
    }

    /// Counts cover only the files this pass touched
    async fn run_pass(&mut self, queue: &UploadQueue, pass: usize) -> Result<PassSummary> {
        self.passes += 1;
        let total = queue.len();
        let mut summary = PassSummary::default();

        for (i, file) in queue.iter().enumerate() {
            self.progress
                .info(
                    Category::Files,
                    format!("Pass {} file {}/{}: {}", pass, i + 1, total, file),
                )
                .await;

            let outcome = self.process_file(file).await?;
            if outcome.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            self.ledger.record(file, outcome);
        }

        Ok(summary)
    }

    /// Pre-clean, upload, clean up. Recoverable errors become the file's failure.
    async fn process_file(&mut self, file: &str) -> Result<UploadOutcome> {
        if let Err(e) = clear_leftover(&mut self.form).await {
            if !e.is_recoverable() {
                return Err(e);
            }
            warn!("Could not clear leftover before {}: {}", file, e);
        }

        match upload_file(&mut self.form, &self.source_dir, file).await {
            Ok(()) => {
                match cleanup(&mut self.form).await {
                    Ok(CleanupOutcome::Removed) => debug!("Cleanup after {}: removed", file),
                    Ok(CleanupOutcome::Reset) => debug!("Cleanup after {}: page reset", file),
                    Err(e) => {
                        self.progress
                            .warn(Category::Cleanup, format!("Reset after {} failed: {}", file, e))
                            .await;
                    }
                }
                Ok(UploadOutcome::Succeeded)
            }
            Err(e) if e.is_recoverable() => {
                self.progress
                    .fail(Category::Upload, format!("{} failed: {}", file, e))
                    .await;
                if let Err(reset) = self.form.reset_form().await {
                    self.progress
                        .warn(Category::Cleanup, format!("Reset after {} failed: {}", file, reset))
                        .await;
                }
                Ok(UploadOutcome::failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn show_summary(&mut self, pass: usize, summary: PassSummary) {
        self.progress
            .info(
                Category::Summary,
                format!(
                    "Pass {}: {} succeeded, {} failed",
                    pass, summary.succeeded, summary.failed
                ),
            )
            .await;

        let totals = self.ledger.summary();
        self.progress
            .info(
                Category::Summary,
                format!(
                    "Run totals: {} succeeded, {} failed",
                    totals.succeeded, totals.failed
                ),
            )
            .await;

        for failure in self.ledger.failed() {
            self.progress
                .fail(
                    Category::Summary,
                    format!("{}: {}", failure.file, failure.reason),
                )
                .await;
        }
    }

    async fn present_menu(&mut self, failed: &[String]) -> Result<Event> {
        self.console.say("");
        self.console.say(&format!("{} files failed:", failed.len()));
        for file in failed {
            self.console.say(&format!("  {}", file));
        }
        self.console.say("1. Retry all failed uploads");
        self.console.say("2. Terminate");
        self.console.say("3. Retry one file");

        let choice = self.console.prompt(MENU_PROMPT).await?;
        let event = match choice.as_str() {
            "1" => Event::Menu(MenuChoice::RetryAll),
            "2" => Event::Menu(MenuChoice::Terminate),
            "3" => {
                let file = self.console.prompt(FILE_PROMPT).await?;
                Event::Menu(MenuChoice::RetryOne(file))
            }
            _ => Event::InvalidChoice { input: choice },
        };
        Ok(event)
    }

    async fn close_session(&mut self) {
        self.progress.info(Category::Setup, "Closing browser").await;
        if let Err(e) = self.form.driver().close().await {
            warn!("Failed to close browser session: {}", e);
        }
    }
}
