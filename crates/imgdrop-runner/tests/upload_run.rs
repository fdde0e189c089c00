//! End-to-end runs against the in-memory page

use imgdrop_browser::{MockPage, PageDriver, RemoveMode};
use imgdrop_core::{DropError, ImgdropConfig, RunExit, RunReport};
use imgdrop_runner::{run_session, ProgressLog, ScriptedConsole};
use std::path::PathBuf;
use tempfile::TempDir;

fn source_dir(files: &[&str]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for file in files {
        std::fs::write(temp.path().join(file), b"image").unwrap();
    }
    temp
}

fn fast_config(dir: &TempDir) -> ImgdropConfig {
    let mut config = ImgdropConfig::default();
    config.source.dir = dir.path().to_path_buf();
    config.timing.ready_timeout_ms = 5;
    config.timing.auth_timeout_ms = Some(20);
    config.timing.poll_interval_ms = 1;
    config.timing.attach_timeout_ms = 5;
    config.timing.button_appear_timeout_ms = 5;
    config.timing.max_enable_polls = 3;
    config.timing.removal_confirm_timeout_ms = 5;
    config.timing.reload_timeout_ms = 5;
    config.timing.settle_ms = 0;
    config
}

fn logged_in() -> MockPage {
    MockPage::new().authenticated(true)
}

#[tokio::test]
async fn test_all_files_succeed() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in();
    let mut console = ScriptedConsole::default();

    let (queue, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(queue.files(), &["a.jpg".to_string(), "b.png".to_string()]);
    assert_eq!(outcome.exit, RunExit::Completed);
    assert_eq!(outcome.ledger.succeeded().len(), 2);
    assert!(outcome.ledger.failed().is_empty());
    assert_eq!(outcome.passes, 1);
    assert_eq!(page.uploads(), vec!["a.jpg".to_string(), "b.png".to_string()]);
    assert!(page.is_closed());
    assert!(console.prompts().is_empty());
}

#[tokio::test]
async fn test_enable_timeout_then_terminate() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in().with_stuck_file("a.jpg");
    let mut console = ScriptedConsole::new(["2"]);

    let (queue, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    let summary = outcome.ledger.summary();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total(), queue.len());
    assert_eq!(outcome.ledger.failed_files(), vec!["a.jpg".to_string()]);
    assert!(outcome.ledger.failed()[0].reason.contains("Timed out"));

    // Menu offered once, terminate closes without another pass
    assert_eq!(console.prompts().len(), 1);
    assert!(console.output().iter().any(|l| l.contains("Retry all")));
    assert_eq!(outcome.exit, RunExit::Completed);
    assert_eq!(outcome.passes, 1);
    assert_eq!(page.uploads(), vec!["b.png".to_string()]);
    assert!(page.is_closed());
}

#[tokio::test]
async fn test_retry_all_recovers_flaky_file() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in().with_flaky_file("a.jpg", 1);
    let mut console = ScriptedConsole::new(["1"]);

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.exit, RunExit::Completed);
    assert_eq!(outcome.passes, 2);
    assert!(outcome.ledger.failed().is_empty());
    assert_eq!(
        outcome.ledger.succeeded(),
        &["b.png".to_string(), "a.jpg".to_string()]
    );
    assert_eq!(page.uploads(), vec!["b.png".to_string(), "a.jpg".to_string()]);
}

#[tokio::test]
async fn test_retry_all_keeps_failing_file_failed() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in().with_stuck_file("a.jpg");
    let mut console = ScriptedConsole::new(["1", "2"]);

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.passes, 2);
    assert_eq!(console.prompts().len(), 2);
    assert_eq!(outcome.ledger.failed_files(), vec!["a.jpg".to_string()]);
    assert!(!outcome.ledger.succeeded().contains(&"a.jpg".to_string()));
}

#[tokio::test]
async fn test_retry_one_valid_file() {
    let dir = source_dir(&["a.jpg", "b.png", "c.jpg"]);
    let config = fast_config(&dir);
    let page = logged_in()
        .with_flaky_file("a.jpg", 1)
        .with_stuck_file("c.jpg");
    let mut console = ScriptedConsole::new(["3", "a.jpg", "2"]);

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.passes, 2);
    assert_eq!(outcome.ledger.failed_files(), vec!["c.jpg".to_string()]);
    assert!(outcome.ledger.succeeded().contains(&"a.jpg".to_string()));
    assert_eq!(outcome.exit, RunExit::Completed);
}

#[tokio::test]
async fn test_retry_one_unknown_file_exits_non_zero() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in().with_stuck_file("a.jpg");
    let mut console = ScriptedConsole::new(["3", "b.png"]);

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.exit, RunExit::InvalidInput);
    assert_ne!(outcome.exit.code(), 0);
    assert_eq!(outcome.passes, 1);
    assert_eq!(outcome.ledger.failed_files(), vec!["a.jpg".to_string()]);
    assert_eq!(outcome.ledger.succeeded(), &["b.png".to_string()]);
    assert!(page.is_closed());
}

#[tokio::test]
async fn test_invalid_menu_choice_exits_non_zero() {
    let dir = source_dir(&["a.jpg"]);
    let config = fast_config(&dir);
    let page = logged_in().with_stuck_file("a.jpg");
    let mut console = ScriptedConsole::new(["7"]);

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.exit, RunExit::InvalidInput);
    assert_eq!(console.prompts().len(), 1);
}

#[tokio::test]
async fn test_forced_cleanup_failure_leaves_input_present() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in().with_remove_mode(RemoveMode::Sticky);
    let mut console = ScriptedConsole::default();

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.ledger.succeeded().len(), 2);
    assert_eq!(page.reload_count(), 2);
    assert!(page.element_exists("#file-upload").await.unwrap());
}

#[tokio::test]
async fn test_lost_input_fails_remaining_files_without_aborting() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in()
        .with_remove_mode(RemoveMode::Missing)
        .lose_input_on_reload();
    let mut console = ScriptedConsole::new(["2"]);

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.ledger.succeeded(), &["a.jpg".to_string()]);
    assert_eq!(outcome.ledger.failed_files(), vec!["b.png".to_string()]);
}

#[tokio::test]
async fn test_leftover_is_cleared_before_first_upload() {
    let dir = source_dir(&["a.jpg"]);
    let config = fast_config(&dir);
    let page = logged_in();
    let mut console = ScriptedConsole::default();
    let progress = ProgressLog::new().quiet();
    imgdrop_runner::bootstrap(&page, &mut console, &config, &progress)
        .await
        .unwrap();

    // Bootstrap navigation resets the form, so the leftover goes in afterwards
    page.leave_leftover("old.jpg");

    let outcome = imgdrop_runner::RetryController::new(&page, &mut console, &config, &progress)
        .run(imgdrop_runner::build_queue(&config.source).unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.ledger.succeeded(), &["a.jpg".to_string()]);
    assert_eq!(page.removal_count(), 2);
    assert_eq!(page.uploads(), vec!["a.jpg".to_string()]);
}

#[tokio::test]
async fn test_manual_login_then_upload() {
    let dir = source_dir(&["a.jpg"]);
    let config = fast_config(&dir);
    let page = MockPage::new();
    let mut console = ScriptedConsole::new([""]);

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.exit, RunExit::Completed);
    assert!(page.navigations().contains(&page.login_url()));
    assert_eq!(page.uploads(), vec!["a.jpg".to_string()]);
}

#[tokio::test]
async fn test_empty_source_directory_is_fatal() {
    let dir = source_dir(&["notes.txt"]);
    let config = fast_config(&dir);
    let page = logged_in();
    let mut console = ScriptedConsole::default();

    let err = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap_err();
    assert!(matches!(err, DropError::Fatal(_)));
    assert!(page.uploads().is_empty());
}

#[tokio::test]
async fn test_report_reflects_ledger() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in().with_stuck_file("b.png");
    let mut console = ScriptedConsole::new(["2"]);
    let started = chrono::Utc::now();

    let (queue, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    let report = RunReport::new(started, outcome.passes, queue.len(), &outcome.ledger, outcome.exit);
    let path = dir.path().join("report.json");
    report.write_to(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["queued"], 2);
    assert_eq!(json["succeeded"][0], "a.jpg");
    assert_eq!(json["failed"][0]["file"], "b.png");
    assert_eq!(json["exit"], "completed");
}

#[tokio::test]
async fn test_unrelated_clear_button_is_never_clicked() {
    let dir = source_dir(&["a.jpg", "b.png"]);
    let config = fast_config(&dir);
    let page = logged_in().with_extra_button("Clear history");
    let mut console = ScriptedConsole::default();

    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.ledger.succeeded().len(), 2);
    assert_eq!(page.removal_count(), 2);
    assert_eq!(page.reload_count(), 0);
}

#[tokio::test]
async fn test_relative_source_dir_attaches_absolute_paths() {
    let temp = TempDir::new_in(".").unwrap();
    std::fs::write(temp.path().join("a.jpg"), b"image").unwrap();
    let mut config = fast_config(&temp);
    config.source.dir = PathBuf::from(temp.path().file_name().unwrap());
    assert!(config.source.dir.is_relative());

    let page = logged_in();
    let mut console = ScriptedConsole::default();
    let (_, outcome) = run_session(&page, &mut console, &config, &ProgressLog::new().quiet())
        .await
        .unwrap();

    assert_eq!(outcome.ledger.succeeded(), &["a.jpg".to_string()]);
    let paths = page.attached_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].is_absolute());
    assert!(paths[0].ends_with("a.jpg"));
}
