//! imgdrop CLI - bulk image upload through a browser form
//!
//! Usage:
//!   imgdrop run                 Log in if needed, upload every image, offer retries
//!   imgdrop list                Show the files that would be uploaded
//!   imgdrop init                Write a default imgdrop.toml

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use imgdrop_browser::{BrowserSession, PageDriver};
use imgdrop_core::{ImgdropConfig, RunReport};
use imgdrop_runner::{build_queue, run_session, ProgressLog, StdConsole};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "imgdrop")]
#[command(author, version, about = "Upload a folder of images through a website's upload form")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./imgdrop.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload every image in the source directory
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Write a JSON run report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Append progress lines to this file
        #[arg(long, value_name = "FILE")]
        log_file: Option<PathBuf>,
    },

    /// List the files that would be uploaded
    List {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Write the default configuration file
    Init {
        /// Destination
        #[arg(default_value = "imgdrop.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Command-line values that take precedence over the config file
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Source directory
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Site base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Attach to a running Chrome through its DevTools websocket URL
    #[arg(long, value_name = "WS_URL")]
    connect: Option<String>,

    /// Chrome/Chromium binary
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Chrome profile directory (reuses its cookies)
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut ImgdropConfig) {
        if let Some(dir) = self.dir {
            config.source.dir = dir;
        }
        if let Some(base_url) = self.base_url {
            config.site.base_url = base_url;
        }
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(url) = self.connect {
            config.browser.connect_url = Some(url);
        }
        if let Some(path) = self.chrome_path {
            config.browser.chrome_path = Some(path);
        }
        if let Some(dir) = self.user_data_dir {
            config.browser.user_data_dir = Some(dir);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
    }

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match cli.command {
        Commands::Run {
            overrides,
            report,
            log_file,
        } => cmd_run(cli.config.as_deref(), overrides, report, log_file).await,
        Commands::List { overrides } => cmd_list(cli.config.as_deref(), overrides),
        Commands::Init { path, force } => cmd_init(&path, force),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<ImgdropConfig> {
    let mut config = ImgdropConfig::load(path).context("Failed to load configuration")?;
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_run(
    config_path: Option<&Path>,
    overrides: Overrides,
    report: Option<PathBuf>,
    log_file: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = load_config(config_path, overrides)?;

    let mut progress = ProgressLog::new();
    if let Some(path) = log_file {
        progress = progress.with_log_file(path);
    }

    let started_at = Utc::now();
    let session = BrowserSession::open(&config.browser)
        .await
        .context("Failed to start browser")?;
    let mut console = StdConsole::new();

    let (queue, outcome) = match run_session(&session, &mut console, &config, &progress).await {
        Ok(done) => done,
        Err(e) => {
            if let Err(close) = session.close().await {
                warn!("Failed to close browser session: {}", close);
            }
            return Err(e).context("Upload run aborted");
        }
    };

    println!();
    println!("{}", "Run summary".bold());
    println!("{}", "─".repeat(60));
    for file in outcome.ledger.succeeded() {
        println!("  {} {}", "✓".green(), file);
    }
    for failure in outcome.ledger.failed() {
        println!("  {} {} ({})", "✗".red(), failure.file, failure.reason.bright_black());
    }
    let summary = outcome.ledger.summary();
    println!(
        "{} succeeded, {} failed, {} queued",
        summary.succeeded.to_string().green(),
        summary.failed.to_string().red(),
        queue.len()
    );

    if let Some(path) = report {
        let report = RunReport::new(
            started_at,
            outcome.passes,
            queue.len(),
            &outcome.ledger,
            outcome.exit,
        );
        report
            .write_to(&path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(ExitCode::from(outcome.exit.code()))
}

fn cmd_list(config_path: Option<&Path>, overrides: Overrides) -> Result<ExitCode> {
    let config = load_config(config_path, overrides)?;
    let queue = build_queue(&config.source)?;

    println!(
        "{} files in {}",
        queue.len().to_string().bold(),
        config.source.dir.display()
    );
    for file in queue.iter() {
        println!("  {}", file);
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_init(path: &Path, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    ImgdropConfig::write_default(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());

    Ok(ExitCode::SUCCESS)
}
