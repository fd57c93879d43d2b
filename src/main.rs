// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;
mod init;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use ralph_config::{AgentKind, CliOverrides, TrackerProvider};
use ralph_session::{archive, lock, ProcessController, SessionPaths};
use ralph_template::TemplateError;
use ralph_tui::{App, AppOptions};

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code(&err)
        }
    };
    std::process::exit(code);
}

/// Exit codes: 0 normal, 1 generic, 2 missing template include, 3 template
/// I/O failure.  The harness relies on 2 to tell "fix your prompt" apart
/// from everything else.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<TemplateError>()
        .map(TemplateError::exit_code)
        .unwrap_or(1)
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let is_tui = cli.command.is_none();
    init_logging(cli.verbose, is_tui);

    if let Some(command) = &cli.command {
        match command {
            Commands::Init {
                agent,
                provider,
                dry_run,
                force,
            } => {
                let agent = parse_enum::<AgentKind>(agent.as_deref())?;
                let provider = parse_enum::<TrackerProvider>(provider.as_deref())?;
                let root = std::env::current_dir().context("resolving working directory")?;
                return init::run(&root, agent, provider, *dry_run, *force);
            }
            Commands::Completions { shell } => {
                cli::print_completions(*shell);
                return Ok(());
            }
        }
    }

    run_tui(cli).await
}

fn parse_enum<T>(value: Option<&str>) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .map(|s| s.parse::<T>().map_err(anyhow::Error::msg))
        .transpose()
}

/// In TUI mode tracing output written to stderr corrupts the ratatui
/// display, so logging is suppressed there unless RALPH_LOG_FILE points at a
/// sink.  Subcommands log to stderr, gated by --verbose / RUST_LOG.
fn init_logging(verbose: u8, is_tui: bool) {
    if is_tui {
        if let Ok(log_path) = std::env::var("RALPH_LOG_FILE") {
            use std::sync::Mutex;
            if let Ok(file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
            {
                let filter = EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("debug"));
                let _ = tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_ansi(false)
                            .with_writer(Mutex::new(file)),
                    )
                    .with(filter)
                    .try_init();
                return;
            }
        }
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::filter::LevelFilter::OFF)
            .try_init();
        return;
    }

    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn is_tty() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

async fn run_tui(cli: Cli) -> anyhow::Result<()> {
    if !is_tty() {
        anyhow::bail!("ralph needs a terminal (stdin is not a TTY)");
    }

    let project_root = std::env::current_dir().context("resolving working directory")?;
    let overrides = CliOverrides {
        sidebar: cli.sidebar_override(),
        agent: parse_enum::<AgentKind>(cli.agent.as_deref())?,
        issue: cli.issue.clone(),
    };
    let config = Arc::new(ralph_config::load(&project_root, &overrides)?);

    let mut paths = SessionPaths::new(&project_root, &config);
    if let Some(file) = &cli.file {
        paths.set_live_log(file.clone());
    }

    // Roll the previous session into the archive, but never while a live
    // harness is appending to it, and never in watch-only mode.
    if !cli.watch {
        if !lock::is_running_live(paths.lock()) {
            archive::archive_live_log(&paths)?;
        }
        archive::ensure_live_log(&paths)?;
    }

    let controller = ProcessController::new(config.clone(), paths.clone());
    let tail = ralph_stream::spawn_tailer(
        paths.live_log().to_path_buf(),
        Duration::from_millis(config.process.tail_poll_ms),
    );

    // Restore the terminal before printing a panic; otherwise raw mode +
    // alternate screen leave the shell garbled.
    {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            ratatui::restore();
            original_hook(info);
        }));
    }

    let terminal = ratatui::init();
    let result = App::new(
        config,
        controller,
        tail,
        AppOptions {
            watch_only: cli.watch,
        },
    )
    .run(terminal)
    .await;
    ratatui::restore();
    result
}
