//! Directory service entry point.
//!
//! # Responsibility
//! - Parse the command line, initialize logging, load configuration from
//!   the environment and dispatch to the listener or the backfill.
//!
//! # Invariants
//! - All failures reach the user as one line on stderr and a non-zero
//!   exit code, never a panic backtrace.

use clap::{Parser, Subcommand};
use log::info;
use shiplist_core::{default_log_level, init_logging};
use shiplist_service::{run_backfill, run_webhook_listener, BackfillOptions, Config};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "shiplist", about = "Community project directory service")]
struct Cli {
    /// Log level: error, warn, info, debug or trace.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write rotated log files into this directory instead of stdout.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the webhook listener until interrupted.
    Serve,
    /// Rebuild the directory from historical posts.
    Backfill {
        /// Category ids to crawl. Repeatable.
        #[arg(long = "category", required = true)]
        categories: Vec<u64>,

        /// Publish the result as a new pinned wiki topic in this category.
        /// Without it the rendered document goes to stdout.
        #[arg(long)]
        create_topic_in: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(message) = init_logging(level, cli.log_dir.as_deref()) {
        eprintln!("shiplist: {message}");
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("shiplist: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    let config = Config::from_env().map_err(|err| err.to_string())?;

    match command {
        Command::Serve => {
            info!("event=serve_started module=cli forum_url={}", config.forum_url);
            run_webhook_listener(&config).map_err(|err| err.to_string())
        }
        Command::Backfill {
            categories,
            create_topic_in,
        } => {
            let options = BackfillOptions {
                categories,
                create_topic_in,
            };
            let report = run_backfill(&config, &options).map_err(|err| err.to_string())?;
            info!(
                "event=backfill_done module=cli members={} added={}",
                report.members,
                report.added.len()
            );
            match report.created {
                Some((topic_id, post_id)) => {
                    println!("published directory: topic_id={topic_id} post_id={post_id}");
                }
                None => print!("{}", report.rendered),
            }
            Ok(())
        }
    }
}
