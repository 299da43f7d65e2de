use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod retry;

#[derive(Parser)]
#[command(name = "monowatch")]
#[command(about = "Board game memory watcher and event reconciler", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Attach to the emulator and reconcile game events until Ctrl-C
    Watch {
        #[arg(short, long, default_value = "watch.toml")]
        config: PathBuf,
        /// Overrides the layout path from the config
        #[arg(short, long)]
        layout: Option<PathBuf>,
        #[arg(short, long, env = "MONOWATCH_PID")]
        pid: Option<u32>,
        /// Play turns with the decision engine instead of only watching
        #[arg(long)]
        drive: bool,
    },
    /// Run one scan over an address range and print the matches
    Scan {
        #[arg(short, long, env = "MONOWATCH_PID")]
        pid: u32,
        #[arg(short, long, default_value = "layout.json")]
        layout: PathBuf,
        /// Hex bytes with `??` wildcards, or text with --text
        #[arg(long)]
        pattern: String,
        #[arg(long)]
        text: bool,
        #[arg(long, value_parser = parse_address)]
        start: u64,
        #[arg(long, value_parser = parse_address)]
        end: u64,
    },
    /// Print the event feed of a persisted snapshot
    Feed {
        #[arg(short, long, default_value = "context/game_context.json")]
        snapshot: PathBuf,
    },
    /// Print a layout file to fill in
    LayoutTemplate {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_address(raw: &str) -> std::result::Result<u64, String> {
    monowatch::parse_address(raw).map_err(|e| format!("invalid address '{}': {}", raw, e))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("monowatch=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Watch { config, layout, pid, drive } => {
            commands::watch::run(&config, layout, pid, drive)
        }
        Command::Scan {
            pid,
            layout,
            pattern,
            text,
            start,
            end,
        } => commands::scan::run(pid, &layout, &pattern, text, start, end),
        Command::Feed { snapshot } => commands::feed::run(&snapshot),
        Command::LayoutTemplate { output } => commands::layout_template::run(output.as_deref()),
    }
}
