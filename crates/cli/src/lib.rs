pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::simulate::SimulateOptions;

#[derive(Debug, Parser)]
#[command(
    name = "brewline",
    about = "Brewline operator CLI",
    long_about = "Inspect configuration and replay recorded turns against a local inventory.",
    after_help = concat!(
        "Examples:\n",
        "  brewline config\n",
        "  brewline simulate --inventory seed.json --turns turns.json --atomic"
    )
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Replay a JSON array of nlu responses against a fresh cart and inventory")]
    Simulate {
        #[arg(long, help = "Inventory seed document (category -> item -> bool|count)")]
        inventory: PathBuf,
        #[arg(long, help = "JSON array of nlu message responses, replayed in order")]
        turns: PathBuf,
        #[arg(long, help = "Reject an order without decrementing anything when any item is short")]
        atomic: bool,
        #[arg(long, help = "Minutes quoted for provide_id turns (default 10)")]
        wait_time: Option<u32>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Simulate { inventory, turns, atomic, wait_time } => {
            commands::simulate::run(SimulateOptions {
                inventory_path: &inventory,
                turns_path: &turns,
                atomic,
                wait_time_minutes: wait_time,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
