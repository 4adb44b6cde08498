pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "buyline",
    about = "Buyline operator CLI",
    long_about = "Operate Buyline migrations, demo fixtures, config inspection, readiness checks, and order validation.",
    after_help = "Examples:\n  buyline doctor --json\n  buyline config\n  buyline validate nike_running_gear_q1"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset into the configured database")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run the six pre-approval checks against a stored order")]
    Validate {
        #[arg(help = "Media buy id, e.g. nike_running_gear_q1")]
        media_buy_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Validate { media_buy_id } => commands::validate::run(&media_buy_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
