pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "normbot",
    about = "Normbot operator CLI",
    long_about = "Operate Normbot migrations, readiness checks, config inspection, and caller accounts.",
    after_help = "Examples:\n  normbot doctor --json\n  normbot config\n  normbot account 123456\n  normbot grant 123456 --payment-ref pay-42"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM credential, DB connectivity, and migration state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show usage and premium status for a caller")]
    Account {
        #[arg(help = "External caller identifier (Telegram id)")]
        id: String,
    },
    #[command(about = "Grant one premium period to a caller, extending any active window")]
    Grant {
        #[arg(help = "External caller identifier (Telegram id)")]
        id: String,
        #[arg(long, help = "Payment reference recorded on the account")]
        payment_ref: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Account { id } => commands::account::status(&id),
        Command::Grant { id, payment_ref } => commands::account::grant(&id, payment_ref.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
