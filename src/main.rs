mod account;
mod bank;
mod secret;
mod shell;

use bank::Bank;
use clap::{Parser, Subcommand};
use shell::Shell;
use std::{
    io::{self, IsTerminal},
    path::PathBuf,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Console banking simulator")]
struct Args {
    /// File the accounts are loaded from and saved to
    #[arg(long, env = "TELLER_DATA_FILE", default_value = "accounts.json")]
    data_file: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every registered account as CSV
    Accounts,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut bank = Bank::new();
    bank.load(&args.data_file)?;
    info!(
        accounts = bank.list_accounts().len(),
        next = bank.next_account_number(),
        "registry ready"
    );

    match args.command {
        Some(Command::Accounts) => bank.write_accounts_csv(io::stdout())?,
        None => {
            let stdin = io::stdin();
            let mask_secrets = stdin.is_terminal();
            Shell::new(
                &mut bank,
                args.data_file,
                stdin.lock(),
                io::stdout(),
                mask_secrets,
            )
            .run()?;
        }
    }

    Ok(())
}
