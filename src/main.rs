use clap::Parser;
use std::process::ExitCode;

use ridepay::config::Cli;
use ridepay::csv::{read_commands, write_accounts};
use ridepay::{Engine, InMemoryStore, Ledger, Store};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.input.extension().is_none_or(|ext| ext != "csv") {
        warn!(path = %cli.input.display(), "input file seems to not be a csv file");
    }

    let commands = match read_commands(cli.input.clone()) {
        Ok(commands) => commands,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let engine = Engine::new(InMemoryStore::new()).with_config(cli.settlement_config());
    let (command_sender, command_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in commands {
            match result {
                Ok(command) => {
                    if command_sender.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    engine.run(ReceiverStream::new(command_receiver)).await;

    for overdue in engine.overdue_penalties().await {
        warn!(
            driver = %overdue.driver,
            amount = %overdue.amount,
            deadline = %overdue.deadline,
            "penalty overdue"
        );
    }

    let (accounts, commission) = engine
        .store()
        .read(|ledger| {
            let accounts: Vec<_> = ledger.accounts().into_iter().cloned().collect();
            (accounts, ledger.platform_commission())
        })
        .await;
    info!(commission = %commission, "platform commission collected");

    if let Err(e) = write_accounts(std::io::stdout().lock(), &accounts) {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
