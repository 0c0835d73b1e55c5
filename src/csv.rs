use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::Amount;
use crate::model::{AccountId, Command, PaymentMethod, RideId, Role, UnknownPaymentMethod};
use crate::store::Account;

/// Errors that can occur when reading commands or writing accounts
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open command file: {0}")]
    Open(csv::Error),

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized command type '{command}'")]
    UnrecognizedType { line: usize, command: String },

    #[error("line {line}: {command} missing {field}")]
    MissingField {
        line: usize,
        command: String,
        field: &'static str,
    },

    #[error("line {line}: {command} has invalid amount {value}")]
    InvalidAmount {
        line: usize,
        command: String,
        value: f64,
    },

    #[error("line {line}: {source}")]
    UnknownMethod {
        line: usize,
        source: UnknownPaymentMethod,
    },

    #[error("failed to write accounts: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush accounts: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    account: AccountId,
    ride: Option<RideId>,
    amount: Option<f64>,
    method: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    account: AccountId,
    role: &'static str,
    balance: String,
    earnings: String,
    pending_penalty: String,
    penalty_deadline: String,
}

/// Read settlement commands from a csv file
pub fn read_commands(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Command, CsvError>>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(CsvError::Open)?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        }))
}

fn parse_row(line: usize, row: InputRow) -> Result<Command, CsvError> {
    let command = row.r#type.as_str();
    let missing = |field| CsvError::MissingField {
        line,
        command: command.to_string(),
        field,
    };
    // non-finite or out of range values never reach the engine
    let amount = || -> Result<Amount, CsvError> {
        let value = row.amount.ok_or_else(|| missing("amount"))?;
        Amount::try_from_float(value).ok_or_else(|| CsvError::InvalidAmount {
            line,
            command: command.to_string(),
            value,
        })
    };

    match command {
        "open_rider" => Ok(Command::OpenAccount {
            account: row.account,
            role: Role::Rider,
        }),
        "open_driver" => Ok(Command::OpenAccount {
            account: row.account,
            role: Role::Driver,
        }),
        "top_up" => {
            let amount = amount()?;
            let method = row
                .method
                .ok_or_else(|| missing("method"))?
                .parse::<PaymentMethod>()
                .map_err(|source| CsvError::UnknownMethod { line, source })?;
            Ok(Command::TopUp {
                account: row.account,
                amount,
                method,
            })
        }
        "issue_token" => Ok(Command::IssueToken {
            rider: row.account,
            ride: row.ride.ok_or_else(|| missing("ride"))?,
            amount: amount()?,
            code: row.code,
        }),
        "cash_ride" => Ok(Command::CashRide {
            driver: row.account,
            ride: row.ride.ok_or_else(|| missing("ride"))?,
            amount: amount()?,
        }),
        "qr_payment" => Ok(Command::QrPayment {
            driver: row.account,
            code: row.code.ok_or_else(|| missing("code"))?,
        }),
        "pay_penalty" => Ok(Command::PayPenalty {
            driver: row.account,
        }),
        other => Err(CsvError::UnrecognizedType {
            line,
            command: other.to_string(),
        }),
    }
}

/// Write account snapshots in csv format
pub fn write_accounts<'a>(
    writer: impl io::Write,
    accounts: impl IntoIterator<Item = &'a Account>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for account in accounts {
        let row = OutputRow {
            account: account.id(),
            role: account.role().as_str(),
            balance: account.balance().to_string(),
            earnings: account.earnings().to_string(),
            pending_penalty: account.pending_penalty().to_string(),
            penalty_deadline: account
                .penalty_deadline()
                .map(|deadline| deadline.to_rfc3339())
                .unwrap_or_default(),
        };
        writer.serialize(&row)?;
    }

    writer.flush()?;
    Ok(())
}
