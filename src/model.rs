//! Core domain types for ride settlement.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::Amount;

/// Rider or driver account identifier.
pub type AccountId = u32;

/// Ride identifier.
pub type RideId = u64;

/// Ledger transaction identifier, assigned by the store.
pub type TransactionId = u64;

/// What an account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Rider,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rider => "rider",
            Role::Driver => "driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown payment method '{0}'")]
pub struct UnknownPaymentMethod(pub String);

/// How money entered or moved inside the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Card,
    QrCode,
    Cash,
    /// Internal debit from the account's own wallet.
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::QrCode => "qr_code",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the externally accepted methods parse; `wallet` is internal.
impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "qr_code" => Ok(PaymentMethod::QrCode),
            "cash" => Ok(PaymentMethod::Cash),
            other => Err(UnknownPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Rider paid a driver by QR code.
    RidePayment,
    /// Commission owed on a ride the rider paid in cash.
    CashCommission,
    WalletTopUp,
    /// Driver cleared accrued penalties from their wallet.
    PenaltyPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Completed,
    /// Recorded, but the money has not moved yet (deferred commission).
    Pending,
}

/// Fields of a transaction before the store assigns it an id.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub ride: Option<RideId>,
    pub rider: Option<AccountId>,
    pub driver: Option<AccountId>,
    pub amount: Amount,
    pub commission: Amount,
    pub driver_earnings: Amount,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    /// Payment token code or gateway capture reference.
    pub reference: Option<String>,
}

/// Immutable audit row for a money movement.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub recorded_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub ride: Option<RideId>,
    pub rider: Option<AccountId>,
    pub driver: Option<AccountId>,
    pub amount: Amount,
    pub commission: Amount,
    pub driver_earnings: Amount,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub reference: Option<String>,
}

impl Transaction {
    pub fn record(id: TransactionId, recorded_at: DateTime<Utc>, new: NewTransaction) -> Self {
        Self {
            id,
            recorded_at,
            kind: new.kind,
            ride: new.ride,
            rider: new.rider,
            driver: new.driver,
            amount: new.amount,
            commission: new.commission,
            driver_earnings: new.driver_earnings,
            method: new.method,
            status: new.status,
            reference: new.reference,
        }
    }
}

/// Single-use QR payment credential for one ride.
#[derive(Debug, Clone)]
pub struct PaymentToken {
    pub code: String,
    pub ride: RideId,
    pub rider: AccountId,
    pub amount: Amount,
    pub expires_at: DateTime<Utc>,
    /// Driver that consumed the token, set exactly once.
    pub used_by: Option<AccountId>,
    pub transaction: Option<TransactionId>,
}

impl PaymentToken {
    pub fn new(
        code: String,
        ride: RideId,
        rider: AccountId,
        amount: Amount,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            ride,
            rider,
            amount,
            expires_at,
            used_by: None,
            transaction: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used_by.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

/// Inbox message addressed to one account.
#[derive(Debug, Clone)]
pub struct Notification {
    pub account: AccountId,
    pub title: String,
    pub body: String,
    pub severity: Severity,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        account: AccountId,
        severity: Severity,
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account,
            title: title.into(),
            body: body.into(),
            severity,
            metadata: None,
            created_at,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A command representing the possible inputs of the engine.
#[derive(Debug, Clone)]
pub enum Command {
    OpenAccount {
        account: AccountId,
        role: Role,
    },
    /// Credit a wallet through the payment gateway.
    TopUp {
        account: AccountId,
        amount: Amount,
        method: PaymentMethod,
    },
    /// Create a QR payment token for a ride.
    IssueToken {
        rider: AccountId,
        ride: RideId,
        amount: Amount,
        code: Option<String>,
    },
    /// Settle the platform commission on a completed cash ride.
    CashRide {
        driver: AccountId,
        ride: RideId,
        amount: Amount,
    },
    /// Settle a ride by consuming a scanned QR token.
    QrPayment { driver: AccountId, code: String },
    /// Pay off accrued commission penalties.
    PayPenalty { driver: AccountId },
}
