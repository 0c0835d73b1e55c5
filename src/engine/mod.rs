//! Ride settlement engine.
//!
//! The engine turns ride payments into ledger movements: the platform
//! commission on cash rides, QR token settlement, wallet top-ups and penalty
//! payments. Every operation runs as one unit of work against the injected
//! [`Store`], then signals the dashboard views it made stale. [`Engine::run`]
//! drives the same operations from a stream of [`Command`]s.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt};
use tracing::info;

use crate::Amount;
use crate::config::SettlementConfig;
use crate::gateway::{PaymentGateway, StubGateway};
use crate::model::{AccountId, Command, Notification, Role};
use crate::store::{Ledger, Store, StoreError};

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

mod commission;
pub use commission::CommissionOutcome;

mod error;
pub use error::{
    CommissionError, IssueTokenError, PenaltyError, QrPaymentError, SettlementError, TopUpError,
};

mod invalidation;
pub use invalidation::{Invalidations, View};

mod penalty;
pub use penalty::{OverduePenalty, PenaltyReceipt};

mod qr;
pub use qr::QrReceipt;

mod wallet;
pub use wallet::TopUpReceipt;

/// The settlement engine.
///
/// Holds no ledger state of its own; everything lives in the store, so one
/// engine can serve concurrent requests behind an `Arc`.
pub struct Engine<S, G = StubGateway> {
    store: S,
    gateway: G,
    clock: Arc<dyn Clock>,
    config: SettlementConfig,
    invalidations: Invalidations,
}

/// What a driver sees on their dashboard.
#[derive(Debug, Clone)]
pub struct DriverDashboard {
    pub driver: AccountId,
    pub balance: Amount,
    pub earnings: Amount,
    pub pending_penalty: Amount,
    pub penalty_deadline: Option<DateTime<Utc>>,
    pub penalty_overdue: bool,
    pub notifications: Vec<Notification>,
}

impl<S: Store> Engine<S> {
    /// Engine with the stub payment gateway and the system clock.
    pub fn new(store: S) -> Self {
        Self::with_gateway(store, StubGateway)
    }
}

/// Public API
impl<S: Store, G: PaymentGateway> Engine<S, G> {
    pub fn with_gateway(store: S, gateway: G) -> Self {
        Self {
            store,
            gateway,
            clock: Arc::new(SystemClock),
            config: SettlementConfig::default(),
            invalidations: Invalidations::default(),
        }
    }

    pub fn with_config(mut self, config: SettlementConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Listen for dashboard views made stale by settlements.
    pub fn subscribe(&self) -> broadcast::Receiver<View> {
        self.invalidations.subscribe()
    }

    /// Run the engine with the given command stream
    pub async fn run(&self, mut stream: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = stream.next().await {
            // any error should not stop the engine, so we just ignore the application result
            let _ = self.apply(command).await;
        }
    }

    /// Apply a single command on top of the current ledger
    pub async fn apply(&self, command: Command) -> Result<(), SettlementError> {
        match command {
            Command::OpenAccount { account, role } => {
                let result = self.open_account(account, role).await;
                log_result("open account", account, None, &result);
                result?;
            }
            Command::TopUp {
                account,
                amount,
                method,
            } => {
                let result = self.top_up_wallet(account, amount, method).await;
                log_result("top-up", account, Some(amount), &result);
                result?;
            }
            Command::IssueToken {
                rider,
                ride,
                amount,
                code,
            } => {
                let result = self.issue_payment_token(rider, ride, amount, code).await;
                log_result("token issue", rider, Some(amount), &result);
                result?;
            }
            Command::CashRide {
                driver,
                ride,
                amount,
            } => {
                let result = self.settle_cash_commission(driver, ride, amount).await;
                log_result("cash commission", driver, Some(amount), &result);
                result?;
            }
            Command::QrPayment { driver, code } => {
                let result = self.settle_qr_payment(&code, driver).await;
                let amount = result.as_ref().ok().map(|receipt| receipt.amount);
                log_result("qr payment", driver, amount, &result);
                result?;
            }
            Command::PayPenalty { driver } => {
                let result = self.pay_penalty(driver).await;
                let amount = result.as_ref().ok().map(|receipt| receipt.amount);
                log_result("penalty payment", driver, amount, &result);
                result?;
            }
        }
        Ok(())
    }

    pub async fn open_account(&self, account: AccountId, role: Role) -> Result<(), StoreError> {
        self.store
            .atomically(|ledger| ledger.open_account(account, role))
            .await
    }

    pub async fn driver_dashboard(&self, driver: AccountId) -> Result<DriverDashboard, StoreError> {
        let now = self.now();
        self.store
            .read(|ledger| {
                let account = ledger.account(driver)?;
                if !account.is_driver() {
                    return Err(StoreError::NotADriver(driver));
                }
                Ok(DriverDashboard {
                    driver,
                    balance: account.balance(),
                    earnings: account.earnings(),
                    pending_penalty: account.pending_penalty(),
                    penalty_deadline: account.penalty_deadline(),
                    penalty_overdue: account.penalty_overdue(now),
                    notifications: ledger.notifications(driver).into_iter().cloned().collect(),
                })
            })
            .await
    }
}

/// Private API
impl<S: Store, G: PaymentGateway> Engine<S, G> {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Small helper to log `apply` results
fn log_result<T, E: std::fmt::Display>(
    operation: &str,
    account: AccountId,
    amount: Option<Amount>,
    result: &Result<T, E>,
) {
    match (result, amount) {
        (Ok(_), Some(amt)) => {
            info!(account = %account, amount = %amt, "{operation} applied");
        }
        (Ok(_), None) => {
            info!(account = %account, "{operation} applied");
        }
        (Err(e), Some(amt)) => {
            info!(account = %account, amount = %amt, reason = %e, "{operation} skipped");
        }
        (Err(e), None) => {
            info!(account = %account, reason = %e, "{operation} skipped");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    use super::{Engine, ManualClock};
    use crate::Amount;
    use crate::model::{AccountId, PaymentMethod, Role};
    use crate::store::{Account, InMemoryStore, Ledger, Store};

    pub const RIDER: AccountId = 1;
    pub const DRIVER: AccountId = 2;
    pub const OTHER_DRIVER: AccountId = 3;

    pub fn amount(value: f64) -> Amount {
        Amount::from_float(value)
    }

    pub fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    /// Engine on a manual clock with one rider and two drivers opened.
    pub async fn engine() -> (Engine<InMemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let engine = Engine::new(InMemoryStore::new()).with_clock(clock.clone());
        engine.open_account(RIDER, Role::Rider).await.unwrap();
        engine.open_account(DRIVER, Role::Driver).await.unwrap();
        engine.open_account(OTHER_DRIVER, Role::Driver).await.unwrap();
        (engine, clock)
    }

    pub async fn fund(engine: &Engine<InMemoryStore>, account: AccountId, value: f64) {
        engine
            .top_up_wallet(account, amount(value), PaymentMethod::Card)
            .await
            .unwrap();
    }

    pub async fn account(engine: &Engine<InMemoryStore>, id: AccountId) -> Account {
        engine
            .store()
            .read(|ledger| ledger.account(id).cloned())
            .await
            .unwrap()
    }

    pub async fn platform_commission(engine: &Engine<InMemoryStore>) -> Amount {
        engine
            .store()
            .read(|ledger| ledger.platform_commission())
            .await
    }
}
