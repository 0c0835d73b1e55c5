pub mod amount;
pub mod config;
pub mod csv;
pub mod engine;
pub mod fare;
pub mod gateway;
pub mod model;
pub mod store;

pub use amount::Amount;
pub use engine::Engine;
pub use fare::FareSplit;
pub use model::{AccountId, Command, PaymentMethod, RideId, Role, TransactionId};
pub use store::{InMemoryStore, Ledger, Store};
