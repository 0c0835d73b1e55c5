//! External payment capture for wallet top-ups.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::Amount;
use crate::model::{AccountId, PaymentMethod};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Proof that the gateway captured funds.
#[derive(Debug, Clone)]
pub struct CaptureReceipt {
    pub reference: String,
}

/// Captures money from a card, QR wallet or cash desk before it is credited.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn capture(
        &self,
        account: AccountId,
        amount: Amount,
        method: PaymentMethod,
    ) -> Result<CaptureReceipt, GatewayError>;
}

/// Approves every capture without contacting a provider.
///
/// Must be replaced by a real provider integration before production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn capture(
        &self,
        account: AccountId,
        amount: Amount,
        method: PaymentMethod,
    ) -> Result<CaptureReceipt, GatewayError> {
        warn!(
            account = %account,
            amount = %amount,
            method = %method,
            "stub gateway approved capture without a provider"
        );
        Ok(CaptureReceipt {
            reference: format!("stub-{}", uuid::Uuid::new_v4().simple()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_gateway_approves_with_unique_references() {
        let gateway = StubGateway;
        let a = gateway
            .capture(1, Amount::from_scaled(100), PaymentMethod::Card)
            .await
            .unwrap();
        let b = gateway
            .capture(1, Amount::from_scaled(100), PaymentMethod::Card)
            .await
            .unwrap();
        assert!(a.reference.starts_with("stub-"));
        assert_ne!(a.reference, b.reference);
    }
}
