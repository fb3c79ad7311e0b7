use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::domain::{JobId, Rate, UserId};

/// Charge request for an in-progress job's accepted rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub job_id: JobId,
    pub client_id: UserId,
    pub freelancer_id: UserId,
    pub amount: Rate,
    pub method: String,
}

/// Gateway confirmation of a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: PaymentRequest) -> Result<PaymentReceipt, PaymentError>;
}

/// Stand-in gateway that approves every charge.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedPaymentGateway;

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn charge(&self, request: PaymentRequest) -> Result<PaymentReceipt, PaymentError> {
        let processed_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        let reference = format!("PAY-{}-{}", processed_at.timestamp_millis(), &suffix[..9]);

        info!(
            job_id = %request.job_id,
            amount = %request.amount,
            method = %request.method,
            reference = %reference,
            "simulated payment processed"
        );

        Ok(PaymentReceipt {
            reference,
            processed_at,
        })
    }
}
