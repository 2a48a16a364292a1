use super::transaction::{Currency, Mti, Transaction};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub type SharedTransactionStore = Arc<dyn TransactionStore>;
pub type SharedAcquirerClient = Arc<dyn AcquirerClient>;
pub type SharedEventSink = Arc<dyn EventSink>;

/// Persistence port, keyed by transaction id. `create` and `update` are
/// idempotent: re-applying the same terminal state is a no-op, and
/// conflicting writes against a settled record are rejected so concurrent
/// writers converge on one stored state.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Transaction>>;
    async fn update(&self, tx: Transaction) -> Result<()>;
}

/// What the processor sends upstream for an online authorization.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    pub merchant_id: String,
    pub terminal_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub trace_number: u32,
    pub mti: Mti,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationResponse {
    pub approved: bool,
    pub approval_code: Option<String>,
    pub response_code: Option<String>,
    pub response_message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AcquirerError {
    #[error("acquirer request timed out")]
    Timeout,
    #[error("acquirer connection failed: {0}")]
    Connection(String),
}

/// The external authorization network. Timeouts and connection failures are
/// retryable; everything else arrives as an explicit response.
#[async_trait]
pub trait AcquirerClient: Send + Sync {
    async fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> std::result::Result<AuthorizationResponse, AcquirerError>;
}

/// Append-only audit sink. Callers treat failures as best-effort: a sink
/// error is logged and swallowed, never propagated into the authorization
/// path.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn log_mti_transition(
        &self,
        transaction_id: Uuid,
        from: Option<Mti>,
        to: Mti,
        description: &str,
    ) -> Result<()>;

    async fn log_transaction_event(
        &self,
        transaction_id: Uuid,
        event_type: &str,
        details: serde_json::Value,
    ) -> Result<()>;
}
