use crate::domain::ports::EventSink;
use crate::domain::transaction::Mti;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

/// Audit sink that writes structured records to the application log via
/// `tracing`, under the `audit` target.
///
/// Downstream collection is out of scope; callers already treat sink
/// failures as best-effort.
#[derive(Debug, Default, Clone)]
pub struct TracingEventLog;

impl TracingEventLog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventSink for TracingEventLog {
    async fn log_mti_transition(
        &self,
        transaction_id: Uuid,
        from: Option<Mti>,
        to: Mti,
        description: &str,
    ) -> Result<()> {
        tracing::info!(
            target: "audit",
            %transaction_id,
            from_mti = from.map(|m| m.code()).unwrap_or("none"),
            to_mti = to.code(),
            description,
            timestamp = %Utc::now().to_rfc3339(),
            "MTI transition"
        );
        Ok(())
    }

    async fn log_transaction_event(
        &self,
        transaction_id: Uuid,
        event_type: &str,
        details: serde_json::Value,
    ) -> Result<()> {
        tracing::info!(
            target: "audit",
            %transaction_id,
            event_type,
            details = %details,
            timestamp = %Utc::now().to_rfc3339(),
            "transaction event"
        );
        Ok(())
    }
}
