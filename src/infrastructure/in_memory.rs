use crate::domain::ports::{EventSink, TransactionStore};
use crate::domain::transaction::{Mti, Transaction};
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for transactions.
///
/// Uses `Arc<RwLock<HashMap<Uuid, Transaction>>>` for shared concurrent
/// access. Writes are idempotent by id: re-creating an existing record is a
/// no-op, and updates that would drag a settled record out of its terminal
/// state are rejected so concurrent writers converge on one stored state.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        transactions.entry(tx.id).or_insert(tx);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(&id).cloned())
    }

    async fn update(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        if let Some(existing) = transactions.get(&tx.id)
            && existing.status.is_terminal()
            && existing.status != tx.status
            && !existing.status.can_transition_to(tx.status)
        {
            return Err(AuthError::InvalidStateTransition {
                from: existing.status,
                to: tx.status,
            });
        }
        transactions.insert(tx.id, tx);
        Ok(())
    }
}

/// One audit record: either an MTI transition or a lifecycle event.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub transaction_id: Uuid,
    pub event_type: String,
    pub from_mti: Option<Mti>,
    pub to_mti: Option<Mti>,
    pub details: serde_json::Value,
    pub at: DateTime<Utc>,
}

pub const MTI_TRANSITION: &str = "MTI_TRANSITION";

/// Append-only audit log held in memory; tests read it back to assert on
/// the recorded lifecycle.
#[derive(Default, Clone)]
pub struct InMemoryEventLog {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    /// MTI transitions recorded for one transaction, in order.
    pub async fn mti_transitions(&self, transaction_id: Uuid) -> Vec<(Option<Mti>, Mti)> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.transaction_id == transaction_id && r.event_type == MTI_TRANSITION)
            .filter_map(|r| r.to_mti.map(|to| (r.from_mti, to)))
            .collect()
    }
}

#[async_trait]
impl EventSink for InMemoryEventLog {
    async fn log_mti_transition(
        &self,
        transaction_id: Uuid,
        from: Option<Mti>,
        to: Mti,
        description: &str,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(AuditRecord {
            transaction_id,
            event_type: MTI_TRANSITION.to_string(),
            from_mti: from,
            to_mti: Some(to),
            details: serde_json::json!({ "description": description }),
            at: Utc::now(),
        });
        Ok(())
    }

    async fn log_transaction_event(
        &self,
        transaction_id: Uuid,
        event_type: &str,
        details: serde_json::Value,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(AuditRecord {
            transaction_id,
            event_type: event_type.to_string(),
            from_mti: None,
            to_mti: None,
            details,
            at: Utc::now(),
        });
        Ok(())
    }
}
