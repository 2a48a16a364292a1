use crate::config::ProcessorConfig;
use crate::domain::ports::{
    AuthorizationRequest, AuthorizationResponse, SharedAcquirerClient, SharedEventSink,
    SharedTransactionStore,
};
use crate::domain::protocol::{ProtocolCatalog, ProtocolConfig};
use crate::domain::trace::TraceAllocator;
use crate::domain::transaction::{
    Mti, PaymentRequest, Transaction, TransactionStatus, TransactionType,
};
use crate::error::{AuthError, Result};
use rand::Rng;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// The authorization engine. Owns the protocol catalog, the trace
/// allocator and the outbound ports; drives every transaction from PENDING
/// to a terminal state.
///
/// `submit` returns immediately with the PENDING snapshot and the handle of
/// the background task settling it; callers observe completion through
/// `get_transaction` (or by awaiting the handle).
#[derive(Clone)]
pub struct TransactionProcessor {
    inner: Arc<Inner>,
}

struct Inner {
    config: ProcessorConfig,
    catalog: ProtocolCatalog,
    store: SharedTransactionStore,
    acquirer: SharedAcquirerClient,
    events: SharedEventSink,
    traces: TraceAllocator,
    /// Reversals requested while the original was still in flight, keyed by
    /// original id. Drained once the original settles.
    parked_reversals: Mutex<HashMap<Uuid, Uuid>>,
    /// Originals with a reversal in flight; admits one reversal at a time.
    reversals_in_flight: Mutex<HashSet<Uuid>>,
}

/// What an authorization attempt resolved to, before it is written back to
/// the transaction.
struct Outcome {
    status: TransactionStatus,
    approval_code: Option<String>,
    response_code: Option<String>,
    response_message: Option<String>,
    mti: Option<Mti>,
}

impl TransactionProcessor {
    pub fn new(
        config: ProcessorConfig,
        catalog: ProtocolCatalog,
        store: SharedTransactionStore,
        acquirer: SharedAcquirerClient,
        events: SharedEventSink,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                catalog,
                store,
                acquirer,
                events,
                traces: TraceAllocator::new(),
                parked_reversals: Mutex::new(HashMap::new()),
                reversals_in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn catalog(&self) -> &ProtocolCatalog {
        &self.inner.catalog
    }

    /// Validates the request, persists the PENDING transaction and
    /// dispatches the authorization as a background task.
    pub async fn submit(&self, request: PaymentRequest) -> Result<(Transaction, JoinHandle<()>)> {
        self.validate(&request)?;

        let tx = Transaction::new(
            request,
            self.inner.config.merchant_id.clone(),
            self.inner.config.terminal_id.clone(),
            self.inner.config.batch_number,
        );
        self.inner.store.create(tx.clone()).await?;
        self.audit_event(
            tx.id,
            "TRANSACTION_CREATED",
            json!({
                "type": tx.transaction_type.to_string(),
                "protocol": tx.protocol,
                "amount": tx.amount.value().to_string(),
                "currency": tx.currency.code(),
            }),
        )
        .await;
        tracing::info!(
            transaction_id = %tx.id,
            amount = %tx.amount,
            currency = %tx.currency,
            protocol = %tx.protocol,
            "payment submitted"
        );

        let processor = self.clone();
        let task_tx = tx.clone();
        let handle = tokio::spawn(async move { processor.authorize_and_settle(task_tx).await });
        Ok((tx, handle))
    }

    pub async fn get_transaction(&self, id: Uuid) -> Result<Transaction> {
        self.inner
            .store
            .get(id)
            .await?
            .ok_or(AuthError::NotFound(id))
    }

    /// Requests a reversal of an approved transaction. A reversal arriving
    /// while the original is still PENDING/AUTHORIZING is parked and applied
    /// against the eventual outcome; it is never silently dropped. Only one
    /// reversal is admitted per original.
    pub async fn request_reversal(&self, original_id: Uuid) -> Result<Transaction> {
        let original = self.get_transaction(original_id).await?;
        if !matches!(
            original.status,
            TransactionStatus::Approved
                | TransactionStatus::Pending
                | TransactionStatus::Authorizing
        ) {
            return Err(AuthError::InvalidStateTransition {
                from: original.status,
                to: TransactionStatus::Reversed,
            });
        }

        {
            let mut in_flight = self.inner.reversals_in_flight.lock().await;
            if !in_flight.insert(original_id) {
                return Err(AuthError::InvalidStateTransition {
                    from: original.status,
                    to: TransactionStatus::Reversed,
                });
            }
        }

        let reversal = Transaction::reversal_of(&original);
        if let Err(err) = self.inner.store.create(reversal.clone()).await {
            self.release_reversal_guard(original_id).await;
            return Err(err);
        }
        self.audit_event(
            reversal.id,
            "REVERSAL_REQUESTED",
            json!({ "original_id": original_id.to_string() }),
        )
        .await;

        // Park first, then re-read: whichever side of the settling race we
        // land on, the parked entry is claimed exactly once.
        self.inner
            .parked_reversals
            .lock()
            .await
            .insert(original_id, reversal.id);

        let original_now = self.get_transaction(original_id).await?;
        if !original_now.status.is_terminal() {
            // Still in flight; the authorization task drains the park.
            return Ok(reversal);
        }

        let claimed = self
            .inner
            .parked_reversals
            .lock()
            .await
            .remove(&original_id);
        match claimed {
            // The settling task claimed the entry; it settles the reversal.
            None => self.get_transaction(reversal.id).await,
            Some(reversal_id) if original_now.status == TransactionStatus::Approved => {
                self.execute_reversal(reversal_id, original_id).await
            }
            Some(reversal_id) => {
                self.cancel_parked_reversal(reversal_id, original_now.status)
                    .await;
                self.release_reversal_guard(original_id).await;
                Err(AuthError::InvalidStateTransition {
                    from: original_now.status,
                    to: TransactionStatus::Reversed,
                })
            }
        }
    }

    /// Cancels a transaction that has not completed yet.
    pub async fn request_void(&self, id: Uuid) -> Result<Transaction> {
        let mut tx = self.get_transaction(id).await?;
        match tx.status {
            TransactionStatus::Pending | TransactionStatus::Authorizing => {
                tx.response_message = Some("Voided before completion".to_string());
                self.apply_transition(&mut tx, TransactionStatus::Voided)
                    .await?;
                self.audit_event(id, "TRANSACTION_VOIDED", json!({})).await;
                Ok(tx)
            }
            from => Err(AuthError::InvalidStateTransition {
                from,
                to: TransactionStatus::Voided,
            }),
        }
    }

    fn validate(&self, request: &PaymentRequest) -> Result<()> {
        let protocol = self.inner.catalog.lookup(&request.protocol)?;

        if request.amount.value().scale() > request.currency.minor_units() {
            return Err(AuthError::Validation(format!(
                "amount precision exceeds {} minor units of {}",
                request.currency.minor_units(),
                request.currency
            )));
        }
        if matches!(
            request.transaction_type,
            TransactionType::Void | TransactionType::Reversal
        ) {
            return Err(AuthError::Validation(
                "VOID and REVERSAL are issued against an existing transaction".to_string(),
            ));
        }
        let pan = &request.card.pan;
        if pan.len() < 12 || pan.len() > 19 || !pan.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AuthError::Validation(
                "card number must be 12-19 digits".to_string(),
            ));
        }
        if request.card.expiry.trim().is_empty() {
            return Err(AuthError::Validation("expiry date is required".to_string()));
        }
        if let Some(code) = &request.auth_code
            && !protocol.accepts_code(code)
        {
            return Err(AuthError::Validation(format!(
                "invalid auth code for protocol {}: expected {} digits",
                request.protocol, protocol.approval_length
            )));
        }
        Ok(())
    }

    async fn authorize_and_settle(&self, mut tx: Transaction) {
        let id = tx.id;
        if let Err(err) = self.run_authorization(&mut tx).await {
            tracing::error!(transaction_id = %id, error = %err, "authorization aborted");
        }
        self.drain_parked_reversal(id).await;
    }

    async fn run_authorization(&self, tx: &mut Transaction) -> Result<()> {
        let protocol = match self.inner.catalog.lookup(&tx.protocol) {
            Ok(p) => p,
            Err(err) => {
                // Unknown protocol: the transaction never leaves PENDING.
                self.audit_event(
                    tx.id,
                    "CONFIGURATION_REJECTED",
                    json!({ "protocol": tx.protocol }),
                )
                .await;
                return Err(err);
            }
        };

        let trace = self
            .inner
            .traces
            .next(&tx.terminal_id, tx.batch_number)
            .await;
        tx.trace_number = Some(trace);
        self.apply_transition(tx, TransactionStatus::Authorizing)
            .await?;

        if let Some(request_mti) = tx.transaction_type.request_mti() {
            self.record_mti_change(tx, request_mti).await?;
        }

        let route_online =
            protocol.is_online || tx.amount.value() > self.inner.config.offline_limit;
        let outcome = if route_online {
            self.authorize_online(tx, protocol, trace).await
        } else {
            self.authorize_offline(tx, protocol)
        };
        self.finalize(tx, outcome).await
    }

    async fn authorize_online(
        &self,
        tx: &Transaction,
        protocol: ProtocolConfig,
        trace: u32,
    ) -> Outcome {
        let config = &self.inner.config;
        let request_mti = tx.mti.unwrap_or(Mti::FinancialRequest);
        let request = AuthorizationRequest {
            merchant_id: tx.merchant_id.clone(),
            terminal_id: tx.terminal_id.clone(),
            amount: tx.amount.value(),
            currency: tx.currency,
            trace_number: trace,
            mti: request_mti,
        };

        let attempts = config.retry_attempts.max(1);
        for attempt in 1..=attempts {
            let call = self.inner.acquirer.authorize(request.clone());
            match tokio::time::timeout(config.acquirer_timeout, call).await {
                Ok(Ok(response)) => {
                    return self
                        .outcome_from_response(tx, protocol, request_mti, response)
                        .await;
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        transaction_id = %tx.id,
                        attempt,
                        error = %err,
                        "acquirer attempt failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(transaction_id = %tx.id, attempt, "acquirer attempt timed out");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(config.retry_delay).await;
            }
        }

        // Fail safe: an unreachable acquirer is never an approval.
        let err = AuthError::AcquirerTimeout { attempts };
        self.audit_event(
            tx.id,
            "ACQUIRER_UNREACHABLE",
            json!({ "attempts": attempts, "error": err.to_string() }),
        )
        .await;
        Outcome {
            status: TransactionStatus::Error,
            approval_code: None,
            response_code: Some("91".to_string()),
            response_message: Some("Acquirer unreachable".to_string()),
            mti: None,
        }
    }

    async fn outcome_from_response(
        &self,
        tx: &Transaction,
        protocol: ProtocolConfig,
        request_mti: Mti,
        response: AuthorizationResponse,
    ) -> Outcome {
        if !response.approved {
            return Outcome {
                status: TransactionStatus::Declined,
                approval_code: None,
                response_code: Some(response.response_code.unwrap_or_else(|| "05".to_string())),
                response_message: Some(
                    response
                        .response_message
                        .unwrap_or_else(|| "Do not honor".to_string()),
                ),
                mti: request_mti.response(),
            };
        }

        let code = response.approval_code.unwrap_or_default();
        if !protocol.accepts_code(&code) {
            // An approval we cannot verify is an acquirer bug, not an
            // approval.
            let err = AuthError::ProtocolViolation(format!(
                "approval code {code:?} does not satisfy protocol {}",
                tx.protocol
            ));
            tracing::error!(transaction_id = %tx.id, error = %err, "malformed approval code");
            self.audit_event(tx.id, "PROTOCOL_VIOLATION", json!({ "approval_code": code }))
                .await;
            return Outcome {
                status: TransactionStatus::Error,
                approval_code: None,
                response_code: Some("96".to_string()),
                response_message: Some("Malformed approval code".to_string()),
                mti: None,
            };
        }

        Outcome {
            status: TransactionStatus::Approved,
            approval_code: Some(code),
            response_code: Some(response.response_code.unwrap_or_else(|| "00".to_string())),
            response_message: Some(
                response
                    .response_message
                    .unwrap_or_else(|| "Approved".to_string()),
            ),
            mti: request_mti.response(),
        }
    }

    fn authorize_offline(&self, tx: &Transaction, protocol: ProtocolConfig) -> Outcome {
        if tx.amount.value() > self.inner.config.offline_limit {
            // Never a silent stand-in approval over the risk limit.
            return Outcome {
                status: TransactionStatus::Declined,
                approval_code: None,
                response_code: Some("61".to_string()),
                response_message: Some("Amount exceeds offline limit".to_string()),
                mti: tx.mti.and_then(|m| m.response()),
            };
        }

        let code = tx
            .approval_code
            .clone()
            .filter(|c| protocol.accepts_code(c))
            .unwrap_or_else(|| stand_in_approval_code(protocol.approval_length));
        Outcome {
            status: TransactionStatus::Approved,
            approval_code: Some(code),
            response_code: Some("00".to_string()),
            response_message: Some("Approved (stand-in)".to_string()),
            mti: tx.mti.and_then(|m| m.response()),
        }
    }

    async fn finalize(&self, tx: &mut Transaction, outcome: Outcome) -> Result<()> {
        if let Some(code) = outcome.approval_code {
            tx.approval_code = Some(code);
        }
        tx.response_code = outcome.response_code;
        tx.response_message = outcome.response_message;
        if let Some(mti) = outcome.mti {
            self.record_mti_change(tx, mti).await?;
        }
        self.apply_transition(tx, outcome.status).await
    }

    /// Advances the state machine and persists the result. The stored
    /// snapshot wins over our working copy if it settled concurrently (e.g.
    /// a void racing the authorization); the rejected transition is reported
    /// and not retried.
    async fn apply_transition(&self, tx: &mut Transaction, to: TransactionStatus) -> Result<()> {
        if let Some(stored) = self.inner.store.get(tx.id).await?
            && stored.status.is_terminal()
        {
            if stored.status == to {
                *tx = stored;
                return Ok(());
            }
            let err = AuthError::InvalidStateTransition {
                from: stored.status,
                to,
            };
            tracing::warn!(transaction_id = %tx.id, error = %err, "transition rejected by stored state");
            self.audit_event(
                tx.id,
                "TRANSITION_REJECTED",
                json!({ "from": stored.status.to_string(), "to": to.to_string() }),
            )
            .await;
            *tx = stored;
            return Err(err);
        }

        tx.transition(to)?;
        self.inner.store.update(tx.clone()).await?;
        self.audit_event(tx.id, "STATUS_CHANGED", json!({ "status": to.to_string() }))
            .await;
        Ok(())
    }

    async fn record_mti_change(&self, tx: &mut Transaction, to: Mti) -> Result<()> {
        let from = tx.record_mti(to)?;
        if let Err(err) = self
            .inner
            .events
            .log_mti_transition(tx.id, from, to, to.description())
            .await
        {
            tracing::warn!(transaction_id = %tx.id, error = %err, "audit sink failure ignored");
        }
        self.inner.store.update(tx.clone()).await?;
        Ok(())
    }

    async fn execute_reversal(&self, reversal_id: Uuid, original_id: Uuid) -> Result<Transaction> {
        let mut reversal = self.get_transaction(reversal_id).await?;
        let run = self.run_authorization(&mut reversal).await;
        if reversal.status == TransactionStatus::Approved
            && let Err(err) = self.mark_original_reversed(original_id).await
        {
            tracing::error!(
                transaction_id = %original_id,
                error = %err,
                "failed to mark original reversed"
            );
        }
        self.release_reversal_guard(original_id).await;
        run?;
        Ok(reversal)
    }

    /// One-time, idempotent side update of the reversed original.
    async fn mark_original_reversed(&self, original_id: Uuid) -> Result<()> {
        let mut original = self.get_transaction(original_id).await?;
        if original.status == TransactionStatus::Reversed {
            return Ok(());
        }
        self.apply_transition(&mut original, TransactionStatus::Reversed)
            .await?;
        self.audit_event(original_id, "ORIGINAL_REVERSED", json!({}))
            .await;
        Ok(())
    }

    async fn drain_parked_reversal(&self, original_id: Uuid) {
        let parked = {
            self.inner
                .parked_reversals
                .lock()
                .await
                .remove(&original_id)
        };
        let Some(reversal_id) = parked else { return };

        match self.inner.store.get(original_id).await {
            Ok(Some(original)) if original.status == TransactionStatus::Approved => {
                if let Err(err) = self.execute_reversal(reversal_id, original_id).await {
                    tracing::error!(
                        transaction_id = %original_id,
                        error = %err,
                        "queued reversal failed"
                    );
                }
            }
            Ok(Some(original)) => {
                self.cancel_parked_reversal(reversal_id, original.status)
                    .await;
                self.release_reversal_guard(original_id).await;
            }
            Ok(None) => {
                self.release_reversal_guard(original_id).await;
            }
            Err(err) => {
                tracing::error!(
                    transaction_id = %original_id,
                    error = %err,
                    "failed to load original for queued reversal"
                );
                self.release_reversal_guard(original_id).await;
            }
        }
    }

    async fn cancel_parked_reversal(
        &self,
        reversal_id: Uuid,
        original_status: TransactionStatus,
    ) {
        match self.get_transaction(reversal_id).await {
            Ok(mut reversal) => {
                reversal.response_message = Some(format!(
                    "Original settled {original_status}, reversal not applicable"
                ));
                if let Err(err) = self
                    .apply_transition(&mut reversal, TransactionStatus::Voided)
                    .await
                {
                    tracing::error!(
                        transaction_id = %reversal_id,
                        error = %err,
                        "failed to cancel queued reversal"
                    );
                }
                self.audit_event(reversal_id, "REVERSAL_CANCELLED", json!({}))
                    .await;
            }
            Err(err) => {
                tracing::error!(
                    transaction_id = %reversal_id,
                    error = %err,
                    "failed to load queued reversal"
                );
            }
        }
    }

    async fn release_reversal_guard(&self, original_id: Uuid) {
        self.inner
            .reversals_in_flight
            .lock()
            .await
            .remove(&original_id);
    }

    async fn audit_event(&self, id: Uuid, event_type: &str, details: serde_json::Value) {
        if let Err(err) = self
            .inner
            .events
            .log_transaction_event(id, event_type, details)
            .await
        {
            tracing::warn!(transaction_id = %id, error = %err, "audit sink failure ignored");
        }
    }
}

fn stand_in_approval_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
