#![allow(dead_code)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use terminal_auth::application::processor::TransactionProcessor;
use terminal_auth::config::ProcessorConfig;
use terminal_auth::domain::protocol::ProtocolCatalog;
use terminal_auth::domain::transaction::{
    Amount, CardData, Currency, PaymentRequest, TransactionType,
};
use terminal_auth::infrastructure::acquirer::SimulatedAcquirer;
use terminal_auth::infrastructure::in_memory::{InMemoryEventLog, InMemoryTransactionStore};

pub const ONLINE_6: &str = "POS Terminal -101.4 (6-digit approval)";
pub const ONLINE_4: &str = "POS Terminal -101.1 (4-digit approval)";
pub const OFFLINE_6: &str = "POS Terminal -201.3 (6-digit approval)";
pub const OFFLINE_4: &str = "POS Terminal -101.8 (PIN-LESS transaction)";

/// Processing policy with short delays so retry scenarios finish quickly.
pub fn fast_config() -> ProcessorConfig {
    ProcessorConfig {
        merchant_id: "MERCHANT-1".to_string(),
        terminal_id: "TERM-1".to_string(),
        batch_number: 1,
        offline_limit: dec!(500.00),
        acquirer_timeout: Duration::from_millis(250),
        retry_attempts: 3,
        retry_delay: Duration::from_millis(10),
    }
}

pub struct Harness {
    pub processor: TransactionProcessor,
    pub acquirer: Arc<SimulatedAcquirer>,
    pub events: InMemoryEventLog,
    pub store: InMemoryTransactionStore,
}

pub fn harness(acquirer: SimulatedAcquirer) -> Harness {
    harness_with_config(fast_config(), acquirer)
}

pub fn harness_with_config(config: ProcessorConfig, acquirer: SimulatedAcquirer) -> Harness {
    let acquirer = Arc::new(acquirer);
    let events = InMemoryEventLog::new();
    let store = InMemoryTransactionStore::new();
    let processor = TransactionProcessor::new(
        config,
        ProtocolCatalog::default(),
        Arc::new(store.clone()),
        acquirer.clone(),
        Arc::new(events.clone()),
    );
    Harness {
        processor,
        acquirer,
        events,
        store,
    }
}

pub fn card() -> CardData {
    CardData {
        pan: "4111111111111111".to_string(),
        expiry: "12/27".to_string(),
        cvv: Some("123".to_string()),
        cardholder_name: Some("J SMITH".to_string()),
    }
}

pub fn request(
    amount: Decimal,
    protocol: &str,
    transaction_type: TransactionType,
) -> PaymentRequest {
    PaymentRequest {
        amount: Amount::new(amount).unwrap(),
        currency: Currency::Usd,
        card: card(),
        transaction_type,
        protocol: protocol.to_string(),
        auth_code: None,
    }
}

pub fn sale(amount: Decimal, protocol: &str) -> PaymentRequest {
    request(amount, protocol, TransactionType::Sale)
}
