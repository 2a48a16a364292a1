mod common;

use common::*;
use rust_decimal_macros::dec;
use terminal_auth::domain::transaction::{Mti, TransactionStatus};
use terminal_auth::infrastructure::acquirer::{AcquirerBehavior, SimulatedAcquirer};

#[tokio::test]
async fn test_stand_in_approval_below_limit() {
    let h = harness(SimulatedAcquirer::new(AcquirerBehavior::Timeout));
    let (snapshot, done) = h
        .processor
        .submit(sale(dec!(400.00), OFFLINE_6))
        .await
        .unwrap();
    done.await.unwrap();

    let tx = h.processor.get_transaction(snapshot.id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Approved);
    // Approved locally: the acquirer was never contacted
    assert_eq!(h.acquirer.attempts(), 0);
    assert_eq!(tx.response_message.as_deref(), Some("Approved (stand-in)"));
    assert_eq!(tx.mti, Some(Mti::FinancialResponse));
    let code = tx.approval_code.unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| b.is_ascii_digit()));
}

#[tokio::test]
async fn test_stand_in_code_matches_protocol_length() {
    let h = harness(SimulatedAcquirer::new(AcquirerBehavior::Timeout));
    let (snapshot, done) = h
        .processor
        .submit(sale(dec!(20.00), OFFLINE_4))
        .await
        .unwrap();
    done.await.unwrap();

    let tx = h.processor.get_transaction(snapshot.id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Approved);
    assert_eq!(tx.approval_code.unwrap().len(), 4);
}

#[tokio::test]
async fn test_over_limit_routes_online() {
    let h = harness(SimulatedAcquirer::new(AcquirerBehavior::ApproveGenerated {
        code_length: 6,
    }));
    let (snapshot, done) = h
        .processor
        .submit(sale(dec!(600.00), OFFLINE_6))
        .await
        .unwrap();
    done.await.unwrap();

    let tx = h.processor.get_transaction(snapshot.id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Approved);
    // Over the offline limit the acquirer must have been consulted
    assert_eq!(h.acquirer.attempts(), 1);
}

#[tokio::test]
async fn test_over_limit_with_unreachable_acquirer_is_error() {
    let h = harness(SimulatedAcquirer::new(AcquirerBehavior::Timeout));
    let (snapshot, done) = h
        .processor
        .submit(sale(dec!(600.00), OFFLINE_6))
        .await
        .unwrap();
    done.await.unwrap();

    let tx = h.processor.get_transaction(snapshot.id).await.unwrap();
    // Never silently approved over the limit, and never guessed online
    assert_eq!(tx.status, TransactionStatus::Error);
    assert_eq!(h.acquirer.attempts(), 3);
}

#[tokio::test]
async fn test_stand_in_honors_supplied_auth_code() {
    let h = harness(SimulatedAcquirer::new(AcquirerBehavior::Timeout));
    let mut req = sale(dec!(50.00), OFFLINE_6);
    req.auth_code = Some("654321".to_string());
    let (snapshot, done) = h.processor.submit(req).await.unwrap();
    done.await.unwrap();

    let tx = h.processor.get_transaction(snapshot.id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Approved);
    assert_eq!(tx.approval_code.as_deref(), Some("654321"));
    assert_eq!(h.acquirer.attempts(), 0);
}
