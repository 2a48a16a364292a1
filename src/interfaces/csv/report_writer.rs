use crate::domain::transaction::{Mti, Transaction, TransactionStatus, TransactionType};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

#[derive(Serialize)]
struct ReportRecord {
    transaction_id: Uuid,
    transaction_type: TransactionType,
    protocol: String,
    status: TransactionStatus,
    amount: Decimal,
    currency: &'static str,
    approval_code: Option<String>,
    response_code: Option<String>,
    response_message: Option<String>,
    mti: Option<Mti>,
    trace_number: Option<u32>,
    batch_number: u32,
}

impl From<Transaction> for ReportRecord {
    fn from(tx: Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            transaction_type: tx.transaction_type,
            protocol: tx.protocol,
            status: tx.status,
            amount: tx.amount.value(),
            currency: tx.currency.code(),
            approval_code: tx.approval_code,
            response_code: tx.response_code,
            response_message: tx.response_message,
            mti: tx.mti,
            trace_number: tx.trace_number,
            batch_number: tx.batch_number,
        }
    }
}

/// Writes the settlement report for a processed batch as CSV. Card data
/// never appears in the report.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(target),
        }
    }

    pub fn write_transactions(
        &mut self,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> Result<()> {
        for tx in transactions {
            self.writer.serialize(ReportRecord::from(tx))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
