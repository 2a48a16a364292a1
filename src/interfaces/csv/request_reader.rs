use crate::domain::transaction::{Amount, CardData, Currency, PaymentRequest, TransactionType};
use crate::error::{AuthError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One CSV row of a payment-request batch. Card fields arrive flat; empty
/// optional columns become `None`.
#[derive(Debug, Deserialize)]
struct PaymentRecord {
    amount: Decimal,
    currency: Currency,
    card_number: String,
    expiry_date: String,
    cvv: Option<String>,
    cardholder_name: Option<String>,
    protocol: String,
    transaction_type: TransactionType,
    auth_code: Option<String>,
}

impl TryFrom<PaymentRecord> for PaymentRequest {
    type Error = AuthError;

    fn try_from(record: PaymentRecord) -> Result<Self> {
        Ok(PaymentRequest {
            amount: Amount::new(record.amount)?,
            currency: record.currency,
            card: CardData {
                pan: record.card_number,
                expiry: record.expiry_date,
                cvv: record.cvv.filter(|v| !v.is_empty()),
                cardholder_name: record.cardholder_name.filter(|v| !v.is_empty()),
            },
            transaction_type: record.transaction_type,
            protocol: record.protocol,
            auth_code: record.auth_code.filter(|v| !v.is_empty()),
        })
    }
}

/// Reads payment requests from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<PaymentRequest>`,
/// trimming whitespace and tolerating flexible record lengths. Rows stream
/// lazily, so large batches never load fully into memory.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn requests(self) -> impl Iterator<Item = Result<PaymentRequest>> {
        self.reader
            .into_deserialize::<PaymentRecord>()
            .map(|result| result.map_err(AuthError::from).and_then(TryFrom::try_from))
    }
}
