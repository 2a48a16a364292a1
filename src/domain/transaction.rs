use crate::error::{AuthError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Represents a positive monetary amount for transactions.
///
/// Ensures that transaction amounts are always positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(AuthError::Validation("Amount must be positive".to_string()))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AuthError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Supported settlement currencies with their minor-unit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }

    /// Number of digits after the decimal point an amount may carry.
    pub fn minor_units(&self) -> u32 {
        match self {
            Currency::Usd | Currency::Eur => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(AuthError::Validation(format!(
                "Unsupported currency: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Sale,
    Refund,
    Auth,
    Void,
    Reversal,
}

impl TransactionType {
    /// The wire request MTI this transaction type opens with. `Void` is a
    /// local cancellation and never produces a wire message.
    pub fn request_mti(&self) -> Option<Mti> {
        match self {
            TransactionType::Auth => Some(Mti::AuthorizationRequest),
            TransactionType::Sale | TransactionType::Refund => Some(Mti::FinancialRequest),
            TransactionType::Reversal => Some(Mti::ReversalRequest),
            TransactionType::Void => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::Sale => "SALE",
            TransactionType::Refund => "REFUND",
            TransactionType::Auth => "AUTH",
            TransactionType::Void => "VOID",
            TransactionType::Reversal => "REVERSAL",
        };
        f.write_str(name)
    }
}

/// ISO-8583-style message type indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mti {
    #[serde(rename = "0100")]
    AuthorizationRequest,
    #[serde(rename = "0110")]
    AuthorizationResponse,
    #[serde(rename = "0200")]
    FinancialRequest,
    #[serde(rename = "0210")]
    FinancialResponse,
    #[serde(rename = "0220")]
    FinancialAdvice,
    #[serde(rename = "0230")]
    FinancialAdviceResponse,
    #[serde(rename = "0500")]
    ReversalRequest,
    #[serde(rename = "0510")]
    ReversalResponse,
}

impl Mti {
    pub fn code(&self) -> &'static str {
        match self {
            Mti::AuthorizationRequest => "0100",
            Mti::AuthorizationResponse => "0110",
            Mti::FinancialRequest => "0200",
            Mti::FinancialResponse => "0210",
            Mti::FinancialAdvice => "0220",
            Mti::FinancialAdviceResponse => "0230",
            Mti::ReversalRequest => "0500",
            Mti::ReversalResponse => "0510",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Mti::AuthorizationRequest => "Authorization Request",
            Mti::AuthorizationResponse => "Authorization Response",
            Mti::FinancialRequest => "Financial Transaction Request",
            Mti::FinancialResponse => "Financial Transaction Response",
            Mti::FinancialAdvice => "Financial Transaction Advice",
            Mti::FinancialAdviceResponse => "Financial Transaction Advice Response",
            Mti::ReversalRequest => "Reversal Request",
            Mti::ReversalResponse => "Reversal Response",
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Mti::AuthorizationRequest
                | Mti::FinancialRequest
                | Mti::FinancialAdvice
                | Mti::ReversalRequest
        )
    }

    /// The matching response for a request MTI.
    pub fn response(&self) -> Option<Mti> {
        match self {
            Mti::AuthorizationRequest => Some(Mti::AuthorizationResponse),
            Mti::FinancialRequest => Some(Mti::FinancialResponse),
            Mti::FinancialAdvice => Some(Mti::FinancialAdviceResponse),
            Mti::ReversalRequest => Some(Mti::ReversalResponse),
            _ => None,
        }
    }

    /// MTIs that may legally follow `self` on the same transaction.
    fn successors(&self) -> &'static [Mti] {
        match self {
            Mti::AuthorizationRequest => &[Mti::AuthorizationResponse],
            Mti::FinancialRequest => &[Mti::FinancialResponse, Mti::FinancialAdvice],
            Mti::FinancialAdvice => &[Mti::FinancialAdviceResponse],
            Mti::ReversalRequest => &[Mti::ReversalResponse],
            _ => &[],
        }
    }
}

impl fmt::Display for Mti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Authorizing,
    Approved,
    Declined,
    Error,
    Reversed,
    Voided,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            TransactionStatus::Pending | TransactionStatus::Authorizing
        )
    }

    /// One-directional state machine. The only move out of a terminal state
    /// is APPROVED -> REVERSED, applied when a linked reversal settles.
    pub fn can_transition_to(&self, to: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, to),
            (Pending, Authorizing)
                | (Pending, Voided)
                | (Authorizing, Approved)
                | (Authorizing, Declined)
                | (Authorizing, Error)
                | (Authorizing, Voided)
                | (Approved, Reversed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Authorizing => "AUTHORIZING",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Declined => "DECLINED",
            TransactionStatus::Error => "ERROR",
            TransactionStatus::Reversed => "REVERSED",
            TransactionStatus::Voided => "VOIDED",
        };
        f.write_str(name)
    }
}

/// Card details captured at the reading boundary.
///
/// The PAN is masked on serialization and in `Debug` output; the CVV is never
/// persisted at all. Only the card-reading boundary sees the clear PAN.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CardData {
    #[serde(serialize_with = "serialize_masked_pan")]
    pub pan: String,
    pub expiry: String,
    #[serde(skip_serializing, default)]
    pub cvv: Option<String>,
    #[serde(default)]
    pub cardholder_name: Option<String>,
}

impl CardData {
    /// All but the last four digits replaced with `X`.
    pub fn masked_pan(&self) -> String {
        if self.pan.len() <= 4 {
            return self.pan.clone();
        }
        let visible = &self.pan[self.pan.len() - 4..];
        format!("{}{}", "X".repeat(self.pan.len() - 4), visible)
    }
}

impl fmt::Debug for CardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardData")
            .field("pan", &self.masked_pan())
            .field("expiry", &self.expiry)
            .field("cvv", &self.cvv.as_ref().map(|_| "***"))
            .field("cardholder_name", &self.cardholder_name)
            .finish()
    }
}

fn serialize_masked_pan<S>(pan: &String, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let masked = if pan.len() <= 4 {
        pan.clone()
    } else {
        format!("{}{}", "X".repeat(pan.len() - 4), &pan[pan.len() - 4..])
    };
    serializer.serialize_str(&masked)
}

/// A validated payment request, ready for submission to the processor.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub amount: Amount,
    pub currency: Currency,
    pub card: CardData,
    pub transaction_type: TransactionType,
    pub protocol: String,
    /// Caller-supplied approval code (e.g. voice authorization). Must match
    /// the protocol's configured format.
    pub auth_code: Option<String>,
}

/// The central entity: one card transaction moving through the
/// authorization lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: Amount,
    pub currency: Currency,
    pub card: CardData,
    pub transaction_type: TransactionType,
    pub protocol: String,
    pub merchant_id: String,
    pub terminal_id: String,
    pub status: TransactionStatus,
    pub approval_code: Option<String>,
    pub response_code: Option<String>,
    pub response_message: Option<String>,
    pub mti: Option<Mti>,
    pub trace_number: Option<u32>,
    pub batch_number: u32,
    /// Set on reversal transactions: the approved transaction being reversed.
    pub original_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        request: PaymentRequest,
        merchant_id: impl Into<String>,
        terminal_id: impl Into<String>,
        batch_number: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount: request.amount,
            currency: request.currency,
            card: request.card,
            transaction_type: request.transaction_type,
            protocol: request.protocol,
            merchant_id: merchant_id.into(),
            terminal_id: terminal_id.into(),
            status: TransactionStatus::Pending,
            approval_code: request.auth_code,
            response_code: None,
            response_message: None,
            mti: None,
            trace_number: None,
            batch_number,
            original_id: None,
            created_at: Utc::now(),
        }
    }

    /// A new linked reversal transaction for an approved original. The
    /// original record is left untouched.
    pub fn reversal_of(original: &Transaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount: original.amount,
            currency: original.currency,
            card: original.card.clone(),
            transaction_type: TransactionType::Reversal,
            protocol: original.protocol.clone(),
            merchant_id: original.merchant_id.clone(),
            terminal_id: original.terminal_id.clone(),
            status: TransactionStatus::Pending,
            approval_code: None,
            response_code: None,
            response_message: None,
            mti: None,
            trace_number: None,
            batch_number: original.batch_number,
            original_id: Some(original.id),
            created_at: Utc::now(),
        }
    }

    /// Advances the state machine, rejecting any move the machine does not
    /// allow. Terminal transactions stay as they are.
    pub fn transition(&mut self, to: TransactionStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(AuthError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Records an MTI change, enforcing paired request/response semantics.
    /// Returns the previous MTI for audit logging.
    pub fn record_mti(&mut self, to: Mti) -> Result<Option<Mti>> {
        let allowed = match self.mti {
            None => to.is_request(),
            Some(current) => current.successors().contains(&to),
        };
        if !allowed {
            let from = self
                .mti
                .map(|m| m.code().to_string())
                .unwrap_or_else(|| "none".to_string());
            return Err(AuthError::ProtocolViolation(format!(
                "MTI {from} cannot be followed by {to}"
            )));
        }
        Ok(self.mti.replace(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn card() -> CardData {
        CardData {
            pan: "4111111111111111".to_string(),
            expiry: "12/27".to_string(),
            cvv: Some("123".to_string()),
            cardholder_name: Some("J SMITH".to_string()),
        }
    }

    fn sale() -> Transaction {
        let request = PaymentRequest {
            amount: Amount::new(dec!(50.00)).unwrap(),
            currency: Currency::Usd,
            card: card(),
            transaction_type: TransactionType::Sale,
            protocol: "POS Terminal -101.4 (6-digit approval)".to_string(),
            auth_code: None,
        };
        Transaction::new(request, "M1", "T1", 1)
    }

    #[test]
    fn test_amount_must_be_positive() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(Amount::new(dec!(0)).is_err());
        assert!(Amount::new(dec!(-5)).is_err());
    }

    #[test]
    fn test_status_machine_happy_path() {
        let mut tx = sale();
        tx.transition(TransactionStatus::Authorizing).unwrap();
        tx.transition(TransactionStatus::Approved).unwrap();
        tx.transition(TransactionStatus::Reversed).unwrap();
        assert_eq!(tx.status, TransactionStatus::Reversed);
    }

    #[test]
    fn test_no_transition_out_of_terminal_state() {
        let mut tx = sale();
        tx.transition(TransactionStatus::Authorizing).unwrap();
        tx.transition(TransactionStatus::Declined).unwrap();

        for to in [
            TransactionStatus::Approved,
            TransactionStatus::Authorizing,
            TransactionStatus::Voided,
            TransactionStatus::Reversed,
        ] {
            let err = tx.transition(to).unwrap_err();
            assert!(matches!(err, AuthError::InvalidStateTransition { .. }));
            assert_eq!(tx.status, TransactionStatus::Declined);
        }
    }

    #[test]
    fn test_void_only_before_completion() {
        let mut tx = sale();
        assert!(tx.clone().transition(TransactionStatus::Voided).is_ok());
        tx.transition(TransactionStatus::Authorizing).unwrap();
        assert!(tx.clone().transition(TransactionStatus::Voided).is_ok());
        tx.transition(TransactionStatus::Approved).unwrap();
        assert!(tx.transition(TransactionStatus::Voided).is_err());
    }

    #[test]
    fn test_mti_pairing() {
        let mut tx = sale();
        // A response cannot open the exchange
        assert!(tx.record_mti(Mti::FinancialResponse).is_err());
        tx.record_mti(Mti::FinancialRequest).unwrap();
        // 0200 may be followed by 0210 or 0220, never 0110
        assert!(tx.clone().record_mti(Mti::AuthorizationResponse).is_err());
        let from = tx.record_mti(Mti::FinancialResponse).unwrap();
        assert_eq!(from, Some(Mti::FinancialRequest));
        // A settled exchange accepts nothing further
        assert!(tx.record_mti(Mti::FinancialRequest).is_err());
    }

    #[test]
    fn test_reversal_links_original() {
        let original = sale();
        let reversal = Transaction::reversal_of(&original);
        assert_eq!(reversal.transaction_type, TransactionType::Reversal);
        assert_eq!(reversal.original_id, Some(original.id));
        assert_eq!(reversal.amount, original.amount);
        assert_eq!(reversal.status, TransactionStatus::Pending);
        assert_ne!(reversal.id, original.id);
    }

    #[test]
    fn test_card_data_masked_in_debug_output() {
        let rendered = format!("{:?}", card());
        assert!(!rendered.contains("4111111111111111"));
        assert!(rendered.contains("XXXXXXXXXXXX1111"));
        assert!(!rendered.contains("\"123\""));
    }

    #[test]
    fn test_card_data_masked_when_serialized() {
        let json = serde_json::to_value(card()).unwrap();
        assert_eq!(json["pan"], "XXXXXXXXXXXX1111");
        assert!(json.get("cvv").is_none());
    }

    #[test]
    fn test_mti_codes_round_trip() {
        let json = serde_json::to_string(&Mti::ReversalRequest).unwrap();
        assert_eq!(json, "\"0500\"");
        let parsed: Mti = serde_json::from_str("\"0510\"").unwrap();
        assert_eq!(parsed, Mti::ReversalResponse);
    }
}
