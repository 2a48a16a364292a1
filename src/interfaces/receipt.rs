use crate::domain::transaction::{Transaction, TransactionStatus, TransactionType};

const WIDTH: usize = 40;

/// Renders text receipts for finalized transactions. Pure formatting: the
/// transaction is read, never changed.
pub struct ReceiptGenerator {
    merchant_name: String,
    merchant_address: Option<String>,
    header: String,
    footer: String,
}

impl Default for ReceiptGenerator {
    fn default() -> Self {
        Self {
            merchant_name: "MERCHANT".to_string(),
            merchant_address: None,
            header: "PAYMENT TERMINAL".to_string(),
            footer: "Thank you for your business!".to_string(),
        }
    }
}

impl ReceiptGenerator {
    pub fn new(merchant_name: impl Into<String>, merchant_address: Option<String>) -> Self {
        Self {
            merchant_name: merchant_name.into(),
            merchant_address,
            ..Self::default()
        }
    }

    /// 40-column receipt text. The customer copy of an approved transaction
    /// carries a signature line; the merchant copy does not.
    pub fn text_receipt(&self, tx: &Transaction, merchant_copy: bool) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(center(&self.header));
        lines.push(String::new());
        lines.push(center(&self.merchant_name));
        if let Some(address) = &self.merchant_address {
            for line in address.lines() {
                lines.push(center(line));
            }
        }
        lines.push(String::new());
        lines.push("=".repeat(WIDTH));

        lines.push(format!("DATE: {}", tx.created_at.format("%Y-%m-%d %H:%M:%S")));
        lines.push(format!("TERMINAL ID: {}", tx.terminal_id));
        lines.push(format!("MERCHANT ID: {}", tx.merchant_id));
        lines.push(format!("TRANSACTION ID: {:.8}...", tx.id.to_string()));
        if let Some(trace) = tx.trace_number {
            lines.push(format!("TRACE #: {trace}"));
        }
        lines.push(format!("BATCH #: {}", tx.batch_number));
        lines.push(String::new());

        lines.push(format!("TYPE: {}", tx.transaction_type));
        lines.push(format!("STATUS: {}", tx.status));
        if let Some(code) = &tx.approval_code {
            lines.push(format!("APPROVAL: {code}"));
        }
        lines.push(String::new());

        lines.push(format!("CARD: {}", tx.card.masked_pan()));
        lines.push(format!("EXP: {}", tx.card.expiry));
        if let Some(name) = &tx.card.cardholder_name {
            lines.push(format!("CARDHOLDER: {name}"));
        }
        lines.push(String::new());

        lines.push(format!(
            "AMOUNT: {}{}",
            tx.currency.symbol(),
            tx.amount.value().round_dp(tx.currency.minor_units())
        ));
        if tx.transaction_type == TransactionType::Refund {
            lines.push("*** REFUND ***".to_string());
        }
        lines.push(String::new());
        lines.push("=".repeat(WIDTH));

        let copy_type = if merchant_copy {
            "MERCHANT COPY"
        } else {
            "CUSTOMER COPY"
        };
        lines.push(center(copy_type));
        lines.push(String::new());
        lines.push(center(&self.footer));

        if !merchant_copy && tx.status == TransactionStatus::Approved {
            lines.push(String::new());
            lines.push(format!("X{}", "_".repeat(WIDTH - 2)));
            lines.push("SIGNATURE".to_string());
        }

        lines.join("\n")
    }

    /// Merchant and customer copies, in that order.
    pub fn both_copies(&self, tx: &Transaction) -> (String, String) {
        (self.text_receipt(tx, true), self.text_receipt(tx, false))
    }
}

fn center(text: &str) -> String {
    let len = text.chars().count();
    if len >= WIDTH {
        return text.to_string();
    }
    let pad = (WIDTH - len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}
