use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};

/// Merchant settlement destination, one variant per payout rail.
///
/// The tag makes unknown or mixed-up settings a deserialization error
/// instead of a runtime surprise; payout execution itself happens outside
/// this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum PayoutSettings {
    #[serde(rename = "BANK")]
    Bank(BankPayoutSettings),
    #[serde(rename = "CRYPTO")]
    Crypto(CryptoPayoutSettings),
}

impl PayoutSettings {
    pub fn validate(&self) -> Result<()> {
        match self {
            PayoutSettings::Bank(settings) => settings.validate(),
            PayoutSettings::Crypto(settings) => settings.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankPayoutSettings {
    pub account_name: String,
    pub account_number: String,
    pub routing_number: String,
    pub bank_name: String,
    #[serde(default)]
    pub swift_code: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
}

impl BankPayoutSettings {
    pub fn validate(&self) -> Result<()> {
        if self.account_name.trim().is_empty() || self.bank_name.trim().is_empty() {
            return Err(AuthError::Validation(
                "bank payout settings require account and bank names".to_string(),
            ));
        }
        if !is_digits(&self.account_number) {
            return Err(AuthError::Validation(
                "bank account number must be numeric".to_string(),
            ));
        }
        if self.routing_number.len() != 9 || !is_digits(&self.routing_number) {
            return Err(AuthError::Validation(
                "routing number must be 9 digits".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoPayoutSettings {
    pub wallet_address: String,
    /// Asset ticker, e.g. BTC or ETH.
    pub currency: String,
    /// For tokens that settle on more than one network.
    #[serde(default)]
    pub network: Option<String>,
}

impl CryptoPayoutSettings {
    pub fn validate(&self) -> Result<()> {
        if self.wallet_address.trim().is_empty() {
            return Err(AuthError::Validation(
                "wallet address must not be empty".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(AuthError::Validation(
                "crypto payout currency must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_deserialization() {
        let json = r#"{
            "method": "BANK",
            "account_name": "Acme Ltd",
            "account_number": "12345678",
            "routing_number": "021000021",
            "bank_name": "First National"
        }"#;
        let settings: PayoutSettings = serde_json::from_str(json).unwrap();
        assert!(matches!(settings, PayoutSettings::Bank(_)));
        settings.validate().unwrap();

        let json = r#"{
            "method": "CRYPTO",
            "wallet_address": "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh",
            "currency": "BTC"
        }"#;
        let settings: PayoutSettings = serde_json::from_str(json).unwrap();
        assert!(matches!(settings, PayoutSettings::Crypto(_)));
        settings.validate().unwrap();
    }

    #[test]
    fn test_unknown_method_rejected() {
        let json = r#"{"method": "CASH", "amount": "10"}"#;
        assert!(serde_json::from_str::<PayoutSettings>(json).is_err());
    }

    #[test]
    fn test_bank_validation() {
        let mut settings = BankPayoutSettings {
            account_name: "Acme Ltd".to_string(),
            account_number: "12345678".to_string(),
            routing_number: "021000021".to_string(),
            bank_name: "First National".to_string(),
            swift_code: None,
            iban: None,
        };
        settings.validate().unwrap();

        settings.routing_number = "12345".to_string();
        assert!(settings.validate().is_err());
    }
}
