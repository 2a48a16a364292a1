use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Terminal identity and authorization policy knobs.
///
/// Defaults mirror a stock terminal profile; everything is overridable via
/// the environment or by constructing the struct directly.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub merchant_id: String,
    pub terminal_id: String,
    /// Settlement batch. Advanced only by an external batch-close operation,
    /// never by individual transactions.
    pub batch_number: u32,
    /// Maximum amount eligible for offline stand-in approval.
    pub offline_limit: Decimal,
    /// Per-attempt bound on an acquirer call.
    pub acquirer_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            merchant_id: "DEFAULT_MERCHANT".to_string(),
            terminal_id: "DEFAULT_TERMINAL".to_string(),
            batch_number: 1,
            offline_limit: dec!(500.00),
            acquirer_timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl ProcessorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            merchant_id: env_or("MERCHANT_ID", defaults.merchant_id),
            terminal_id: env_or("TERMINAL_ID", defaults.terminal_id),
            batch_number: env_parsed("BATCH_NUMBER", defaults.batch_number),
            offline_limit: env_parsed("OFFLINE_LIMIT", defaults.offline_limit),
            acquirer_timeout: Duration::from_secs(env_parsed(
                "ACQUIRER_TIMEOUT_SECS",
                defaults.acquirer_timeout.as_secs(),
            )),
            retry_attempts: env_parsed("RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_delay: Duration::from_secs(env_parsed(
                "RETRY_DELAY_SECS",
                defaults.retry_delay.as_secs(),
            )),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.batch_number, 1);
        assert_eq!(config.offline_limit, dec!(500.00));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.acquirer_timeout, Duration::from_secs(30));
        assert_eq!(config.retry_delay, Duration::from_secs(5));
    }
}
