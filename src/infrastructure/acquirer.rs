use crate::domain::ports::{AcquirerClient, AcquirerError, AuthorizationRequest, AuthorizationResponse};
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Scripted behavior for the simulated acquirer.
#[derive(Debug, Clone)]
pub enum AcquirerBehavior {
    /// Approve every request with a freshly generated code of this length.
    ApproveGenerated { code_length: usize },
    /// Approve every request with a fixed code.
    Approve { code: String },
    /// Decline every request with the given response code and message.
    Decline { code: String, message: String },
    /// Never answer.
    Timeout,
    /// Time out the first `failures` attempts, then approve with `code`.
    FailThenApprove { failures: u32, code: String },
}

/// A stand-alone acquirer for the CLI binary and tests. Counts attempts so
/// retry behavior can be asserted.
pub struct SimulatedAcquirer {
    behavior: AcquirerBehavior,
    latency: Duration,
    attempts: AtomicU32,
}

impl SimulatedAcquirer {
    pub fn new(behavior: AcquirerBehavior) -> Self {
        Self {
            behavior,
            latency: Duration::ZERO,
            attempts: AtomicU32::new(0),
        }
    }

    /// Adds a fixed delay before every answer, to hold transactions in
    /// AUTHORIZING long enough for in-flight scenarios.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AcquirerClient for SimulatedAcquirer {
    async fn authorize(
        &self,
        _request: AuthorizationRequest,
    ) -> std::result::Result<AuthorizationResponse, AcquirerError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match &self.behavior {
            AcquirerBehavior::ApproveGenerated { code_length } => {
                Ok(approved(generate_code(*code_length)))
            }
            AcquirerBehavior::Approve { code } => Ok(approved(code.clone())),
            AcquirerBehavior::Decline { code, message } => Ok(AuthorizationResponse {
                approved: false,
                approval_code: None,
                response_code: Some(code.clone()),
                response_message: Some(message.clone()),
            }),
            AcquirerBehavior::Timeout => Err(AcquirerError::Timeout),
            AcquirerBehavior::FailThenApprove { failures, code } => {
                if attempt <= *failures {
                    Err(AcquirerError::Timeout)
                } else {
                    Ok(approved(code.clone()))
                }
            }
        }
    }
}

fn approved(code: String) -> AuthorizationResponse {
    AuthorizationResponse {
        approved: true,
        approval_code: Some(code),
        response_code: Some("00".to_string()),
        response_message: Some("Approved".to_string()),
    }
}

fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::{Currency, Mti};
    use rust_decimal_macros::dec;

    fn request() -> AuthorizationRequest {
        AuthorizationRequest {
            merchant_id: "M1".to_string(),
            terminal_id: "T1".to_string(),
            amount: dec!(10.00),
            currency: Currency::Usd,
            trace_number: 1,
            mti: Mti::FinancialRequest,
        }
    }

    #[tokio::test]
    async fn test_generated_codes_match_length() {
        let acquirer = SimulatedAcquirer::new(AcquirerBehavior::ApproveGenerated { code_length: 4 });
        let response = acquirer.authorize(request()).await.unwrap();
        let code = response.approval_code.unwrap();
        assert_eq!(code.len(), 4);
        assert!(code.bytes().all(|b| b.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_fail_then_approve_counts_attempts() {
        let acquirer = SimulatedAcquirer::new(AcquirerBehavior::FailThenApprove {
            failures: 2,
            code: "123456".to_string(),
        });
        assert!(acquirer.authorize(request()).await.is_err());
        assert!(acquirer.authorize(request()).await.is_err());
        let response = acquirer.authorize(request()).await.unwrap();
        assert!(response.approved);
        assert_eq!(acquirer.attempts(), 3);
    }
}
