// Payments port (external collaborator)

use crate::port::collaborator::CollaboratorResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPayment {
    pub id: String,
    pub business_id: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub attempts: u32,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn list_failed_payments(&self) -> CollaboratorResult<Vec<FailedPayment>>;

    /// Returns true when the charge went through
    async fn retry_payment(&self, payment_id: &str) -> CollaboratorResult<bool>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::collaborator::CollaboratorError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Outcome the mock returns for one payment
    #[derive(Debug, Clone, Copy)]
    pub enum RetryOutcome {
        Recovered,
        Declined,
        Error,
    }

    #[derive(Default)]
    pub struct MockPaymentGateway {
        payments: Mutex<Vec<(FailedPayment, RetryOutcome)>>,
        retried: Mutex<HashMap<String, u32>>,
    }

    impl MockPaymentGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_failed_payment(&self, id: &str, outcome: RetryOutcome) {
            self.payments.lock().unwrap().push((
                FailedPayment {
                    id: id.to_string(),
                    business_id: "biz-1".to_string(),
                    amount_cents: 1_999,
                    attempts: 1,
                },
                outcome,
            ));
        }

        pub fn retry_count(&self, id: &str) -> u32 {
            self.retried.lock().unwrap().get(id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl PaymentGateway for MockPaymentGateway {
        async fn list_failed_payments(&self) -> CollaboratorResult<Vec<FailedPayment>> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .iter()
                .map(|(p, _)| p.clone())
                .collect())
        }

        async fn retry_payment(&self, payment_id: &str) -> CollaboratorResult<bool> {
            *self
                .retried
                .lock()
                .unwrap()
                .entry(payment_id.to_string())
                .or_default() += 1;
            let outcome = self
                .payments
                .lock()
                .unwrap()
                .iter()
                .find(|(p, _)| p.id == payment_id)
                .map(|(_, o)| *o);
            match outcome {
                Some(RetryOutcome::Recovered) => Ok(true),
                Some(RetryOutcome::Declined) => Ok(false),
                Some(RetryOutcome::Error) => {
                    Err(CollaboratorError::Unavailable("processor down".to_string()))
                }
                None => Err(CollaboratorError::Rejected(format!(
                    "unknown payment {}",
                    payment_id
                ))),
            }
        }
    }
}
