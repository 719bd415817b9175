// Failed-payment recovery

use super::Collaborators;
use crate::application::worker::{HandlerError, HandlerResult, JobContext, JobHandler};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRetrySummary {
    pub retried: usize,
    pub recovered: usize,
    pub still_failing: usize,
}

pub struct PaymentsProcessor {
    collaborators: Collaborators,
}

impl PaymentsProcessor {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Retry every failed payment once. Per-payment errors are counted,
    /// only a failure to list payments fails the run.
    pub async fn retry_failed(&self, ctx: &JobContext) -> Result<PaymentRetrySummary, HandlerError> {
        let payments = self.collaborators.payments.list_failed_payments().await?;
        let mut summary = PaymentRetrySummary::default();

        for payment in &payments {
            summary.retried += 1;
            match self.collaborators.payments.retry_payment(&payment.id).await {
                Ok(true) => {
                    summary.recovered += 1;
                    info!(payment_id = %payment.id, business_id = %payment.business_id, "Payment recovered");
                }
                Ok(false) => summary.still_failing += 1,
                Err(e) => {
                    warn!(payment_id = %payment.id, error = %e, "Payment retry errored");
                    summary.still_failing += 1;
                }
            }
            ctx.heartbeat().await;
        }

        info!(
            retried = summary.retried,
            recovered = summary.recovered,
            still_failing = summary.still_failing,
            "Payment retry run complete"
        );
        Ok(summary)
    }
}

#[async_trait]
impl JobHandler for PaymentsProcessor {
    async fn handle(&self, ctx: JobContext) -> HandlerResult {
        let summary = self.retry_failed(&ctx).await?;
        serde_json::to_value(summary).map_err(|e| HandlerError::fatal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::domain::catalog::kinds;
    use crate::port::payment_gateway::mocks::RetryOutcome;
    use serde_json::json;

    #[tokio::test]
    async fn test_outcomes_are_tallied() {
        let fx = Fixture::new();
        fx.payments.add_failed_payment("p1", RetryOutcome::Recovered);
        fx.payments.add_failed_payment("p2", RetryOutcome::Declined);
        fx.payments.add_failed_payment("p3", RetryOutcome::Error);

        let ctx = fx.context(kinds::RETRY_FAILED_PAYMENTS, json!({})).await;
        let result = PaymentsProcessor::new(fx.collaborators())
            .handle(ctx)
            .await
            .unwrap();
        let summary: PaymentRetrySummary = serde_json::from_value(result).unwrap();

        assert_eq!(
            summary,
            PaymentRetrySummary {
                retried: 3,
                recovered: 1,
                still_failing: 2
            }
        );
        assert_eq!(fx.payments.retry_count("p3"), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_retry() {
        let fx = Fixture::new();
        let ctx = fx.context(kinds::RETRY_FAILED_PAYMENTS, json!({})).await;
        let result = PaymentsProcessor::new(fx.collaborators())
            .handle(ctx)
            .await
            .unwrap();
        assert_eq!(result, json!({ "retried": 0, "recovered": 0, "stillFailing": 0 }));
    }
}
