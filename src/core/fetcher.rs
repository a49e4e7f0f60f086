use crate::core::retry::{RetryMachine, RetryPolicy, RetryState};
use crate::domain::ports::{ApiRequest, ApiResponse, Clock, Transport};
use crate::utils::error::{HarvestError, Result};

/// 帶節流重試的抓取器；transport 在整個 run 中共用
pub struct RetryingFetcher<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    policy: RetryPolicy,
}

impl<T: Transport, C: Clock> RetryingFetcher<T, C> {
    pub fn new(transport: T, clock: C, policy: RetryPolicy) -> Self {
        Self {
            transport,
            clock,
            policy,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Sends `request` until it succeeds or the transient budget runs out.
    /// Transport-level errors are returned as-is, without retrying.
    pub async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut machine = RetryMachine::new(self.policy.clone());

        loop {
            if let RetryState::Attempting { attempt } = machine.state() {
                tracing::debug!("GET {} (attempt {})", request.url, attempt);
            }

            let response = self.transport.get(request).await?;
            tracing::debug!("API response status: {}", response.status);

            match machine.on_response(response.status, response.retry_after.as_deref()) {
                RetryState::Succeeded => return Ok(response),
                RetryState::Waiting { wait, reason } => {
                    tracing::warn!("⏳ {}, waiting {}s before retry", reason, wait.as_secs());
                    println!("   · {}, retry in {}s…", reason, wait.as_secs());
                    self.clock.sleep(*wait).await;
                    machine.resume();
                }
                RetryState::Exhausted { status } => {
                    return Err(HarvestError::HttpStatus {
                        status: *status,
                        url: request.url.clone(),
                    });
                }
                RetryState::Attempting { .. } => unreachable!("on_response never yields Attempting"),
            }
        }
    }
}
