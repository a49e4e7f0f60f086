//! Retry/backoff state machine for rate-limited endpoints.
//!
//! Everything here is pure: the machine is fed response statuses and tells the
//! caller whether to send again, wait, stop with the payload, or give up. The
//! fetcher owns the side effects (network, sleeping).

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// HTTP 429, retried without bound.
    Throttled,
    /// Any other status >= 400, retried a few times.
    Transient,
}

impl ErrorClass {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(ErrorClass::Throttled),
            s if s >= 400 => Some(ErrorClass::Transient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_transient_attempts: u32,
    pub throttle_ceiling_secs: u64,
    pub transient_ceiling_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_transient_attempts: 3,
            throttle_ceiling_secs: 60,
            transient_ceiling_secs: 15,
        }
    }
}

impl RetryPolicy {
    /// `min(ceiling, 1 + 2^(attempt-1))` seconds, `attempt` being 1-based.
    pub fn backoff(attempt: u32, ceiling_secs: u64) -> Duration {
        let exp = 2u64
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        Duration::from_secs(exp.saturating_add(1).min(ceiling_secs))
    }

    /// 計算下一次等待時間；`None` 代表不再重試
    pub fn next_wait(
        &self,
        class: ErrorClass,
        attempt: u32,
        hint: Option<Duration>,
    ) -> Option<Duration> {
        match class {
            ErrorClass::Throttled => {
                Some(hint.unwrap_or_else(|| Self::backoff(attempt, self.throttle_ceiling_secs)))
            }
            ErrorClass::Transient if attempt < self.max_transient_attempts => {
                Some(Self::backoff(attempt, self.transient_ceiling_secs))
            }
            ErrorClass::Transient => None,
        }
    }
}

/// Only a plain integer number of seconds is honored.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    let value = value?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u64>().ok().map(Duration::from_secs)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Attempting { attempt: u32 },
    Waiting { wait: Duration, reason: String },
    Succeeded,
    Exhausted { status: u16 },
}

#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    requests: u32,
    state: RetryState,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            requests: 0,
            state: RetryState::Attempting { attempt: 1 },
        }
    }

    pub fn state(&self) -> &RetryState {
        &self.state
    }

    /// Requests sent so far.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// 429 與其他錯誤共用同一個 attempt 計數
    pub fn on_response(&mut self, status: u16, retry_after: Option<&str>) -> &RetryState {
        self.requests += 1;
        self.state = match ErrorClass::from_status(status) {
            None => RetryState::Succeeded,
            Some(ErrorClass::Throttled) => {
                let hint = parse_retry_after(retry_after);
                let wait = self
                    .policy
                    .next_wait(ErrorClass::Throttled, self.requests, hint)
                    .unwrap_or_default();
                RetryState::Waiting {
                    wait,
                    reason: "429 Too Many Requests".to_string(),
                }
            }
            Some(ErrorClass::Transient) => {
                match self
                    .policy
                    .next_wait(ErrorClass::Transient, self.requests, None)
                {
                    Some(wait) => RetryState::Waiting {
                        wait,
                        reason: format!("HTTP {}", status),
                    },
                    None => RetryState::Exhausted { status },
                }
            }
        };
        &self.state
    }

    /// 等待結束後回到 Attempting
    pub fn resume(&mut self) {
        if let RetryState::Waiting { .. } = self.state {
            self.state = RetryState::Attempting {
                attempt: self.requests + 1,
            };
        }
    }
}
