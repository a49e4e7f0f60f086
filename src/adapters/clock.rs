use crate::domain::ports::Clock;
use async_trait::async_trait;
use std::time::Duration;

/// 真正會等待的時鐘
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
