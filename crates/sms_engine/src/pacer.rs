use std::time::Duration;

/// Suspends the batch between sends.
#[async_trait::async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Real-time pacing on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait::async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
