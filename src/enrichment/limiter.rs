// src/enrichment/limiter.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Token bucket shared by all enrichment workers. Starts full at `burst`
/// tokens and refills one token every `1/rate_per_sec` seconds, capped at
/// `burst`. Consuming a token bounds the aggregate outbound probe rate
/// regardless of worker count.
pub struct RateLimiter {
    tokens: Arc<Semaphore>,
    refill: JoinHandle<()>,
}

impl RateLimiter {
    /// Must be called from within a tokio runtime: the refill task is
    /// spawned immediately.
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        let tokens = Arc::new(Semaphore::new(burst as usize));
        let refill_tokens = Arc::clone(&tokens);
        let cap = burst as usize;

        let refill = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1) / rate_per_sec);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                if refill_tokens.available_permits() < cap {
                    refill_tokens.add_permits(1);
                }
            }
        });

        RateLimiter { tokens, refill }
    }

    /// Wait for and consume one token.
    pub async fn acquire(&self) {
        if let Ok(permit) = self.tokens.acquire().await {
            permit.forget();
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill.abort();
    }
}
