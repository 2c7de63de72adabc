//! Sandbox push provider.
//!
//! Selected through configuration for local runs, staging and tests. Every
//! address succeeds unless an outcome has been scripted for it. The most
//! recent calls are recorded so tests can assert on batching.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::notification::{redact, DeliveryOutcome, PushPayload};
use crate::ports::{ProviderError, PushProvider};

/// Calls kept by [`SandboxPushProvider::new`]; older ones are dropped.
pub const DEFAULT_CALL_HISTORY: usize = 256;

pub struct SandboxPushProvider {
    scripted: RwLock<HashMap<String, String>>,
    calls: RwLock<VecDeque<Vec<String>>>,
    history: usize,
    closed: AtomicBool,
}

impl Default for SandboxPushProvider {
    fn default() -> Self {
        Self::with_history(DEFAULT_CALL_HISTORY)
    }
}

impl SandboxPushProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `history` calls; zero disables recording.
    pub fn with_history(history: usize) -> Self {
        Self {
            scripted: RwLock::new(HashMap::new()),
            calls: RwLock::new(VecDeque::new()),
            history,
            closed: AtomicBool::new(false),
        }
    }

    /// Makes deliveries to `token` fail with `error_code`.
    pub async fn script(&self, token: impl Into<String>, error_code: impl Into<String>) {
        self.scripted
            .write()
            .await
            .insert(token.into(), error_code.into());
    }

    /// Address lists of the recorded `send_multicast` calls, oldest first.
    pub async fn calls(&self) -> Vec<Vec<String>> {
        self.calls.read().await.iter().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushProvider for SandboxPushProvider {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> Result<Vec<DeliveryOutcome>, ProviderError> {
        if self.is_closed() {
            return Err(ProviderError::Closed);
        }
        if self.history > 0 {
            let mut calls = self.calls.write().await;
            if calls.len() == self.history {
                calls.pop_front();
            }
            calls.push_back(tokens.to_vec());
        }

        let scripted = self.scripted.read().await;
        let outcomes = tokens
            .iter()
            .map(|token| match scripted.get(token) {
                Some(code) => DeliveryOutcome::failed(code.clone()),
                None => DeliveryOutcome::delivered(),
            })
            .collect();

        for token in tokens {
            tracing::debug!(token = %redact(token), title = %payload.title, "sandbox push");
        }
        Ok(outcomes)
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::codes;
    use std::collections::BTreeMap;

    fn payload() -> PushPayload {
        PushPayload {
            title: "t".into(),
            body: "b".into(),
            data: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn outcomes_follow_input_order() {
        let provider = SandboxPushProvider::new();
        provider.script("bad-token-000001", codes::NOT_REGISTERED).await;

        let outcomes = provider
            .send_multicast(
                &["good-token-00001".into(), "bad-token-000001".into()],
                &payload(),
            )
            .await
            .unwrap();

        assert!(outcomes[0].success);
        assert_eq!(outcomes[1].error_code.as_deref(), Some(codes::NOT_REGISTERED));
    }

    #[tokio::test]
    async fn call_history_keeps_only_latest_calls() {
        let provider = SandboxPushProvider::with_history(2);
        for n in 0..5 {
            provider
                .send_multicast(&[format!("device-token-{:04}", n)], &payload())
                .await
                .unwrap();
        }

        let calls = provider.calls().await;
        assert_eq!(
            calls,
            vec![vec!["device-token-0003".to_string()], vec!["device-token-0004".to_string()]]
        );
    }

    #[tokio::test]
    async fn zero_history_records_nothing() {
        let provider = SandboxPushProvider::with_history(0);
        provider.send_multicast(&["x".repeat(12)], &payload()).await.unwrap();
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn closed_provider_refuses_sends() {
        let provider = SandboxPushProvider::new();
        provider.shutdown().await;
        let result = provider.send_multicast(&["x".repeat(12)], &payload()).await;
        assert_eq!(result, Err(ProviderError::Closed));
    }
}
