use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::{LlmCall, LlmError, LlmResult, ProviderClient, UsageTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderTier {
    Low,
    Medium,
    High,
}

/// An ordered candidate within a tier: the (provider, model) pair to try,
/// and the position determines fallback order.
#[derive(Debug, Clone)]
pub struct ProviderCandidate {
    pub provider: String,
    pub model: String,
}

impl ProviderCandidate {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

struct Unavailable {
    since: Instant,
}

/// Routes calls to providers by quality tier, tracks per-provider
/// availability with a cool-off window, and accounts per-user usage
/// (spec §4.1, C1).
pub struct LlmRouter {
    providers: Vec<Arc<dyn ProviderClient>>,
    /// Ordered candidate list per tier; first entry is tried first.
    routing_table: Vec<(ProviderTier, Vec<ProviderCandidate>)>,
    unavailable: DashMap<String, Unavailable>,
    cool_off: Duration,
    usage: UsageTracker,
    default_candidate: ProviderCandidate,
}

impl LlmRouter {
    pub fn new(
        providers: Vec<Arc<dyn ProviderClient>>,
        routing_table: Vec<(ProviderTier, Vec<ProviderCandidate>)>,
        cool_off: Duration,
        default_candidate: ProviderCandidate,
    ) -> Self {
        Self {
            providers,
            routing_table,
            unavailable: DashMap::new(),
            cool_off,
            usage: UsageTracker::new(),
            default_candidate,
        }
    }

    fn find_provider(&self, name: &str) -> Option<&Arc<dyn ProviderClient>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    fn candidates_for(&self, tier: ProviderTier) -> Vec<ProviderCandidate> {
        self.routing_table
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, candidates)| candidates.clone())
            .unwrap_or_else(|| vec![self.default_candidate.clone()])
    }

    fn is_available(&self, provider: &str) -> bool {
        match self.unavailable.get(provider) {
            Some(entry) => entry.since.elapsed() >= self.cool_off,
            None => true,
        }
    }

    fn mark_unavailable(&self, provider: &str) {
        tracing::warn!(provider, "marking provider unavailable for cool-off window");
        self.unavailable.insert(provider.to_string(), Unavailable { since: Instant::now() });
    }

    fn mark_available(&self, provider: &str) {
        self.unavailable.remove(provider);
    }

    /// Drives one call against the ordered candidate list for its tier,
    /// skipping unavailable providers, until one succeeds or all are
    /// exhausted (spec §4.1).
    pub async fn call(&self, call: LlmCall) -> Result<LlmResult, LlmError> {
        let candidates = if let (Some(provider), Some(model)) = (&call.provider, &call.model) {
            vec![ProviderCandidate::new(provider.clone(), model.clone())]
        } else {
            self.candidates_for(call.quality.tier())
        };

        let mut last_error: Option<LlmError> = None;
        let mut last_provider_name = String::new();

        for candidate in &candidates {
            if !self.is_available(&candidate.provider) {
                continue;
            }

            let Some(provider) = self.find_provider(&candidate.provider) else {
                continue;
            };

            if call.is_multimodal() && !provider.supports_multimodal() {
                last_error = Some(LlmError::UnsupportedCapability {
                    provider: candidate.provider.clone(),
                    capability: "multimodal".to_string(),
                });
                continue;
            }

            last_provider_name = candidate.provider.clone();
            let start = Instant::now();
            match provider.complete(&call, &candidate.model).await {
                Ok(mut result) => {
                    result.latency_ms = start.elapsed().as_millis() as u64;
                    self.mark_available(&candidate.provider);
                    self.usage.record(&call.user_id, result.input_tokens, result.output_tokens, result.cost_usd);
                    return Ok(result);
                }
                Err(err) => {
                    self.mark_unavailable(&candidate.provider);
                    self.usage.record(&call.user_id, 0, 0, 0.0);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(LlmError::UnsupportedCapability { provider, capability }) if candidates.len() == 1 => {
                Err(LlmError::UnsupportedCapability { provider, capability })
            }
            Some(err) => Err(LlmError::AllProvidersFailed {
                last_provider: last_provider_name,
                source: anyhow::anyhow!(err.to_string()),
            }),
            None => Err(LlmError::ModelUnavailable { tier: call.quality.tier() }),
        }
    }

    pub fn usage(&self, user_id: &str) -> crate::Usage {
        self.usage.usage(user_id)
    }

    /// Clears any providers whose cool-off window has elapsed. Intended to
    /// be driven by a periodic background task (spec §4.1 "A periodic
    /// refresh clears the flag").
    pub fn refresh_availability(&self) {
        let expired: Vec<String> = self
            .unavailable
            .iter()
            .filter(|entry| entry.since.elapsed() >= self.cool_off)
            .map(|entry| entry.key().clone())
            .collect();
        for provider in expired {
            self.mark_available(&provider);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageEncoding, ImageInput, Quality, TaskType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    struct FlakyProvider {
        name: String,
        fail_times: AtomicUsize,
        multimodal: bool,
    }

    #[async_trait]
    impl ProviderClient for FlakyProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn supports_multimodal(&self) -> bool {
            self.multimodal
        }

        async fn complete(&self, _call: &LlmCall, model: &str) -> Result<LlmResult, LlmError> {
            if self.fail_times.load(AtomicOrdering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, AtomicOrdering::SeqCst);
                return Err(LlmError::Transport {
                    provider: self.name.clone(),
                    source: anyhow::anyhow!("simulated failure"),
                });
            }
            Ok(LlmResult {
                text: format!("ok from {}", self.name),
                provider: self.name.clone(),
                model: model.to_string(),
                input_tokens: 10,
                output_tokens: 5,
                cost_usd: 0.001,
                latency_ms: 0,
            })
        }
    }

    fn router_with(providers: Vec<Arc<dyn ProviderClient>>) -> LlmRouter {
        LlmRouter::new(
            providers,
            vec![(
                ProviderTier::Medium,
                vec![ProviderCandidate::new("primary", "m1"), ProviderCandidate::new("secondary", "m2")],
            )],
            Duration::from_secs(60),
            ProviderCandidate::new("primary", "m1"),
        )
    }

    #[tokio::test]
    async fn falls_back_to_next_candidate_on_failure() {
        let primary = Arc::new(FlakyProvider {
            name: "primary".to_string(),
            fail_times: AtomicUsize::new(999),
            multimodal: false,
        });
        let secondary = Arc::new(FlakyProvider {
            name: "secondary".to_string(),
            fail_times: AtomicUsize::new(0),
            multimodal: false,
        });
        let router = router_with(vec![primary, secondary]);

        let call = LlmCall::new(TaskType::Scene, "hi", Quality::Normal, "u1");
        let result = router.call(call).await.unwrap();
        assert_eq!(result.provider, "secondary");
    }

    #[tokio::test]
    async fn all_providers_failed_when_every_candidate_errors() {
        let primary = Arc::new(FlakyProvider {
            name: "primary".to_string(),
            fail_times: AtomicUsize::new(999),
            multimodal: false,
        });
        let secondary = Arc::new(FlakyProvider {
            name: "secondary".to_string(),
            fail_times: AtomicUsize::new(999),
            multimodal: false,
        });
        let router = router_with(vec![primary, secondary]);

        let call = LlmCall::new(TaskType::Scene, "hi", Quality::Normal, "u1");
        let err = router.call(call).await.unwrap_err();
        assert!(matches!(err, LlmError::AllProvidersFailed { .. }));
    }

    #[tokio::test]
    async fn multimodal_call_against_non_multimodal_provider_is_unsupported() {
        let primary = Arc::new(FlakyProvider {
            name: "primary".to_string(),
            fail_times: AtomicUsize::new(0),
            multimodal: false,
        });
        let router = LlmRouter::new(
            vec![primary],
            vec![(ProviderTier::Medium, vec![ProviderCandidate::new("primary", "m1")])],
            Duration::from_secs(60),
            ProviderCandidate::new("primary", "m1"),
        );

        let call = LlmCall::new(TaskType::Generation, "hi", Quality::Normal, "u1").with_image(ImageInput {
            data: "http://example.com/a.png".to_string(),
            encoding: ImageEncoding::Url,
            mime: None,
        });
        let err = router.call(call).await.unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedCapability { .. }));
    }

    #[tokio::test]
    async fn unavailable_provider_is_skipped_until_cool_off_elapses() {
        let primary = Arc::new(FlakyProvider {
            name: "primary".to_string(),
            fail_times: AtomicUsize::new(1),
            multimodal: false,
        });
        let secondary = Arc::new(FlakyProvider {
            name: "secondary".to_string(),
            fail_times: AtomicUsize::new(0),
            multimodal: false,
        });
        let router = LlmRouter::new(
            vec![primary, secondary],
            vec![(
                ProviderTier::Medium,
                vec![ProviderCandidate::new("primary", "m1"), ProviderCandidate::new("secondary", "m2")],
            )],
            Duration::from_millis(20),
            ProviderCandidate::new("primary", "m1"),
        );

        let call = LlmCall::new(TaskType::Scene, "hi", Quality::Normal, "u1");
        let first = router.call(call).await.unwrap();
        assert_eq!(first.provider, "secondary");

        tokio::time::sleep(Duration::from_millis(30)).await;
        router.refresh_availability();

        let call2 = LlmCall::new(TaskType::Scene, "hi", Quality::Normal, "u1");
        let second = router.call(call2).await.unwrap();
        assert_eq!(second.provider, "primary");
    }
}
