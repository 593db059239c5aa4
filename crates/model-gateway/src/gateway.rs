use crate::error::{GatewayError, ProviderError, Result};
use crate::provider::{GenerationConfig, GenerativeProvider, ModelInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const STRICT_JSON_INSTRUCTION: &str = "\n\nRespond with exactly one bare JSON object and \
nothing else: no markdown, no code fences, no commentary before or after it.";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Retry budget per candidate model.
    pub attempts_per_model: usize,
    /// Ceiling for the exponential rate-limit backoff, in seconds.
    pub backoff_cap_secs: u64,
    /// Fixed candidate list; `None` discovers models from the provider once
    /// per gateway lifetime.
    pub candidates: Option<Vec<String>>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            attempts_per_model: 3,
            backoff_cap_secs: 30,
            candidates: None,
        }
    }
}

/// Resilient invoker in front of a [`GenerativeProvider`].
///
/// Candidate models are tried in priority order; the reaction to a failure
/// depends on its class: unavailable models are abandoned immediately, rate
/// limits back off (`min(2^attempt, cap)` seconds) and retry the same model,
/// anything else abandons the model. The candidate list is computed once and
/// reused for the gateway's lifetime; a process restart is the only refresh.
pub struct ModelGateway {
    provider: Arc<dyn GenerativeProvider>,
    config: GatewayConfig,
    candidates: OnceCell<Vec<String>>,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn GenerativeProvider>, config: GatewayConfig) -> Self {
        Self {
            provider,
            config,
            candidates: OnceCell::new(),
        }
    }

    pub fn with_defaults(provider: Arc<dyn GenerativeProvider>) -> Self {
        Self::new(provider, GatewayConfig::default())
    }

    /// The ordered candidate list, discovering and sorting it on first use.
    pub async fn candidate_models(&self) -> Result<&[String]> {
        let candidates = self
            .candidates
            .get_or_try_init(|| async {
                if let Some(fixed) = &self.config.candidates {
                    return Ok::<_, GatewayError>(fixed.clone());
                }
                let mut models = self.provider.list_models().await?;
                sort_by_priority(&mut models);
                let ids: Vec<String> = models.into_iter().map(|m| m.id).collect();
                log::info!("Discovered {} candidate models: {:?}", ids.len(), ids);
                Ok(ids)
            })
            .await?;
        Ok(candidates)
    }

    /// Free-text generation with model rotation and rate-limit backoff.
    pub async fn generate_text(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let candidates = self.candidate_models().await?;
        if candidates.is_empty() {
            return Err(GatewayError::NoCandidates);
        }

        let mut last_error = String::new();
        for model in candidates {
            for attempt in 0..self.config.attempts_per_model {
                match self.provider.generate(model, prompt, config).await {
                    Ok(text) => {
                        log::debug!(
                            "Model '{model}' answered ({} chars) on attempt {attempt}",
                            text.len()
                        );
                        return Ok(text);
                    }
                    Err(err @ ProviderError::ModelUnavailable(_)) => {
                        log::warn!("Model '{model}' unavailable, rotating: {err}");
                        last_error = err.to_string();
                        break;
                    }
                    Err(err @ ProviderError::RateLimited(_)) => {
                        last_error = err.to_string();
                        if attempt + 1 < self.config.attempts_per_model {
                            let delay = self.backoff(attempt);
                            log::warn!("Model '{model}' rate limited, retrying in {delay:?}");
                            tokio::time::sleep(delay).await;
                        }
                    }
                    Err(err) => {
                        log::warn!("Model '{model}' failed, rotating: {err}");
                        last_error = err.to_string();
                        break;
                    }
                }
            }
        }

        Err(GatewayError::GenerationExhausted {
            models: candidates.len(),
            attempts: self.config.attempts_per_model,
            last: last_error,
        })
    }

    /// Two-phase structured generation.
    ///
    /// Phase 1 asks the provider to enforce `schema`. If the provider rejects
    /// the schema itself, phase 2 retries the same model without the schema
    /// but with a strict bare-JSON instruction appended, and parses the raw
    /// text. A parse failure abandons the model and rotates, same as any
    /// other hard failure.
    pub async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        config: &GenerationConfig,
    ) -> Result<serde_json::Value> {
        let candidates = self.candidate_models().await?;
        if candidates.is_empty() {
            return Err(GatewayError::NoCandidates);
        }

        let mut last_error = String::new();
        'models: for model in candidates {
            let mut attempt = 0;
            while attempt < self.config.attempts_per_model {
                match self
                    .provider
                    .generate_structured(model, prompt, schema, config)
                    .await
                {
                    Ok(text) => match parse_json_object(&text) {
                        Ok(value) => return Ok(value),
                        Err(err) => {
                            log::warn!("Model '{model}' returned unparseable JSON: {err}");
                            last_error = err;
                            continue 'models;
                        }
                    },
                    Err(ProviderError::SchemaRejected(reason)) => {
                        log::warn!(
                            "Model '{model}' rejected the response schema, \
                             falling back to bare-JSON mode: {reason}"
                        );
                        match self.generate_bare_json(model, prompt, config).await {
                            Ok(value) => return Ok(value),
                            Err(err) => {
                                last_error = err;
                                continue 'models;
                            }
                        }
                    }
                    Err(err @ ProviderError::RateLimited(_)) => {
                        last_error = err.to_string();
                        attempt += 1;
                        if attempt < self.config.attempts_per_model {
                            let delay = self.backoff(attempt - 1);
                            log::warn!("Model '{model}' rate limited, retrying in {delay:?}");
                            tokio::time::sleep(delay).await;
                        }
                    }
                    Err(err) => {
                        log::warn!("Model '{model}' failed structured call, rotating: {err}");
                        last_error = err.to_string();
                        continue 'models;
                    }
                }
            }
        }

        Err(GatewayError::StructuredGenerationExhausted {
            models: candidates.len(),
            last: last_error,
        })
    }

    /// Phase 2: same model, schema dropped, strict-JSON instruction appended.
    async fn generate_bare_json(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> std::result::Result<serde_json::Value, String> {
        let fallback_prompt = format!("{prompt}{STRICT_JSON_INSTRUCTION}");
        for attempt in 0..self.config.attempts_per_model {
            match self.provider.generate(model, &fallback_prompt, config).await {
                Ok(text) => return parse_json_object(&text),
                Err(err @ ProviderError::RateLimited(_)) => {
                    if attempt + 1 < self.config.attempts_per_model {
                        let delay = self.backoff(attempt);
                        log::warn!("Model '{model}' rate limited in fallback, retrying in {delay:?}");
                        tokio::time::sleep(delay).await;
                    } else {
                        return Err(err.to_string());
                    }
                }
                Err(err) => return Err(err.to_string()),
            }
        }
        Err("fallback retry budget exhausted".to_string())
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let exp = 1u64 << attempt.min(63);
        Duration::from_secs(exp.min(self.config.backoff_cap_secs))
    }
}

/// Sort candidates cheap-tier-first, newest version first within a tier.
fn sort_by_priority(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| {
        let (tier_a, version_a) = model_priority(&a.id);
        let (tier_b, version_b) = model_priority(&b.id);
        tier_a
            .cmp(&tier_b)
            .then(version_b.cmp(&version_a))
            .then(a.id.cmp(&b.id))
    });
}

fn model_priority(id: &str) -> (u8, (u32, u32)) {
    let lower = id.to_ascii_lowercase();
    let tier = if lower.contains("flash-lite") {
        0
    } else if lower.contains("flash") {
        1
    } else if lower.contains("pro") {
        2
    } else {
        3
    };
    (tier, parse_version(&lower))
}

/// First `major.minor` (or bare `major`) digit group in the id.
fn parse_version(id: &str) -> (u32, u32) {
    let mut chars = id.chars().peekable();
    while chars.peek().is_some() {
        let number: String = chars
            .by_ref()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if number.is_empty() {
            break;
        }
        let mut parts = number.trim_end_matches('.').splitn(2, '.');
        let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        return (major, minor);
    }
    (0, 0)
}

/// Parse a model response as a single JSON object, tolerating a ```json fence.
fn parse_json_object(text: &str) -> std::result::Result<serde_json::Value, String> {
    let mut trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        trimmed = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON: {e}"))?;
    if !value.is_object() {
        return Err(format!("expected a JSON object, got: {value}"));
    }
    Ok(value)
}
