use crate::error::ProviderError;
use crate::provider::{GenerationConfig, GenerativeProvider, ModelInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Provider implementation against the Gemini `v1beta` REST surface.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Http("missing API key".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build from `DOSSIER_API_KEY` (fallback `GEMINI_API_KEY`), with
    /// `DOSSIER_API_BASE` overriding the endpoint for tests.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = env::var("DOSSIER_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .map_err(|_| ProviderError::Http("DOSSIER_API_KEY is not set".to_string()))?;
        let base_url = env::var("DOSSIER_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(api_key, base_url)
    }

    async fn generate_inner(
        &self,
        model: &str,
        prompt: &str,
        schema: Option<&serde_json::Value>,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfigWire {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                response_mime_type: schema.map(|_| "application/json".to_string()),
                response_schema: schema.cloned(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(model, status.as_u16(), body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Http(format!("failed to parse response: {e}")))?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse(model.to_string()));
        }
        Ok(text)
    }
}

fn classify_status(model: &str, status: u16, body: String) -> ProviderError {
    match status {
        404 => ProviderError::ModelUnavailable(model.to_string()),
        429 => ProviderError::RateLimited(body),
        400 if body.contains("response_schema") || body.contains("responseSchema") => {
            ProviderError::SchemaRejected(body)
        }
        _ => ProviderError::Api { status, body },
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ListModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Http(format!("failed to parse model list: {e}")))?;
        Ok(parsed
            .models
            .into_iter()
            .filter(|model| {
                model
                    .supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|model| ModelInfo {
                id: model
                    .name
                    .strip_prefix("models/")
                    .unwrap_or(&model.name)
                    .to_string(),
                display_name: model.display_name,
            })
            .collect())
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        self.generate_inner(model, prompt, None, config).await
    }

    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &serde_json::Value,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        self.generate_inner(model, prompt, Some(schema), config).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfigWire,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigWire {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ListedModel>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedModel {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_404_maps_to_model_unavailable() {
        let err = classify_status("gemini-x", 404, "not found".to_string());
        assert!(matches!(err, ProviderError::ModelUnavailable(model) if model == "gemini-x"));
    }

    #[test]
    fn status_429_maps_to_rate_limited() {
        let err = classify_status("m", 429, "quota".to_string());
        assert!(matches!(err, ProviderError::RateLimited(_)));
    }

    #[test]
    fn schema_complaints_map_to_schema_rejected() {
        let err = classify_status("m", 400, "invalid response_schema for model".to_string());
        assert!(matches!(err, ProviderError::SchemaRejected(_)));

        // A 400 without a schema complaint stays generic.
        let err = classify_status("m", 400, "bad request".to_string());
        assert!(matches!(err, ProviderError::Api { status: 400, .. }));
    }
}
