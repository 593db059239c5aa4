use crate::error::{PipelineError, Result, Stage};
use dossier_model_gateway::{GatewayError, GenerationConfig, ModelGateway};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Fixed six-field machine-readable distillation of an audit report.
///
/// Generated separately from the report, never parsed out of its prose;
/// consumers may rely on semantic agreement with the report but not on
/// byte-level consistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub vob_check: String,
    pub technical_review: String,
    pub price_check: String,
    pub corrected_total: String,
    pub recommendation: String,
    pub next_steps: String,
}

impl Summary {
    pub const FIELDS: [&'static str; 6] = [
        "vob_check",
        "technical_review",
        "price_check",
        "corrected_total",
        "recommendation",
        "next_steps",
    ];

    /// JSON schema for the provider's schema-constrained generation mode.
    pub fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "vob_check": { "type": "string" },
                "technical_review": { "type": "string" },
                "price_check": { "type": "string" },
                "corrected_total": { "type": "string" },
                "recommendation": { "type": "string" },
                "next_steps": { "type": "string" },
            },
            "required": Self::FIELDS,
        })
    }

    /// Deserialize and require all six fields non-empty after trimming.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let summary: Summary = serde_json::from_value(value)
            .map_err(|err| PipelineError::InvalidSummary(err.to_string()))?;
        for (name, field) in Self::FIELDS.iter().zip([
            &summary.vob_check,
            &summary.technical_review,
            &summary.price_check,
            &summary.corrected_total,
            &summary.recommendation,
            &summary.next_steps,
        ]) {
            if field.trim().is_empty() {
                return Err(PipelineError::InvalidSummary(format!(
                    "field '{name}' is empty"
                )));
            }
        }
        Ok(summary)
    }
}

/// Derive the structured summary from the audit's source texts and report.
///
/// Non-empty `corrections` participate as a fifth source with the same
/// priority as the report. Exhaustion of the structured-generation path maps
/// to [`PipelineError::SummaryUnavailable`]; callers surface that as
/// "summary pending" with a manual retry, never a silent default.
pub async fn extract_summary(
    gateway: &ModelGateway,
    notes: &str,
    addendum_text: &str,
    context: &str,
    report_text: &str,
    corrections: &str,
) -> Result<Summary> {
    let mut prompt = format!(
        "Extract the structured audit summary from the sources below. Use ONLY \
         these sources. Answer every field with a terse value, not prose.\n\n\
         Persistent project notes:\n{notes}\n\n\
         Addendum under audit:\n{addendum_text}\n\n\
         Research results from the project's reference file:\n{context}\n\n\
         Audit report:\n{report_text}"
    );
    if !corrections.trim().is_empty() {
        prompt.push_str(&format!(
            "\n\nCorrection instructions from the auditor (same priority as the \
             report):\n{corrections}"
        ));
    }
    prompt.push_str(
        "\n\nFields:\n\
         - vob_check: contractual/VOB compliance verdict\n\
         - technical_review: technical plausibility verdict\n\
         - price_check: price plausibility verdict\n\
         - corrected_total: the checked total amount, including currency\n\
         - recommendation: accept / reject / negotiate, with the key reason\n\
         - next_steps: the immediate follow-up actions",
    );

    let config = GenerationConfig {
        max_output_tokens: 1024,
        temperature: 0.2,
    };
    let value = gateway
        .generate_structured(&prompt, &Summary::schema(), &config)
        .await
        .map_err(|err| match err {
            GatewayError::StructuredGenerationExhausted { .. } => {
                PipelineError::SummaryUnavailable(err.to_string())
            }
            other => PipelineError::stage(Stage::Summary, other),
        })?;
    Summary::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn full_value() -> serde_json::Value {
        json!({
            "vob_check": "compliant",
            "technical_review": "plausible",
            "price_check": "matches contracted rate",
            "corrected_total": "480 EUR",
            "recommendation": "accept",
            "next_steps": "approve and file",
        })
    }

    #[test]
    fn complete_summary_deserializes() {
        let summary = Summary::from_value(full_value()).unwrap();
        assert_eq!(summary.corrected_total, "480 EUR");
    }

    #[test]
    fn missing_field_is_rejected() {
        let mut value = full_value();
        value.as_object_mut().unwrap().remove("next_steps");
        assert!(matches!(
            Summary::from_value(value),
            Err(PipelineError::InvalidSummary(_))
        ));
    }

    #[test]
    fn blank_field_is_rejected() {
        let mut value = full_value();
        value["price_check"] = json!("   ");
        let err = Summary::from_value(value).unwrap_err();
        assert!(err.to_string().contains("price_check"));
    }

    #[test]
    fn schema_requires_all_six_fields() {
        let schema = Summary::schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 6);
        assert!(schema["properties"]["corrected_total"].is_object());
    }
}
