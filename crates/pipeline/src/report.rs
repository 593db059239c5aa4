use crate::error::{PipelineError, Result, Stage};
use dossier_model_gateway::{GenerationConfig, ModelGateway};

const REPORT_MAX_TOKENS: u32 = 2048;
const REPORT_TEMPERATURE: f32 = 0.2;

const REPORT_STRUCTURE: &str = "\
Write the audit report in markdown with exactly this structure:\n\
## Summary\n\
2-4 bullet points covering what the addendum claims and whether it holds up.\n\
## VOB Compliance Check\n\
## Technical and Price Check\n\
## Recommendation\n\n\
If the research results are missing or inconclusive, say so explicitly in the \
report instead of guessing.";

fn report_config() -> GenerationConfig {
    GenerationConfig {
        max_output_tokens: REPORT_MAX_TOKENS,
        temperature: REPORT_TEMPERATURE,
    }
}

/// Synthesize the audit report from notes, addendum, and retrieval context.
///
/// Returns raw markdown; the report is never parsed for structured data.
pub async fn generate_report(
    gateway: &ModelGateway,
    notes: &str,
    addendum_text: &str,
    context: &str,
) -> Result<String> {
    let prompt = format!(
        "You are an audit assistant for construction-project addenda.\n\n\
         Persistent project notes (HIGHEST priority, these rules override \
         everything else):\n{notes}\n\n\
         Addendum under audit:\n{addendum_text}\n\n\
         Research results from the project's reference file:\n{context}\n\n\
         {REPORT_STRUCTURE}"
    );
    log::info!("Generating audit report ({} prompt chars)", prompt.len());
    gateway
        .generate_text(&prompt, &report_config())
        .await
        .map_err(|err| PipelineError::stage(Stage::Report, err))
}

/// Regenerate the report with the auditor's corrections folded in.
pub async fn revise_report(
    gateway: &ModelGateway,
    notes: &str,
    addendum_text: &str,
    context: &str,
    prior_report: &str,
    corrections: &str,
) -> Result<String> {
    let prompt = format!(
        "You are an audit assistant for construction-project addenda.\n\n\
         Persistent project notes (HIGHEST priority, these rules override \
         everything else):\n{notes}\n\n\
         Addendum under audit:\n{addendum_text}\n\n\
         Research results from the project's reference file:\n{context}\n\n\
         Previous audit report:\n{prior_report}\n\n\
         Correction instructions from the auditor:\n{corrections}\n\n\
         Rewrite the report incorporating these corrections. Keep the existing \
         structure.\n\n\
         {REPORT_STRUCTURE}"
    );
    log::info!("Revising audit report ({} correction chars)", corrections.len());
    gateway
        .generate_text(&prompt, &report_config())
        .await
        .map_err(|err| PipelineError::stage(Stage::Report, err))
}
