use crate::error::{PipelineError, Result, Stage};
use dossier_model_gateway::{GenerationConfig, ModelGateway};

pub const DEFAULT_MAX_QUESTIONS: usize = 5;

/// Only this many leading characters of the addendum are sent to the model.
const ADDENDUM_PREFIX_CHARS: usize = 4000;

/// Ask the model to turn the addendum's core claims into retrieval questions.
///
/// The response is split on line breaks, trimmed, blanks discarded, and
/// capped at `max_questions`. Callers treat gateway exhaustion as "no
/// targeted questions" and fall back to economy-mode retrieval.
pub async fn propose_questions(
    gateway: &ModelGateway,
    addendum_text: &str,
    max_questions: usize,
) -> Result<Vec<String>> {
    let prompt = question_prompt(addendum_text);
    let config = GenerationConfig {
        max_output_tokens: 512,
        temperature: 0.2,
    };
    let response = gateway
        .generate_text(&prompt, &config)
        .await
        .map_err(|err| PipelineError::stage(Stage::Questions, err))?;

    let questions = parse_questions(&response, max_questions);
    log::info!("Proposed {} retrieval questions", questions.len());
    Ok(questions)
}

fn question_prompt(addendum_text: &str) -> String {
    let prefix = bounded_prefix(addendum_text, ADDENDUM_PREFIX_CHARS);
    format!(
        "You are auditing a construction-project addendum against the project's \
         reference file.\n\n\
         Identify the 3-5 core claims of the addendum below (quantities, prices, \
         scope changes, contractual assertions) and phrase each one as a \
         standalone retrieval question suitable for searching the reference \
         documents.\n\n\
         Respond with one question per line and nothing else.\n\n\
         Addendum:\n{prefix}"
    )
}

fn parse_questions(response: &str, max_questions: usize) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(max_questions)
        .collect()
}

/// Longest prefix of `text` holding at most `max_chars` characters, never
/// splitting a multi-byte character.
pub(crate) fn bounded_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
