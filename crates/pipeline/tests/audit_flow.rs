//! End-to-end audit runs against a scripted generative provider and the
//! deterministic hash embedder, no network involved.

use async_trait::async_trait;
use dossier_model_gateway::{
    GatewayConfig, GenerationConfig, GenerativeProvider, ModelGateway, ModelInfo, ProviderError,
};
use dossier_pipeline::{Fingerprint, PipelineContext, ResultCache};
use dossier_vector_index::{collection_id, HashEmbedder, VectorIndex};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const REFERENCE_DOC: &str = "Contract terms: hourly rate is 48 per hour for trade X. \
     Measured quantities are billed per the site log.";

const ADDENDUM: &str = "Addendum 7: additional 10 hours for trade X at 48/hour = 480 total.";

/// Provider scripted around the audit prompts: question prompts get question
/// lines, report prompts get a report, structured prompts get a summary.
struct AuditProvider {
    fail_structured_calls: Vec<usize>,
    structured_calls: AtomicUsize,
}

impl AuditProvider {
    fn new() -> Self {
        Self {
            fail_structured_calls: Vec::new(),
            structured_calls: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` structured calls.
    fn failing_summaries(n: usize) -> Self {
        Self {
            fail_structured_calls: (1..=n).collect(),
            structured_calls: AtomicUsize::new(0),
        }
    }

    /// Fail only the `call`-th structured call (1-based).
    fn failing_summary_call(call: usize) -> Self {
        Self {
            fail_structured_calls: vec![call],
            structured_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GenerativeProvider for AuditProvider {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(vec![ModelInfo {
            id: "mock-flash".to_string(),
            display_name: None,
        }])
    }

    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        if prompt.contains("one question per line") {
            if prompt.contains("Addendum 7") {
                return Ok("What is the contracted hourly rate for trade X?\n\
                           Are additional hours billable per the site log?"
                    .to_string());
            }
            // Nothing to ask about an empty addendum.
            return Ok("\n".to_string());
        }
        if prompt.contains("Correction instructions from the auditor") {
            return Ok("## Summary\n- Corrected: the measured quantity is 12 hours, \
                       not 10.\n## VOB Compliance Check\ncompliant\n\
                       ## Technical and Price Check\n12 x 48 = 576\n\
                       ## Recommendation\naccept at 576"
                .to_string());
        }
        if prompt.contains("Addendum under audit") {
            if prompt.contains("Addendum 7") {
                return Ok("## Summary\n- 10 additional hours at the contracted \
                           rate of 48.\n## VOB Compliance Check\ncompliant\n\
                           ## Technical and Price Check\n10 x 48 = 480, matches \
                           the reference rate.\n## Recommendation\naccept"
                    .to_string());
            }
            return Ok("## Summary\n- The addendum contains no substantive \
                       content to audit.\n## VOB Compliance Check\nnot assessable\n\
                       ## Technical and Price Check\nnot assessable\n\
                       ## Recommendation\nrequest a complete addendum"
                .to_string());
        }
        Err(ProviderError::EmptyResponse(
            "unexpected prompt in test".to_string(),
        ))
    }

    async fn generate_structured(
        &self,
        _model: &str,
        prompt: &str,
        _schema: &serde_json::Value,
        _config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let call = self.structured_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_structured_calls.contains(&call) {
            return Err(ProviderError::Api {
                status: 500,
                body: "scripted failure".to_string(),
            });
        }
        if prompt.contains("12 not 10") {
            return Ok(r#"{
                "vob_check": "compliant",
                "technical_review": "plausible with corrected quantity",
                "price_check": "12 hours at the contracted rate of 48",
                "corrected_total": "576 EUR",
                "recommendation": "accept at the corrected total",
                "next_steps": "update the quantity to 12 and approve"
            }"#
            .to_string());
        }
        Ok(r#"{
            "vob_check": "compliant",
            "technical_review": "plausible",
            "price_check": "matches the contracted rate of 48 per hour",
            "corrected_total": "480 EUR",
            "recommendation": "accept",
            "next_steps": "approve and file the addendum"
        }"#
        .to_string())
    }
}

async fn pipeline_with(provider: AuditProvider) -> (PipelineContext, String) {
    let index = Arc::new(VectorIndex::new(Arc::new(HashEmbedder::default()), 400));
    let project = collection_id("acme", "tower renovation");
    let documents = BTreeMap::from([("contract.txt".to_string(), REFERENCE_DOC.to_string())]);
    index.reindex(&project, &documents).await.expect("reindex");

    let gateway = Arc::new(ModelGateway::new(
        Arc::new(provider),
        GatewayConfig {
            attempts_per_model: 1,
            backoff_cap_secs: 1,
            candidates: Some(vec!["mock-flash".to_string()]),
        },
    ));
    let context = PipelineContext::new(index, gateway, Arc::new(ResultCache::new()));
    (context, project)
}

#[tokio::test]
async fn audit_confirms_a_consistent_price() {
    let (pipeline, project) = pipeline_with(AuditProvider::new()).await;

    let session = pipeline
        .run_audit(&project, "No surcharges above the contracted rates.", ADDENDUM)
        .await
        .expect("audit");

    assert_eq!(session.questions.len(), 2);
    assert!(session.context.contains("Result for 'What is the contracted hourly rate"));
    assert!(session.context.contains("hourly rate is 48"));

    let report = session.report.as_deref().expect("report");
    assert!(report.contains("480"));

    let summary = session.summary.expect("summary");
    assert!(summary.corrected_total.contains("480"));
    assert!(!summary.price_check.to_lowercase().contains("discrepancy"));
}

#[tokio::test]
async fn empty_addendum_degrades_but_still_reports() {
    let (pipeline, project) = pipeline_with(AuditProvider::new()).await;

    let session = pipeline.run_audit(&project, "", "").await.expect("audit");

    assert!(session.questions.is_empty());
    assert!(session.context.starts_with("Result for direct addendum search:"));
    let report = session.report.as_deref().expect("report");
    assert!(report.contains("no substantive content"));
}

#[tokio::test]
async fn revision_replaces_report_and_summary_keeping_the_fingerprint() {
    let (pipeline, project) = pipeline_with(AuditProvider::new()).await;

    let mut session = pipeline
        .run_audit(&project, "", ADDENDUM)
        .await
        .expect("audit");
    let original_fingerprint = session.fingerprint.clone();
    assert!(session.report.as_deref().unwrap().contains("accept"));

    pipeline
        .revise(&mut session, "the measured quantity is 12 not 10", "")
        .await
        .expect("revise");

    assert_eq!(session.fingerprint, original_fingerprint);
    assert_eq!(session.fingerprint, Fingerprint::of_text(ADDENDUM));
    assert!(session.report.as_deref().unwrap().contains("12"));
    let summary = session.summary.expect("summary after revision");
    assert!(summary.corrected_total.contains("576"));
}

#[tokio::test]
async fn failed_summary_is_pending_and_manually_retryable() {
    let (pipeline, project) = pipeline_with(AuditProvider::failing_summaries(1)).await;

    let mut session = pipeline
        .run_audit(&project, "", ADDENDUM)
        .await
        .expect("audit");
    assert!(session.summary_pending());
    assert!(session.report.is_some());

    pipeline
        .retry_summary(&mut session, "")
        .await
        .expect("retry");
    assert!(session.summary.is_some());
    assert!(!session.summary_pending());
}

#[tokio::test]
async fn corrections_stay_in_force_for_summary_retries() {
    // Structured calls: 1 = initial audit, 2 = revision (fails), 3 = retry.
    let (pipeline, project) = pipeline_with(AuditProvider::failing_summary_call(2)).await;

    let mut session = pipeline
        .run_audit(&project, "", ADDENDUM)
        .await
        .expect("audit");
    assert!(session.summary.is_some());

    pipeline
        .revise(&mut session, "the measured quantity is 12 not 10", "")
        .await
        .expect("revise");
    assert!(session.summary_pending());

    pipeline
        .retry_summary(&mut session, "")
        .await
        .expect("retry");
    let summary = session.summary.expect("summary after retry");
    assert!(summary.corrected_total.contains("576"));
}

#[tokio::test]
async fn rerunning_the_same_addendum_hits_the_cache() {
    let (pipeline, project) = pipeline_with(AuditProvider::new()).await;

    let first = pipeline.run_audit(&project, "", ADDENDUM).await.expect("audit");
    let second = pipeline.run_audit(&project, "", ADDENDUM).await.expect("audit");

    assert_eq!(first.questions, second.questions);
    assert_eq!(first.report, second.report);
}
