use crate::cache::ResultCache;
use crate::context::build_context;
use crate::error::{PipelineError, Result};
use crate::fingerprint::Fingerprint;
use crate::question::{propose_questions, DEFAULT_MAX_QUESTIONS};
use crate::report::{generate_report, revise_report};
use crate::session::AuditSession;
use crate::summary::extract_summary;
use dossier_model_gateway::ModelGateway;
use dossier_vector_index::VectorIndex;
use std::sync::Arc;

/// Shared handles every pipeline stage runs against.
///
/// There is no ambient global state: one context is built at startup and
/// passed explicitly wherever the pipeline runs.
pub struct PipelineContext {
    index: Arc<VectorIndex>,
    gateway: Arc<ModelGateway>,
    cache: Arc<ResultCache>,
}

impl PipelineContext {
    pub fn new(
        index: Arc<VectorIndex>,
        gateway: Arc<ModelGateway>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            index,
            gateway,
            cache,
        }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    /// Run the full audit pipeline for one addendum.
    ///
    /// Questions and the report are cached per fingerprint, so re-running the
    /// same addendum skips the model calls. Question-stage exhaustion
    /// degrades to economy-mode retrieval; a failed summary leaves the
    /// session with `summary == None` (pending); only report-stage
    /// exhaustion aborts.
    pub async fn run_audit(
        &self,
        project_id: &str,
        notes: &str,
        addendum_text: &str,
    ) -> Result<AuditSession> {
        let fingerprint = Fingerprint::of_text(addendum_text);
        log::info!("Audit {fingerprint} started for project '{project_id}'");
        let mut session = AuditSession::new(fingerprint.clone(), addendum_text.to_string());

        session.questions = match self
            .cache
            .questions_or_compute(&fingerprint, || {
                propose_questions(&self.gateway, addendum_text, DEFAULT_MAX_QUESTIONS)
            })
            .await
        {
            Ok(questions) => questions,
            Err(err) => {
                log::warn!("Question generation failed, continuing without targeted queries: {err}");
                Vec::new()
            }
        };

        session.context =
            build_context(&self.index, project_id, &session.questions, addendum_text).await;

        let report = self
            .cache
            .report_or_compute(&fingerprint, || {
                generate_report(&self.gateway, notes, addendum_text, &session.context)
            })
            .await?;
        session.report = Some(report);

        match extract_summary(
            &self.gateway,
            notes,
            addendum_text,
            &session.context,
            session.report.as_deref().unwrap_or_default(),
            "",
        )
        .await
        {
            Ok(summary) => session.summary = Some(summary),
            Err(err) => {
                log::warn!("Summary unavailable, leaving it pending: {err}");
                session.summary = None;
            }
        }

        log::info!(
            "Audit {fingerprint} finished (summary {})",
            if session.summary.is_some() { "ready" } else { "pending" }
        );
        Ok(session)
    }

    /// Re-run only the summary stage, after a pending-summary audit.
    ///
    /// Corrections from the latest revision stay in force: they are replayed
    /// as a summary source, not just inherited through the revised report.
    pub async fn retry_summary(&self, session: &mut AuditSession, notes: &str) -> Result<()> {
        let report = session.report.as_deref().ok_or(PipelineError::MissingReport)?;
        let summary = extract_summary(
            &self.gateway,
            notes,
            &session.addendum_text,
            &session.context,
            report,
            &session.corrections,
        )
        .await?;
        session.summary = Some(summary);
        Ok(())
    }

    /// Fold the auditor's corrections into a new report and summary.
    ///
    /// If report regeneration fails the session is left untouched. If only
    /// the summary fails, the new report is installed and the summary
    /// becomes pending rather than keeping a stale one.
    pub async fn revise(
        &self,
        session: &mut AuditSession,
        corrections: &str,
        notes: &str,
    ) -> Result<()> {
        if corrections.trim().is_empty() {
            return Err(PipelineError::EmptyCorrections);
        }
        let prior_report = session.report.as_deref().ok_or(PipelineError::MissingReport)?;

        let new_report = revise_report(
            &self.gateway,
            notes,
            &session.addendum_text,
            &session.context,
            prior_report,
            corrections,
        )
        .await?;
        self.cache.put_report(&session.fingerprint, new_report.clone());
        session.report = Some(new_report);
        session.corrections = corrections.to_string();

        match extract_summary(
            &self.gateway,
            notes,
            &session.addendum_text,
            &session.context,
            session.report.as_deref().unwrap_or_default(),
            corrections,
        )
        .await
        {
            Ok(summary) => session.summary = Some(summary),
            Err(err) => {
                log::warn!("Summary regeneration failed after revision, leaving it pending: {err}");
                session.summary = None;
            }
        }
        Ok(())
    }
}
