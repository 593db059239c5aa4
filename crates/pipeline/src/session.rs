use crate::fingerprint::Fingerprint;
use crate::summary::Summary;

/// One addendum's audit state, owned by the caller and threaded through the
/// pipeline stages.
///
/// A session stays revisable until a new addendum (different fingerprint)
/// supersedes it. `summary == None` while a report exists means the summary
/// step failed and is explicitly pending a manual retry.
#[derive(Debug, Clone)]
pub struct AuditSession {
    pub fingerprint: Fingerprint,
    pub addendum_text: String,
    pub questions: Vec<String>,
    pub context: String,
    pub report: Option<String>,
    pub summary: Option<Summary>,
    /// Corrections applied by the most recent successful revision; replayed
    /// as a summary source by later summary retries.
    pub corrections: String,
}

impl AuditSession {
    pub fn new(fingerprint: Fingerprint, addendum_text: String) -> Self {
        Self {
            fingerprint,
            addendum_text,
            questions: Vec::new(),
            context: String::new(),
            report: None,
            summary: None,
            corrections: String::new(),
        }
    }

    /// True when the report succeeded but the summary step did not.
    pub fn summary_pending(&self) -> bool {
        self.report.is_some() && self.summary.is_none()
    }
}
