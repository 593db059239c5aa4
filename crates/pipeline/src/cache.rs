use crate::error::Result;
use crate::fingerprint::Fingerprint;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

/// Per-fingerprint cache of expensive pipeline outputs.
///
/// Two namespaces, questions and reports, both keyed by the addendum's
/// content fingerprint. A hit returns the cached value without re-invoking
/// the model; failed computations are never cached. Entries live until the
/// process exits.
#[derive(Default)]
pub struct ResultCache {
    questions: Mutex<HashMap<Fingerprint, Vec<String>>>,
    reports: Mutex<HashMap<Fingerprint, String>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn questions_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<Vec<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        get_or_compute(&self.questions, fingerprint, "questions", compute).await
    }

    pub async fn report_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        get_or_compute(&self.reports, fingerprint, "report", compute).await
    }

    /// Overwrite the cached report, used after a successful revision so a
    /// re-render of the same addendum sees the revised text.
    pub fn put_report(&self, fingerprint: &Fingerprint, report: String) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fingerprint.clone(), report);
    }
}

async fn get_or_compute<T, F, Fut>(
    map: &Mutex<HashMap<Fingerprint, T>>,
    fingerprint: &Fingerprint,
    label: &str,
    compute: F,
) -> Result<T>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    // Guard dropped before the await: the lock only covers map access.
    {
        let cached = map.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = cached.get(fingerprint) {
            log::debug!("Cache hit for {label} ({fingerprint})");
            return Ok(value.clone());
        }
    }

    let value = compute().await?;
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(fingerprint.clone(), value.clone());
    log::debug!("Cached {label} for {fingerprint}");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, Stage};
    use dossier_model_gateway::GatewayError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn second_lookup_does_not_recompute() {
        let cache = ResultCache::new();
        let fingerprint = Fingerprint::of_text("addendum");
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let report = cache
                .report_or_compute(&fingerprint, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("the report".to_string())
                })
                .await
                .unwrap();
            assert_eq!(report, "the report");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_computations_are_not_cached() {
        let cache = ResultCache::new();
        let fingerprint = Fingerprint::of_text("addendum");
        let calls = AtomicUsize::new(0);

        let first = cache
            .questions_or_compute(&fingerprint, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::stage(
                    Stage::Questions,
                    GatewayError::NoCandidates,
                ))
            })
            .await;
        assert!(first.is_err());

        let second = cache
            .questions_or_compute(&fingerprint, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["q1".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(second, vec!["q1"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_fingerprints_are_isolated() {
        let cache = ResultCache::new();
        let a = Fingerprint::of_text("a");
        let b = Fingerprint::of_text("b");

        let first = cache
            .report_or_compute(&a, || async { Ok("report a".to_string()) })
            .await
            .unwrap();
        let second = cache
            .report_or_compute(&b, || async { Ok("report b".to_string()) })
            .await
            .unwrap();
        assert_eq!(first, "report a");
        assert_eq!(second, "report b");
    }

    #[tokio::test]
    async fn put_report_overwrites_the_cached_entry() {
        let cache = ResultCache::new();
        let fingerprint = Fingerprint::of_text("addendum");

        cache
            .report_or_compute(&fingerprint, || async { Ok("v1".to_string()) })
            .await
            .unwrap();
        cache.put_report(&fingerprint, "v2".to_string());

        let report = cache
            .report_or_compute(&fingerprint, || async {
                panic!("must not recompute");
            })
            .await
            .unwrap();
        assert_eq!(report, "v2");
    }
}
