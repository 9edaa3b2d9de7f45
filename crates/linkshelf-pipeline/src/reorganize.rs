//! The reorganize entry point: fetch, classify, plan, commit.
//!
//! Orchestration only. All document mutation decisions live in the pure
//! engine; this module feeds it classifications and hands the resulting
//! batch to the store. Content fetching is the one concurrent stage, and
//! results are joined back in document order before planning starts.

use futures::future::join_all;
use relative_path::RelativePath;
use thiserror::Error;

use linkshelf_engine::{
    BatchPlan, Classified, DocumentStore, LinkRef, Outline, ParseError, PlanError, Resolver,
    StoreError, plan_batch,
};

use crate::classifier::{Classifier, ClassifyError, ClassifyItem, RawClassification};
use crate::fetcher::{ContentFetcher, is_video_url};

const VIDEO_ANNOTATION: &str = "[video - not summarized]";

#[derive(Debug, Clone, Copy)]
pub struct ReorganizeSettings {
    /// Links per classifier call.
    pub batch_size: usize,
    /// Extra attempts after a failed classifier call.
    pub max_retries: usize,
}

impl Default for ReorganizeSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_retries: 2,
        }
    }
}

/// What one run did, for the caller to report.
#[derive(Debug, Default, PartialEq)]
pub struct RunSummary {
    pub moved: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ReorganizeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Ties a document store, a content fetcher and a classifier together
/// around the pure planning core.
pub struct Reorganizer<S, F, C> {
    store: S,
    fetcher: F,
    classifier: C,
    resolver: Resolver,
    fallback_heading: String,
    settings: ReorganizeSettings,
}

impl<S, F, C> Reorganizer<S, F, C>
where
    S: DocumentStore,
    F: ContentFetcher,
    C: Classifier,
{
    pub fn new(
        store: S,
        fetcher: F,
        classifier: C,
        resolver: Resolver,
        fallback_heading: String,
        settings: ReorganizeSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            classifier,
            resolver,
            fallback_heading,
            settings,
        }
    }

    /// Classify and plan without committing. Used by dry runs and by
    /// [`Self::reorganize`].
    pub async fn plan(&self, id: &RelativePath) -> Result<(BatchPlan, Vec<String>), ReorganizeError> {
        let bytes = self.store.fetch(id)?;
        let outline = Outline::from_bytes(&bytes, &self.fallback_heading)?;
        let (classified, mut errors) = self.classify_unsorted(&outline).await;
        let plan = plan_batch(&outline, &self.resolver, &classified)?;
        for url in &plan.fallback_misses {
            errors.push(format!(
                "{url}: no heading matched, left under {}",
                self.fallback_heading
            ));
        }
        Ok((plan, errors))
    }

    /// Reorganize one document and commit the result atomically.
    pub async fn reorganize(&self, id: &RelativePath) -> Result<RunSummary, ReorganizeError> {
        let (plan, errors) = self.plan(id).await?;
        if !plan.ops.is_empty() {
            self.store.commit(id, &plan.ops)?;
        }
        tracing::info!(
            moved = plan.moved,
            skipped = plan.skipped.len(),
            errors = errors.len(),
            "reorganize finished"
        );
        Ok(RunSummary {
            moved: plan.moved,
            skipped: plan.skipped.len(),
            errors,
        })
    }

    /// Classify every link currently sitting under the fallback heading,
    /// batch by batch. Classification failures degrade to empty
    /// classifications, which resolve back to the fallback heading.
    async fn classify_unsorted(&self, outline: &Outline) -> (Vec<Classified>, Vec<String>) {
        let fallback = outline.fallback();
        let unsorted: Vec<LinkRef> = outline
            .links()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.owner == fallback)
            .map(|(i, _)| LinkRef(i))
            .collect();
        let candidates: Vec<String> = outline
            .headings()
            .iter()
            .filter(|h| !h.synthetic && !h.text.eq_ignore_ascii_case(&self.fallback_heading))
            .map(|h| h.text.clone())
            .collect();

        let mut classified = Vec::new();
        let mut errors = Vec::new();
        if unsorted.is_empty() || candidates.is_empty() {
            if !unsorted.is_empty() {
                tracing::info!("no candidate headings; links stay unsorted");
            }
            return (classified, errors);
        }

        for chunk in unsorted.chunks(self.settings.batch_size) {
            let fetcher = &self.fetcher;
            let excerpts: Vec<String> = join_all(chunk.iter().map(|&r| {
                let url = outline.link(r).url.clone();
                async move {
                    if is_video_url(&url) {
                        String::new()
                    } else {
                        fetcher.fetch(&url).await
                    }
                }
            }))
            .await;

            let items: Vec<ClassifyItem> = chunk
                .iter()
                .zip(&excerpts)
                .map(|(&r, excerpt)| ClassifyItem {
                    url: outline.link(r).url.clone(),
                    excerpt: excerpt.clone(),
                })
                .collect();

            match self.classify_with_retry(&items, &candidates).await {
                Ok(raw) => {
                    for (i, &r) in chunk.iter().enumerate() {
                        let rc = raw.get(i).cloned().unwrap_or_default();
                        let annotation = if is_video_url(&outline.link(r).url) {
                            VIDEO_ANNOTATION.to_string()
                        } else {
                            rc.annotation
                        };
                        classified.push(Classified {
                            link: r,
                            raw_category: rc.raw_category,
                            annotation,
                        });
                    }
                }
                Err(e) => {
                    errors.push(format!(
                        "classification failed for a batch of {} links: {e}",
                        chunk.len()
                    ));
                    classified.extend(chunk.iter().map(|&r| Classified {
                        link: r,
                        raw_category: String::new(),
                        annotation: String::new(),
                    }));
                }
            }
        }
        (classified, errors)
    }

    async fn classify_with_retry(
        &self,
        items: &[ClassifyItem],
        candidates: &[String],
    ) -> Result<Vec<RawClassification>, ClassifyError> {
        let mut attempt = 0;
        loop {
            match self.classifier.classify(items, candidates).await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.settings.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "classifier call failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
