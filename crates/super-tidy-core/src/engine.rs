use crate::analysis::{self, NameSimilarityScorer};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::hasher::batch::run_batch;
use crate::hasher::{self, CancelFlag, FingerprintBatch};
use crate::model::{GroupReport, Item, Label, LabelKind, MergeSuggestion, SimilarityPair};
use crate::oracle::SuggestionOracle;
use crate::progress::{ProgressReporter, SilentReporter};
use crate::source::FileSource;
use crate::storage::RecordStore;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Entry point for duplicate detection and label similarity.
///
/// Owns a bounded fingerprinting pool; every analysis runs over the snapshot
/// passed in and never holds a live reference into a record store.
pub struct SimilarityEngine {
    config: EngineConfig,
    pool: ThreadPool,
    scorer: NameSimilarityScorer,
    cancel: CancelFlag,
    reporter: Arc<dyn ProgressReporter>,
}

impl SimilarityEngine {
    pub fn new(config: EngineConfig) -> Result<Self, Error> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("fingerprint-{}", i))
            .build()?;
        let scorer = NameSimilarityScorer::new(config.min_similarity)
            .with_synonyms(config.extra_synonyms.iter().cloned());
        debug!("Engine started with {} fingerprint workers", pool.current_num_threads());
        Ok(Self {
            config,
            pool,
            scorer,
            cancel: CancelFlag::new(),
            reporter: Arc::new(SilentReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Full fingerprints (digest + near hash) for every item.
    pub fn fingerprint_all(&self, items: &[Item], source: &dyn FileSource) -> FingerprintBatch {
        hasher::fingerprint_batch(&self.pool, items, source, &self.cancel, self.reporter.as_ref())
    }

    pub fn find_exact_duplicates(&self, items: &[Item], source: &dyn FileSource) -> GroupReport {
        let start = Instant::now();
        let report = analysis::group_exact(&self.pool, items, source, &self.cancel, self.reporter.as_ref());
        info!(
            "{} exact duplicate groups among {} items in {:.2}s ({} skipped)",
            report.groups.len(),
            items.len(),
            start.elapsed().as_secs_f64(),
            report.skipped.len()
        );
        report
    }

    pub fn find_near_duplicates(&self, items: &[Item]) -> GroupReport {
        self.find_near_duplicates_within(items, self.config.max_hamming_distance)
    }

    /// Near-duplicate clusters among items that carry text. Items without
    /// text, or whose text has no tokens, are simply not eligible.
    pub fn find_near_duplicates_within(&self, items: &[Item], max_distance: u32) -> GroupReport {
        let start = Instant::now();
        let with_text: Vec<Item> = items.iter().filter(|i| i.text.is_some()).cloned().collect();

        let (hashes, skipped) = run_batch(&self.pool, &with_text, &self.cancel, self.reporter.as_ref(), |item| {
            Ok(item.text.as_deref().and_then(hasher::near_hash))
        });
        let hashed: Vec<(Item, u64)> = hashes
            .into_iter()
            .filter_map(|(idx, hash)| hash.map(|h| (with_text[idx].clone(), h)))
            .collect();

        let groups = analysis::cluster_near(&hashed, max_distance);
        self.reporter.on_grouping_complete("near", groups.len());
        info!(
            "{} near duplicate groups among {} text items in {:.2}s",
            groups.len(),
            hashed.len(),
            start.elapsed().as_secs_f64()
        );
        GroupReport { groups, skipped }
    }

    pub fn find_similar_labels(&self, labels: &[Label]) -> Vec<SimilarityPair> {
        analysis::find_similar_labels(labels, &self.scorer)
    }

    pub fn find_similar_labels_above(&self, labels: &[Label], min_similarity: f64) -> Vec<SimilarityPair> {
        let scorer = self.scorer.clone().with_min_similarity(min_similarity);
        analysis::find_similar_labels(labels, &scorer)
    }

    pub fn rank_suggestions(&self, pairs: Vec<SimilarityPair>) -> Vec<MergeSuggestion> {
        analysis::rank(pairs)
    }

    /// Local heuristics plus oracle proposals for one kind of label, ranked.
    ///
    /// An oracle failure is logged and the local suggestions are still returned.
    pub fn suggest_label_merges<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        kind: &LabelKind,
        oracle: &dyn SuggestionOracle,
    ) -> Result<Vec<MergeSuggestion>, Error> {
        let labels = store.all_labels(kind)?;
        let mut pairs = self.find_similar_labels(&labels);

        match oracle.propose(&labels) {
            Ok(extra) => {
                debug!("Oracle {} proposed {} pairs", oracle.name(), extra.len());
                pairs.extend(extra);
            }
            Err(e) => warn!("Oracle {} failed, using local suggestions only: {}", oracle.name(), e),
        }

        Ok(self.rank_suggestions(pairs))
    }
}
