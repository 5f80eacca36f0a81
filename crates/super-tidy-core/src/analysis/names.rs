//! Similarity between short label strings (tag and folder names).
//!
//! Heuristics run in a fixed order and the first one that fires decides both
//! the score and the basis; scores are never combined:
//!
//! 1. **ExactCaseFold**: equal after lowercasing, different as written (1.0)
//! 2. **Synonym**: both names in one synonym group (0.95)
//! 3. **Containment**: one name inside the other, covering ≥ 50% (0.85)
//! 4. **Affix**: shared prefix of ≥ 3 chars covering ≥ 60% (prefix / longer)
//! 5. **EditDistance**: `1 − levenshtein / max_len`, if ≥ `min_similarity`
//!
//! Lengths are counted in Unicode scalar values after NFC normalization, so a
//! precomposed `é` and `e` + combining acute both count as one character.

use crate::config::DEFAULT_MIN_SIMILARITY;
use crate::model::{Label, LabelId, LabelKind, SimilarityBasis, SimilarityPair};
use ahash::{AHashMap, AHashSet};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

pub const SCORE_EXACT_CASE_FOLD: f64 = 1.0;
pub const SCORE_SYNONYM: f64 = 0.95;
pub const SCORE_CONTAINMENT: f64 = 0.85;

const CONTAINMENT_MIN_RATIO: f64 = 0.5;
const AFFIX_MIN_PREFIX: usize = 3;
const AFFIX_MIN_RATIO: f64 = 0.6;

const BUILTIN_SYNONYMS: &[&[&str]] = &[
    &["ai", "人工智能", "artificial intelligence", "machine intelligence"],
    &["ml", "machine learning", "机器学习"],
    &["photo", "photos", "picture", "pictures", "image", "images", "照片", "图片"],
    &["video", "videos", "movie", "movies", "film", "视频"],
    &["music", "audio", "songs", "音乐"],
    &["doc", "docs", "document", "documents", "文档"],
    &["receipt", "receipts", "invoice", "invoices", "bill", "bills", "发票"],
    &["finance", "financial", "money", "财务"],
    &["work", "job", "office", "工作"],
    &["todo", "to-do", "tasks", "待办"],
    &["travel", "trip", "trips", "旅行"],
    &["personal", "private", "个人"],
    &["study", "learning", "school", "学习"],
    &["code", "source", "src", "源码"],
    &["download", "downloads", "下载"],
    &["archive", "archives", "backup", "backups", "归档"],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameScore {
    pub value: f64,
    pub basis: SimilarityBasis,
}

#[derive(Debug, Clone)]
pub struct NameSimilarityScorer {
    min_similarity: f64,
    /// normalized term → indices of the synonym groups containing it
    synonyms: AHashMap<String, Vec<usize>>,
}

impl Default for NameSimilarityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SIMILARITY)
    }
}

impl NameSimilarityScorer {
    pub fn new(min_similarity: f64) -> Self {
        let mut scorer = Self {
            min_similarity,
            synonyms: AHashMap::new(),
        };
        for group in BUILTIN_SYNONYMS {
            scorer.add_synonym_group(group.iter().copied());
        }
        scorer
    }

    /// Append user-defined synonym groups to the built-in table.
    pub fn with_synonyms<I, G, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for group in groups {
            self.add_synonym_group(group);
        }
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    fn add_synonym_group<G, S>(&mut self, group: G)
    where
        G: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let group_id = self.synonyms.values().flatten().max().map_or(0, |m| m + 1);
        for term in group {
            let ids = self.synonyms.entry(normalize(term.as_ref())).or_default();
            if !ids.contains(&group_id) {
                ids.push(group_id);
            }
        }
    }

    fn are_synonyms(&self, a: &str, b: &str) -> bool {
        match (self.synonyms.get(a), self.synonyms.get(b)) {
            (Some(ga), Some(gb)) => ga.iter().any(|g| gb.contains(g)),
            _ => false,
        }
    }

    /// Score two names. `None` means "not similar".
    pub fn score(&self, a: &str, b: &str) -> Option<NameScore> {
        let la = normalize(a);
        let lb = normalize(b);
        let len_a = la.chars().count();
        let len_b = lb.chars().count();
        // Empty labels are not meaningful, and would divide by zero below.
        if len_a == 0 || len_b == 0 {
            return None;
        }

        if la == lb && a != b {
            return Some(NameScore {
                value: SCORE_EXACT_CASE_FOLD,
                basis: SimilarityBasis::ExactCaseFold,
            });
        }

        if self.are_synonyms(&la, &lb) {
            return Some(NameScore {
                value: SCORE_SYNONYM,
                basis: SimilarityBasis::Synonym,
            });
        }

        let (shorter, longer, short_len, long_len) = if len_a <= len_b {
            (&la, &lb, len_a, len_b)
        } else {
            (&lb, &la, len_b, len_a)
        };

        if longer.contains(shorter.as_str()) {
            let ratio = short_len as f64 / long_len as f64;
            if ratio >= CONTAINMENT_MIN_RATIO {
                return Some(NameScore {
                    value: SCORE_CONTAINMENT,
                    basis: SimilarityBasis::Containment,
                });
            }
        }

        let prefix = common_prefix_len(&la, &lb);
        if prefix >= AFFIX_MIN_PREFIX {
            let ratio = prefix as f64 / long_len as f64;
            if ratio >= AFFIX_MIN_RATIO {
                return Some(NameScore {
                    value: ratio,
                    basis: SimilarityBasis::Affix,
                });
            }
        }

        let distance = levenshtein(&la, &lb);
        let value = 1.0 - distance as f64 / long_len as f64;
        if value >= self.min_similarity {
            return Some(NameScore {
                value,
                basis: SimilarityBasis::EditDistance,
            });
        }

        None
    }
}

/// Lowercase, then NFC so canonically equivalent spellings compare equal.
fn normalize(s: &str) -> String {
    s.to_lowercase().nfc().collect()
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Unit-cost Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Every similar pair among `labels`, compared only within the same kind.
///
/// Each unordered pair is scored once; a label listed twice is considered once.
pub fn find_similar_labels(labels: &[Label], scorer: &NameSimilarityScorer) -> Vec<SimilarityPair> {
    let mut seen: AHashSet<LabelId> = AHashSet::new();
    let mut kind_index: AHashMap<LabelKind, usize> = AHashMap::new();
    let mut partitions: Vec<Vec<&Label>> = Vec::new();

    for label in labels {
        if !seen.insert(label.id) {
            continue;
        }
        let slot = *kind_index.entry(label.kind).or_insert_with(|| {
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        partitions[slot].push(label);
    }

    let mut pairs = Vec::new();
    for partition in &partitions {
        for (i, a) in partition.iter().enumerate() {
            for b in &partition[i + 1..] {
                if let Some(score) = scorer.score(&a.text, &b.text) {
                    pairs.push(SimilarityPair {
                        a: (*a).clone(),
                        b: (*b).clone(),
                        score: score.value,
                        basis: score.basis,
                        note: None,
                    });
                }
            }
        }
    }

    debug!(
        "Compared {} labels in {} kind partitions, {} similar pairs",
        seen.len(),
        partitions.len(),
        pairs.len()
    );
    pairs
}
