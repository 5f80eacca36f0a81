use crate::error::MergeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelId(pub i64);

/// Identifies one association (e.g. a file) that points at a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A managed file as seen by the engine. Read-only snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub path: PathBuf,
    pub size: u64,
    /// Text produced by an upstream extraction pipeline, if any.
    pub text: Option<String>,
}

impl Item {
    pub fn new(id: i64, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            id: ItemId(id),
            path: path.into(),
            size,
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// 256-bit content digest used as the exact-duplicate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; 32]);

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFingerprint {
    pub exact_digest: Option<ContentDigest>,
    pub near_hash: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateKind {
    Exact,
    Near,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Digest(ContentDigest),
    SimHash(u64),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Digest(d) => write!(f, "{}", d),
            GroupKey::SimHash(h) => write!(f, "{:016x}", h),
        }
    }
}

/// Items considered identical (or nearly so) under `key`. Never a singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub key: GroupKey,
    pub kind: DuplicateKind,
    pub members: Vec<Item>,
}

impl DuplicateGroup {
    /// Bytes freed by keeping only the largest member.
    pub fn reclaimable_bytes(&self) -> u64 {
        let total: u64 = self.members.iter().map(|m| m.size).sum();
        let largest = self.members.iter().map(|m| m.size).max().unwrap_or(0);
        total - largest
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Unreadable(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub item: ItemId,
    pub reason: SkipReason,
}

/// Duplicate groups plus the items that could not take part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupReport {
    pub groups: Vec<DuplicateGroup>,
    pub skipped: Vec<SkippedItem>,
}

/// What a label names. Only labels of equal kind are ever compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelKind {
    Tag,
    Folder { parent: Option<i64> },
}

impl LabelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelKind::Tag => "tag",
            LabelKind::Folder { .. } => "folder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub kind: LabelKind,
    pub text: String,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarityBasis {
    ExactCaseFold,
    Synonym,
    Containment,
    Affix,
    EditDistance,
    /// Proposed by a suggestion oracle rather than a local heuristic.
    Suggested,
}

impl fmt::Display for SimilarityBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimilarityBasis::ExactCaseFold => "exact-case-fold",
            SimilarityBasis::Synonym => "synonym",
            SimilarityBasis::Containment => "containment",
            SimilarityBasis::Affix => "affix",
            SimilarityBasis::EditDistance => "edit-distance",
            SimilarityBasis::Suggested => "suggested",
        };
        f.write_str(s)
    }
}

/// Two distinct, comparable labels and how alike they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPair {
    pub a: Label,
    pub b: Label,
    pub score: f64,
    pub basis: SimilarityBasis,
    pub note: Option<String>,
}

impl SimilarityPair {
    /// Order-independent identity of the pair.
    pub fn identity(&self) -> (LabelId, LabelId) {
        if self.a.id <= self.b.id {
            (self.a.id, self.b.id)
        } else {
            (self.b.id, self.a.id)
        }
    }
}

/// `target` survives; `source` is deleted when the suggestion is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSuggestion {
    pub source: Label,
    pub target: Label,
    pub score: f64,
    pub basis: SimilarityBasis,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub success: bool,
    pub affected_references: usize,
    pub error: Option<MergeError>,
}

impl MergeOutcome {
    pub fn succeeded(affected_references: usize) -> Self {
        Self {
            success: true,
            affected_references,
            error: None,
        }
    }

    pub fn failed(error: MergeError) -> Self {
        Self {
            success: false,
            affected_references: 0,
            error: Some(error),
        }
    }
}
