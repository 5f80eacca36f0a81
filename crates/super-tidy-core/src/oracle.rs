//! Optional out-of-band merge proposals.
//!
//! An oracle looks at a set of comparable labels and proposes pairs that the
//! local heuristics may have missed. Its pairs are ranked exactly like locally
//! computed ones. The engine never performs I/O here: a remote backend talks
//! through a caller-supplied [`OracleTransport`].

use crate::error::OracleError;
use crate::model::{Label, LabelId, SimilarityBasis, SimilarityPair};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

pub trait SuggestionOracle: Send + Sync {
    fn name(&self) -> &str;

    fn propose(&self, labels: &[Label]) -> Result<Vec<SimilarityPair>, OracleError>;
}

/// The available backends.
pub enum Oracle {
    Disabled,
    Local(LocalOracle),
    Remote(RemoteOracle),
}

impl SuggestionOracle for Oracle {
    fn name(&self) -> &str {
        match self {
            Oracle::Disabled => "disabled",
            Oracle::Local(o) => o.name(),
            Oracle::Remote(o) => o.name(),
        }
    }

    fn propose(&self, labels: &[Label]) -> Result<Vec<SimilarityPair>, OracleError> {
        match self {
            Oracle::Disabled => Ok(Vec::new()),
            Oracle::Local(o) => o.propose(labels),
            Oracle::Remote(o) => o.propose(labels),
        }
    }
}

// ── Local ────────────────────────────────────────────────────────

/// Proposes merges from user-curated alias groups, e.g. "taxes" ~ "irs".
pub struct LocalOracle {
    aliases: Vec<Vec<String>>,
    confidence: f64,
}

impl LocalOracle {
    pub fn new(aliases: Vec<Vec<String>>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|group| group.into_iter().map(|s| s.to_lowercase()).collect())
            .collect();
        Self {
            aliases,
            confidence: 0.9,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

impl SuggestionOracle for LocalOracle {
    fn name(&self) -> &str {
        "local"
    }

    fn propose(&self, labels: &[Label]) -> Result<Vec<SimilarityPair>, OracleError> {
        let mut pairs = Vec::new();
        for (group_idx, group) in self.aliases.iter().enumerate() {
            let members: Vec<&Label> = labels
                .iter()
                .filter(|l| group.contains(&l.text.to_lowercase()))
                .collect();
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    if a.id == b.id || a.kind != b.kind {
                        continue;
                    }
                    pairs.push(SimilarityPair {
                        a: (*a).clone(),
                        b: (*b).clone(),
                        score: self.confidence,
                        basis: SimilarityBasis::Suggested,
                        note: Some(format!("listed together in alias group {}", group_idx + 1)),
                    });
                }
            }
        }
        Ok(pairs)
    }
}

// ── Remote ───────────────────────────────────────────────────────

/// Carries one JSON request to a backend and returns its JSON reply.
pub trait OracleTransport: Send + Sync {
    fn exchange(&self, request: &str) -> Result<String, OracleError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OracleRequest {
    pub labels: Vec<OracleLabel>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OracleLabel {
    pub id: i64,
    pub text: String,
    pub usage_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OracleResponse {
    #[serde(default)]
    pub merges: Vec<ProposedMerge>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProposedMerge {
    pub a: i64,
    pub b: i64,
    pub confidence: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

pub struct RemoteOracle {
    name: String,
    transport: Box<dyn OracleTransport>,
}

impl RemoteOracle {
    pub fn new(name: impl Into<String>, transport: Box<dyn OracleTransport>) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }
}

impl SuggestionOracle for RemoteOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&self, labels: &[Label]) -> Result<Vec<SimilarityPair>, OracleError> {
        let request = OracleRequest {
            labels: labels
                .iter()
                .map(|l| OracleLabel {
                    id: l.id.0,
                    text: l.text.clone(),
                    usage_count: l.usage_count,
                })
                .collect(),
        };
        let reply = self.transport.exchange(&serde_json::to_string(&request)?)?;
        let response: OracleResponse = serde_json::from_str(&reply)?;

        let by_id: AHashMap<LabelId, &Label> = labels.iter().map(|l| (l.id, l)).collect();
        let mut pairs = Vec::new();
        for merge in response.merges {
            let (Some(a), Some(b)) = (by_id.get(&LabelId(merge.a)), by_id.get(&LabelId(merge.b))) else {
                debug!("{} proposed unknown labels {} / {}", self.name, merge.a, merge.b);
                continue;
            };
            if a.id == b.id || a.kind != b.kind || !merge.confidence.is_finite() {
                continue;
            }
            pairs.push(SimilarityPair {
                a: (*a).clone(),
                b: (*b).clone(),
                score: merge.confidence.clamp(0.0, 1.0),
                basis: SimilarityBasis::Suggested,
                note: merge.reason,
            });
        }
        Ok(pairs)
    }
}

// ── Retry ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// Wraps any oracle and retries transient failures with doubling backoff.
pub struct Retryable<O> {
    inner: O,
    policy: RetryPolicy,
}

impl<O: SuggestionOracle> Retryable<O> {
    pub fn new(inner: O, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<O: SuggestionOracle> SuggestionOracle for Retryable<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn propose(&self, labels: &[Label]) -> Result<Vec<SimilarityPair>, OracleError> {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.inner.propose(labels) {
                Ok(pairs) => return Ok(pairs),
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    warn!(
                        "Oracle {} attempt {}/{} failed: {}",
                        self.inner.name(),
                        attempt,
                        self.policy.max_attempts,
                        e
                    );
                    thread::sleep(backoff);
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
