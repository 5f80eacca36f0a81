use crate::model::{Label, LabelId, MergeSuggestion, SimilarityBasis, SimilarityPair};
use ahash::AHashMap;
use std::cmp::Ordering;

/// Turn similarity pairs into ordered merge suggestions.
///
/// Pairs are deduplicated by unordered identity, keeping the higher score.
/// The label with more usage survives; on a tie the older one does, and on a
/// full tie the lower id. Output is sorted by descending score.
pub fn rank(pairs: Vec<SimilarityPair>) -> Vec<MergeSuggestion> {
    let mut best: AHashMap<(LabelId, LabelId), SimilarityPair> = AHashMap::new();
    for pair in pairs {
        if pair.a.id == pair.b.id {
            continue;
        }
        let key = pair.identity();
        match best.get(&key) {
            Some(existing) if existing.score >= pair.score => {}
            _ => {
                best.insert(key, pair);
            }
        }
    }

    let mut suggestions: Vec<MergeSuggestion> = best.into_values().map(into_suggestion).collect();
    suggestions.sort_by(|x, y| {
        y.score
            .partial_cmp(&x.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| x.target.id.cmp(&y.target.id))
            .then_with(|| x.source.id.cmp(&y.source.id))
    });
    suggestions
}

/// Which of two labels survives a merge.
pub fn survivor_order(x: &Label, y: &Label) -> Ordering {
    y.usage_count
        .cmp(&x.usage_count)
        .then_with(|| x.created_at.cmp(&y.created_at))
        .then_with(|| x.id.cmp(&y.id))
}

fn into_suggestion(pair: SimilarityPair) -> MergeSuggestion {
    let (target, source) = if survivor_order(&pair.a, &pair.b) == Ordering::Greater {
        (pair.b, pair.a)
    } else {
        (pair.a, pair.b)
    };
    let rationale = rationale(&source, &target, pair.basis, pair.note.as_deref());
    MergeSuggestion {
        source,
        target,
        score: pair.score,
        basis: pair.basis,
        rationale,
    }
}

fn rationale(source: &Label, target: &Label, basis: SimilarityBasis, note: Option<&str>) -> String {
    let why = match basis {
        SimilarityBasis::ExactCaseFold => "differ only in letter case".to_string(),
        SimilarityBasis::Synonym => "are listed as synonyms".to_string(),
        SimilarityBasis::Containment => "one name contains the other".to_string(),
        SimilarityBasis::Affix => "share a long common prefix".to_string(),
        SimilarityBasis::EditDistance => "are spelled almost the same".to_string(),
        SimilarityBasis::Suggested => note.unwrap_or("were proposed by a suggestion oracle").to_string(),
    };
    format!(
        "\"{}\" and \"{}\" {}; keeping \"{}\" ({} uses)",
        source.text, target.text, why, target.text, target.usage_count
    )
}
