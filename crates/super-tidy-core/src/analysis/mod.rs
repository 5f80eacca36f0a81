pub mod exact;
pub mod names;
pub mod near;
pub mod ranker;

pub use exact::group_exact;
pub use names::{find_similar_labels, levenshtein, NameScore, NameSimilarityScorer};
pub use near::cluster_near;
pub use ranker::rank;
