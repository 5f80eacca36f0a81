//! Similarity detection and merge resolution for a personal file organizer.
//!
//! Finds exact and near-duplicate file content, finds redundant labels (tags
//! and folder names), and collapses an accepted pair of labels into one.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod merge;
pub mod model;
pub mod oracle;
pub mod progress;
pub mod scanner;
pub mod source;
pub mod storage;

pub use config::{AppConfig, EngineConfig};
pub use engine::SimilarityEngine;
pub use error::{Error, MergeError, OracleError};
pub use hasher::CancelFlag;
pub use merge::MergeExecutor;
pub use progress::{ProgressReporter, SilentReporter};
pub use source::{FileSource, LocalFileSource};
