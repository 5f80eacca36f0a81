use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_MIN_SIMILARITY: f64 = 0.7;
pub const DEFAULT_MAX_HAMMING_DISTANCE: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub root_paths: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub database_path: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            database_path: "super_tidy.db".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

/// Thresholds and toggles for a single engine instance.
///
/// Passed explicitly into [`crate::SimilarityEngine`]; nothing in the engine
/// reads ambient settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum edit-distance similarity for two labels to be reported.
    pub min_similarity: f64,
    /// Maximum SimHash bit distance for two texts to cluster together.
    pub max_hamming_distance: u32,
    /// Fingerprinting pool size. 0 uses one worker per core.
    pub worker_threads: usize,
    /// Files larger than this are not read as text by the CLI scanner.
    pub max_text_bytes: u64,
    /// Extensions the CLI scanner treats as plain text.
    pub text_extensions: Vec<String>,
    /// Synonym groups appended to the built-in table.
    pub extra_synonyms: Vec<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            max_hamming_distance: DEFAULT_MAX_HAMMING_DISTANCE,
            worker_threads: 0,
            max_text_bytes: 1024 * 1024,
            text_extensions: ["txt", "md", "csv", "log", "json", "html"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extra_synonyms: Vec::new(),
        }
    }
}

/// Load `Config.toml` (optional) layered under `SUPER_TIDY__*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("SUPER_TIDY")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("root_paths")
                .with_list_parse_key("ignore_patterns")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Drop roots nested inside other roots so no directory is walked twice.
pub fn non_overlapping_directories(dirs: &[String]) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = dirs.iter().map(PathBuf::from).collect();
    candidates.sort_by_key(|p| p.components().count());

    let mut kept: Vec<PathBuf> = Vec::new();
    for dir in candidates {
        let nested = kept.iter().any(|root: &PathBuf| dir.starts_with(root));
        if !nested {
            kept.push(dir);
        }
    }
    kept
}

pub fn has_text_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
