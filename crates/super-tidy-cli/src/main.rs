mod commands;
mod logging;
mod progress;

use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::{Instant, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, KindArg};
use dotenv::dotenv;
use progress::CliReporter;
use super_tidy_core::config::non_overlapping_directories;
use super_tidy_core::model::{GroupReport, LabelId, LabelKind, MergeSuggestion, SimilarityBasis};
use super_tidy_core::oracle::{LocalOracle, Oracle};
use super_tidy_core::scanner::{build_items, TextPolicy};
use super_tidy_core::storage::{Database, RecordStore};
use super_tidy_core::{AppConfig, LocalFileSource, MergeExecutor, ProgressReporter, SimilarityEngine};
use tracing::{error, info};

fn main() -> Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match super_tidy_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Scan { max_distance }) => run_scan(&config, max_distance),
        Some(Commands::Labels {
            kind,
            parent,
            min_similarity,
            aliases,
        }) => run_labels(&config, kind, parent, min_similarity, &aliases),
        Some(Commands::Merge { source, target }) => run_merge(&config, LabelId(source), LabelId(target)),
        Some(Commands::Tag { path, name }) => run_tag(&config, &path, &name),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            Cli::command().print_long_help()?;
            Ok(())
        }
    }
}

fn run_scan(config: &AppConfig, max_distance: Option<u32>) -> Result<()> {
    if config.root_paths.is_empty() {
        bail!("no root_paths configured; set them in Config.toml or SUPER_TIDY__ROOT_PATHS");
    }
    let roots = non_overlapping_directories(&config.root_paths);
    let reporter = Arc::new(CliReporter::new());

    reporter.on_walk_start();
    let start = Instant::now();
    let text = TextPolicy {
        extensions: config.engine.text_extensions.clone(),
        max_bytes: config.engine.max_text_bytes,
    };
    let items = build_items(&roots, &config.ignore_patterns, &text).context("walking root paths")?;
    reporter.on_walk_complete(items.len(), start.elapsed().as_secs_f64());

    let engine = SimilarityEngine::new(config.engine.clone())?.with_reporter(reporter);

    let exact = engine.find_exact_duplicates(&items, &LocalFileSource);
    let near = match max_distance {
        Some(d) => engine.find_near_duplicates_within(&items, d),
        None => engine.find_near_duplicates(&items),
    };

    println!();
    print_groups("Exact duplicates", &exact);
    print_groups("Near duplicates", &near);

    let reclaimable: u64 = exact.groups.iter().map(|g| g.reclaimable_bytes()).sum();
    info!(
        "{} exact groups ({} bytes reclaimable), {} near groups, {} files skipped",
        format!("{}", exact.groups.len()).red(),
        format!("{}", reclaimable).red(),
        format!("{}", near.groups.len()).cyan(),
        format!("{}", exact.skipped.len() + near.skipped.len()).yellow(),
    );
    Ok(())
}

fn print_groups(title: &str, report: &GroupReport) {
    println!("{}", title.bold());
    if report.groups.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for group in &report.groups {
        println!(
            "  {} {} ({} files, {} bytes reclaimable)",
            "▸".cyan(),
            group.key,
            group.members.len(),
            group.reclaimable_bytes()
        );
        for member in &group.members {
            println!("      {}", member.path.display());
        }
    }
}

fn label_kind(kind: KindArg, parent: Option<i64>) -> LabelKind {
    match kind {
        KindArg::Tag => LabelKind::Tag,
        KindArg::Folder => LabelKind::Folder { parent },
    }
}

fn run_labels(
    config: &AppConfig,
    kind: KindArg,
    parent: Option<i64>,
    min_similarity: Option<f64>,
    aliases: &[String],
) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let mut engine_config = config.engine.clone();
    if let Some(min) = min_similarity {
        engine_config.min_similarity = min;
    }
    let engine = SimilarityEngine::new(engine_config)?;

    let oracle = if aliases.is_empty() {
        Oracle::Disabled
    } else {
        Oracle::Local(LocalOracle::new(
            aliases
                .iter()
                .map(|group| group.split(',').map(|s| s.trim().to_string()).collect())
                .collect(),
        ))
    };

    let kind = label_kind(kind, parent);
    let suggestions = engine.suggest_label_merges(&db, &kind, &oracle)?;

    if suggestions.is_empty() {
        println!("No {} merge suggestions", kind.as_str());
        return Ok(());
    }
    for s in &suggestions {
        println!(
            "{} {} → {}  [{} {:.2}]",
            "merge".green(),
            format!("#{} {}", s.source.id, s.source.text).yellow(),
            format!("#{} {}", s.target.id, s.target.text).green(),
            s.basis,
            s.score
        );
        println!("      {}", s.rationale.dimmed());
    }
    info!("{} suggestions for {} labels", suggestions.len(), kind.as_str());
    Ok(())
}

fn run_merge(config: &AppConfig, source: LabelId, target: LabelId) -> Result<()> {
    let db = Arc::new(Database::open(&config.database_path)?);
    let Some(source_label) = db.label(source)? else {
        bail!("label {} does not exist", source);
    };
    let Some(target_label) = db.label(target)? else {
        bail!("label {} does not exist", target);
    };

    let suggestion = MergeSuggestion {
        rationale: format!("\"{}\" merged into \"{}\" on request", source_label.text, target_label.text),
        source: source_label,
        target: target_label,
        score: 1.0,
        basis: SimilarityBasis::Suggested,
    };

    let outcome = MergeExecutor::new(db).execute(&suggestion);
    match outcome.error {
        None => {
            println!(
                "{} {} references moved to label {}",
                "✓".green(),
                outcome.affected_references,
                target
            );
            Ok(())
        }
        Some(e) => bail!(e),
    }
}

fn run_tag(config: &AppConfig, path: &Path, name: &str) -> Result<()> {
    let canonical = fs::canonicalize(path).with_context(|| format!("resolving {}", path.display()))?;
    let metadata = fs::metadata(&canonical)?;
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs() as i64);

    let db = Database::open(&config.database_path)?;
    let file_id = db.upsert_file(&canonical.to_string_lossy(), metadata.len() as i64, modified)?;
    let label = db.get_or_create_label(&LabelKind::Tag, name)?;
    if db.attach_label(file_id, label.id)? {
        println!("{} tagged {} with \"{}\"", "✓".green(), canonical.display(), name);
    } else {
        println!("{} already tagged \"{}\"", canonical.display(), name);
    }
    Ok(())
}
