use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "super-tidy")]
#[command(about = "Find duplicate files and redundant labels, and merge them", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Tag,
    Folder,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk configured roots and report exact and near-duplicate files
    Scan {
        /// Override the SimHash bit distance for near duplicates
        #[arg(long)]
        max_distance: Option<u32>,
    },
    /// Print ranked merge suggestions for one kind of label
    Labels {
        #[arg(long, value_enum, default_value_t = KindArg::Tag)]
        kind: KindArg,
        /// Parent folder id (folder labels only)
        #[arg(long)]
        parent: Option<i64>,
        /// Override the minimum edit-distance similarity
        #[arg(long)]
        min_similarity: Option<f64>,
        /// Comma-separated alias group, e.g. "taxes,irs"; may be repeated
        #[arg(long = "alias")]
        aliases: Vec<String>,
    },
    /// Merge one label into another
    Merge {
        #[arg(long)]
        source: i64,
        #[arg(long)]
        target: i64,
    },
    /// Register a file and attach a tag to it
    Tag { path: PathBuf, name: String },
    /// Print configuration values
    PrintConfig,
}
