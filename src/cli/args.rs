//! CLI argument parsing

use crate::output::RenderMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract repository structure and dependency graphs for bug localization prompts
#[derive(Parser, Debug)]
#[command(name = "surveyor")]
#[command(about = "Extract repository structure and dependency graphs for bug localization prompts")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Options shared by every repository command
#[derive(clap::Args, Debug, Clone)]
pub struct RepoArgs {
    /// Path to the checked-out repository
    pub path: PathBuf,

    /// Commit the repository is checked out at
    #[arg(long)]
    pub commit: Option<String>,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep test files
    #[arg(long)]
    pub keep_tests: bool,

    /// Directory name patterns to skip (can be repeated)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Parse files on a single thread
    #[arg(long)]
    pub sequential: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the rendered repository structure
    Structure {
        #[command(flatten)]
        repo: RepoArgs,

        /// Rendering mode (defaults to the config file's)
        #[arg(short, long, value_enum)]
        mode: Option<RenderMode>,

        /// Annotate functions_no_signature output with dependency edges
        /// (functions_with_signature always has them)
        #[arg(short, long)]
        dependencies: bool,
    },

    /// Build a localization prompt and append it to a JSON lines file
    Localize {
        #[command(flatten)]
        repo: RepoArgs,

        /// Benchmark instance identifier
        #[arg(long)]
        instance_id: String,

        /// File holding the problem statement
        #[arg(long)]
        problem: PathBuf,

        /// JSON lines file to append to
        #[arg(short, long)]
        output_file: PathBuf,

        /// Rendering mode (defaults to the config file's)
        #[arg(short, long, value_enum)]
        mode: Option<RenderMode>,

        /// Annotate functions_no_signature output with dependency edges
        /// (functions_with_signature always has them)
        #[arg(short, long)]
        dependencies: bool,
    },

    /// Print the dependency graph as JSON
    Graph {
        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Show version information
    Version,
}
