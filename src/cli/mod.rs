//! CLI module for Surveyor

mod args;

pub use args::{Args, Command, RepoArgs};

use crate::analysis::{Analysis, AnalysisOptions, DependencyGraph, Surveyor};
use crate::config::Config;
use crate::error::Result;
use crate::output::{
    append_jsonl, existing_instance_ids, render, ApproxTokenCounter, PromptBuilder, PromptRecord,
    RenderMode, TokenCounter,
};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG: &str = "surveyor.toml";

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the global subscriber; `RUST_LOG` overrides the verbosity flag
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn load_config(repo: &RepoArgs, mode: Option<RenderMode>) -> Result<Config> {
    let mut config = match &repo.config {
        // An explicit config must load
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Path::new(DEFAULT_CONFIG)),
    };
    config.merge_cli(mode, repo.ignore.clone(), repo.sequential);
    config.validate()?;
    Ok(config)
}

/// Run the pipeline for one repository
fn survey(
    repo: &RepoArgs,
    config: Config,
    test_framework_aware: bool,
    with_graph: bool,
) -> Result<Analysis> {
    let mut surveyor = Surveyor::new(config)?.with_verbose(repo.verbose);
    let options = AnalysisOptions {
        commit: repo.commit.clone(),
        test_framework_aware,
        with_graph,
    };
    surveyor.analyze(&repo.path, &options)
}

fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Structure {
            repo,
            mode,
            dependencies,
        } => {
            init_tracing(repo.verbose);
            let config = load_config(&repo, mode)?;
            let mode = config.output.mode;

            let analysis = survey(&repo, config, repo.keep_tests, mode.wants_graph(dependencies))?;
            println!("{}", render(analysis.structure(), analysis.graph(), mode));
            Ok(())
        }

        Command::Localize {
            repo,
            instance_id,
            problem,
            output_file,
            mode,
            dependencies,
        } => {
            init_tracing(repo.verbose);
            if existing_instance_ids(&output_file)?.contains(&instance_id) {
                info!(instance = %instance_id, "Already localized, skipping");
                return Ok(());
            }

            let config = load_config(&repo, mode)?;
            let mode = config.output.mode;
            let test_framework_aware =
                repo.keep_tests || config.filter.is_test_framework_instance(&instance_id);

            let problem_statement = std::fs::read_to_string(&problem)?;
            let analysis = survey(&repo, config, test_framework_aware, mode.wants_graph(dependencies))?;
            let structure = render(analysis.structure(), analysis.graph(), mode);

            let message = PromptBuilder::new()?.build(mode, &problem_statement, &structure)?;
            let num_tokens = ApproxTokenCounter::default().count(&message);
            let record = PromptRecord {
                instance_id,
                num_tokens,
                message,
            };
            append_jsonl(&output_file, &record)?;

            info!(
                instance = %record.instance_id,
                tokens = num_tokens,
                output = %output_file.display(),
                "Prompt written"
            );
            Ok(())
        }

        Command::Graph { repo } => {
            init_tracing(repo.verbose);
            let config = load_config(&repo, None)?;
            let analysis = survey(&repo, config, repo.keep_tests, true)?;

            let graph = match analysis {
                Analysis::Graph(graph) => graph,
                Analysis::Structure(structure) => DependencyGraph::build(structure),
            };
            let edges: Vec<_> = graph.all_edges().collect();
            let report = serde_json::json!({
                "files": graph.structure().len(),
                "stats": graph.stats(),
                "edges": edges,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Command::Version => {
            println!("surveyor {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
