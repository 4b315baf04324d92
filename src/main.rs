mod doctor;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use curio_core::config::AppConfig;
use curio_llm::{build_agent, CURATION_INSTRUCTIONS, LITERATURE_INSTRUCTIONS};
use curio_pipeline::{build_validation_graph, run_validation, RunSummary};

#[derive(Parser)]
#[command(
    name = "curio",
    version,
    about = "Literature validation pipeline for curated ontology definitions"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "curio.toml")]
    config: PathBuf,

    /// Log filter (overrides RUST_LOG), e.g. "debug" or "curio_pipeline=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(flatten)]
    overrides: PipelineOverrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the validation pipeline (default)
    Run,
    /// Show the effective configuration
    Config,
    /// Print the stage chain
    Graph,
    /// Run environment health checks
    Doctor,
}

/// Command-line overrides; these win over the config file and environment.
#[derive(Args, Default)]
struct PipelineOverrides {
    /// Base data directory
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Only process the configured test terms
    #[arg(long, global = true)]
    test_mode: bool,

    /// Test term id (repeatable); replaces the configured list
    #[arg(long = "test-term", global = true)]
    test_terms: Vec<String>,

    /// Chance in [0, 1] of injecting a false assertion into an uncached record
    #[arg(long, global = true)]
    false_assertion_probability: Option<f64>,

    /// Seed for the injection draw
    #[arg(long, global = true)]
    seed: Option<u64>,
}

impl PipelineOverrides {
    fn apply(&self, config: &mut AppConfig) -> curio_core::Result<()> {
        let p = &mut config.pipeline;
        if let Some(ref dir) = self.data_dir {
            p.data_dir = dir.clone();
        }
        if self.test_mode {
            p.test_mode = true;
        }
        if !self.test_terms.is_empty() {
            p.test_terms = self.test_terms.clone();
        }
        if let Some(prob) = self.false_assertion_probability {
            p.false_assertion_probability = prob;
        }
        if let Some(seed) = self.seed {
            p.seed = Some(seed);
        }
        p.validate()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level)?,
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("curio=info,warn"))
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = load_config(&cli.config)?;
    config.apply_process_env()?;
    cli.overrides.apply(&mut config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
        }
        Commands::Graph => {
            let graph = build_validation_graph();
            println!("{} (entrypoint: {})", graph.name, graph.entrypoint);
            for node in graph.chain() {
                let next = node.next.map_or("(halt)".to_string(), |n| n.to_string());
                println!("  {:<24} -> {:<24} {}", node.id.as_str(), next, node.description);
            }
        }
        Commands::Doctor => {
            println!("Curio Doctor");
            println!("============");
            if !doctor::run_doctor(&config) {
                std::process::exit(1);
            }
        }
        Commands::Run => {
            let curation = build_agent(&config.agents.curation, CURATION_INSTRUCTIONS);
            let literature = build_agent(&config.agents.literature, LITERATURE_INSTRUCTIONS);
            match run_validation(config.pipeline.clone(), curation, literature).await {
                Ok(summary) => print_summary(&summary),
                Err(e) => {
                    error!(error = %e, "Pipeline failed");
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

/// Load the config file, or fall back to defaults when it does not exist.
fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        info!(path = %path.display(), "Loading config");
        Ok(AppConfig::load(path)?)
    } else {
        warn!(
            path = %path.display(),
            "No config file found, using defaults. See curio.toml.example for reference."
        );
        Ok(AppConfig::default())
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Run {} started {}", summary.run_id, summary.started_at.to_rfc3339());
    for stage in &summary.stages {
        println!(
            "  {:<24} {:>6} items {:>8} ms",
            stage.stage.as_str(),
            stage.items,
            stage.elapsed_ms
        );
    }
    println!(
        "Loaded {}, seeded {}, validated {}, {} report rows",
        summary.loaded, summary.seeded, summary.validated, summary.report_rows
    );
    let stats = &summary.seed_stats;
    println!(
        "False assertions: {} injected, {} from cache, {} untouched",
        stats.injected, stats.cache_hits, stats.untouched
    );
    println!("{}", summary.report_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli::parse_from([
            "curio",
            "--data-dir",
            "/srv/cl",
            "--test-mode",
            "--test-term",
            "CL_1",
            "--test-term",
            "CL_2",
            "--false-assertion-probability",
            "0.0",
            "--seed",
            "42",
            "run",
        ]);
        let mut config = AppConfig::default();
        cli.overrides.apply(&mut config).unwrap();
        assert_eq!(config.pipeline.data_dir, "/srv/cl");
        assert!(config.pipeline.test_mode);
        assert_eq!(config.pipeline.test_terms, vec!["CL_1", "CL_2"]);
        assert_eq!(config.pipeline.false_assertion_probability, 0.0);
        assert_eq!(config.pipeline.seed, Some(42));
        assert!(matches!(cli.command, Some(Commands::Run)));
    }

    #[test]
    fn test_cli_rejects_out_of_range_probability() {
        let cli = Cli::parse_from(["curio", "--false-assertion-probability", "2"]);
        let mut config = AppConfig::default();
        assert!(cli.overrides.apply(&mut config).is_err());
    }

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::parse_from(["curio"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("curio.toml"));
    }
}
