//! MarkGuard CLI - trademark infringement screening
//!
//! ## Commands
//!
//! - `analyze`: run the full workflow for one protected mark and one candidate
//! - `batch`: run every pair in a batch file and collect approved reports
//! - `phonetic`: score two names offline, without transliteration
//! - `calibrate`: map a raw factor score through the configured anchors

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, Level};

use markguard_core::metrics::METRICS;
use markguard_core::phonetic::score_readings;
use markguard_core::{
    calibrate, run_batch, Analyzer, BatchItem, Capabilities, CandidateMark, EngineConfig, Factor,
    ProtectedMark,
};
use markguard_llm::{LawApiClient, OpenAiClient};
use markguard_store::SurrealMarkStore;

#[derive(Parser)]
#[command(name = "markguard")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trademark infringement screening", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse one protected mark against one candidate
    Analyze {
        /// Protected mark (JSON)
        #[arg(short, long)]
        protected: PathBuf,

        /// Candidate mark (JSON)
        #[arg(short, long)]
        candidate: PathBuf,

        /// Engine configuration (TOML, defaults when omitted)
        #[arg(long, env = "MARKGUARD_CONFIG")]
        config: Option<PathBuf>,

        /// Write the run snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyse every pair in a batch file sequentially
    Batch {
        /// JSON array of `{ "protected": ..., "candidates": [...] }`
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, env = "MARKGUARD_CONFIG")]
        config: Option<PathBuf>,

        /// Write the batch summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Phonetic similarity (0 to 100) of two names as written
    Phonetic { a: String, b: String },

    /// Calibrate a raw factor score
    Calibrate {
        #[arg(value_enum)]
        component: Component,

        /// Raw score (phonetic on 0 to 100, the others on 0 to 1)
        raw: f64,

        #[arg(long, env = "MARKGUARD_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Component {
    Visual,
    Phonetic,
    Conceptual,
}

impl From<Component> for Factor {
    fn from(component: Component) -> Self {
        match component {
            Component::Visual => Factor::Visual,
            Component::Phonetic => Factor::Phonetic,
            Component::Conceptual => Factor::Conceptual,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    markguard_core::telemetry::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Analyze {
            protected,
            candidate,
            config,
            output,
        } => {
            let config = load_config(config.as_deref())?;
            let analyzer = Analyzer::new(capabilities_from_env().await?, config)?;
            cmd_analyze(&analyzer, &protected, &candidate, output.as_deref()).await
        }
        Commands::Batch {
            input,
            config,
            output,
        } => {
            let config = load_config(config.as_deref())?;
            let analyzer = Analyzer::new(capabilities_from_env().await?, config)?;
            cmd_batch(&analyzer, &input, output.as_deref()).await
        }
        Commands::Phonetic { a, b } => {
            println!("{}", cmd_phonetic(&a, &b));
            Ok(())
        }
        Commands::Calibrate {
            component,
            raw,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            println!("{}", cmd_calibrate(&config, component, raw));
            Ok(())
        }
    };

    METRICS.flush();
    result
}

/// Build every collaborator from the environment. One HTTP client serves
/// generation, judgment and embedding.
async fn capabilities_from_env() -> Result<Capabilities> {
    let llm = Arc::new(OpenAiClient::from_env().context("Failed to build LLM client")?);
    let case_law =
        Arc::new(LawApiClient::from_env().context("Failed to build case-law client")?);
    let store = Arc::new(
        SurrealMarkStore::from_env()
            .await
            .context("Failed to connect to MarkGuard database")?,
    );
    Ok(Capabilities::new(
        llm.clone(),
        llm.clone(),
        llm,
        case_law,
        store.clone(),
        store,
    ))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => Ok(EngineConfig::default()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))
}

fn write_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!(path = ?path, "output written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn cmd_analyze(
    analyzer: &Analyzer,
    protected: &Path,
    candidate: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let protected: ProtectedMark = read_json(protected)?;
    let candidate: CandidateMark = read_json(candidate)?;
    let snapshot = analyzer
        .analyze(protected, candidate)
        .await
        .context("Pair could not be analysed")?;
    info!(
        grade = %snapshot.risk.grade,
        termination = snapshot.termination.as_str(),
        "analysis complete"
    );
    write_output(&snapshot, output)
}

async fn cmd_batch(analyzer: &Analyzer, input: &Path, output: Option<&Path>) -> Result<()> {
    let items: Vec<BatchItem> = read_json(input)?;
    let summary = run_batch(analyzer, items).await;
    info!(
        analyzed = summary.analyzed,
        skipped = summary.skipped,
        digests = summary.digests.len(),
        "batch complete"
    );
    write_output(&summary, output)
}

fn cmd_phonetic(a: &str, b: &str) -> f64 {
    score_readings(&[a.to_string()], &[b.to_string()])
}

fn cmd_calibrate(config: &EngineConfig, component: Component, raw: f64) -> f64 {
    calibrate(raw, config.anchors(component.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use markguard_llm::fakes::{HashEmbedder, ScriptedGenerator, ScriptedJudge, StaticCaseLaw};
    use markguard_store::fakes::{MemoryRiskSink, MemoryVectorStore};
    use serde_json::json;

    fn offline_analyzer() -> Analyzer {
        let caps = Capabilities::new(
            Arc::new(ScriptedGenerator::new()),
            Arc::new(ScriptedJudge::new()),
            Arc::new(HashEmbedder::new(4)),
            Arc::new(StaticCaseLaw::new()),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(MemoryRiskSink::new()),
        );
        Analyzer::new(caps, EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_cli_parses_analyze_with_global_flags() {
        let cli = Cli::try_parse_from([
            "markguard",
            "--json",
            "analyze",
            "--protected",
            "p.json",
            "--candidate",
            "c.json",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Analyze { config: None, .. }));
    }

    #[test]
    fn test_calibrate_uses_config_anchors() {
        let config = EngineConfig::default();
        assert_eq!(cmd_calibrate(&config, Component::Phonetic, 100.0), 1.0);
        assert_eq!(cmd_calibrate(&config, Component::Visual, 0.0), 0.0);
    }

    #[test]
    fn test_phonetic_identical_names_score_full() {
        assert_eq!(cmd_phonetic("마크가드", "마크가드"), 100.0);
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[tokio::test]
    async fn test_batch_writes_summary_and_skips_invalid_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("batch.json");
        let output = dir.path().join("summary.json");
        let batch = json!([{
            "protected": {
                "registration_no": "40-1",
                "name": "마크가드",
                "product_kinds": "소프트웨어"
            },
            "candidates": [
                { "mark_no": "c-1", "name": "전혀다른" },
                { "mark_no": "c-2", "name": "" }
            ]
        }]);
        std::fs::write(&input, batch.to_string()).unwrap();

        cmd_batch(&offline_analyzer(), &input, Some(&output))
            .await
            .unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(summary["analyzed"], 1);
        assert_eq!(summary["skipped"], 1);
    }
}
