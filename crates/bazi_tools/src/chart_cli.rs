#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use bazi_kernel_contracts::chart::{ChartId, FourPillars, RulesetId};
use bazi_kernel_contracts::ganzhi::{Branch, Stem};
use bazi_kernel_contracts::profile::{ProjectionKind, ProjectionPillar};
use bazi_os::{ChartPipeline, ChartRequest, PipelineConfig, RulesetCatalog};
use bazi_storage::repo::RulesetStore;
use bazi_storage::{ChartStore, MemoryChartStore, SqliteChartStore};
use clap::{Args, Parser, Subcommand};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "bazi")]
#[command(about = "Four Pillars chart analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// SQLite database file; runs against an in-memory store when absent
    #[arg(long, global = true, env = "BAZI_DB")]
    pub db: Option<PathBuf>,

    /// TOML ruleset catalog installed into the store before the command runs
    #[arg(long, global = true)]
    pub ruleset_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every stage over one chart and print the report as JSON
    Run(RunArgs),
    /// List the ruleset ids held by the store
    Rulesets,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Year, month, day and hour pillars, e.g. "甲子,丙寅,戊辰,庚午"
    #[arg(long)]
    pub pillars: String,

    #[arg(long, default_value = "chart-1")]
    pub chart_id: String,

    #[arg(long)]
    pub ruleset: Option<String>,

    /// Pillars to project, e.g. "乙丑,丙寅" or "1984=甲子,1985=乙丑"
    #[arg(long)]
    pub project: Option<String>,

    /// Treat projected pillars as annual rather than decade pillars
    #[arg(long)]
    pub annual: bool,

    #[arg(long)]
    pub pretty: bool,
}

pub fn execute(cli: &Cli) -> Result<String, String> {
    match &cli.db {
        Some(path) => {
            let store = SqliteChartStore::open(path)
                .map_err(|e| format!("failed to open {}: {e}", path.display()))?;
            execute_with(cli, store)
        }
        None => execute_with(cli, MemoryChartStore::new_in_memory()),
    }
}

fn execute_with<S: ChartStore>(cli: &Cli, mut store: S) -> Result<String, String> {
    if let Some(path) = &cli.ruleset_file {
        install_catalog(path, &mut store)?;
    }
    match &cli.command {
        Commands::Run(args) => execute_run(args, store),
        Commands::Rulesets => {
            let ids = store
                .ruleset_ids()
                .map_err(|e| format!("failed to list rulesets: {e}"))?;
            Ok(ids
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

fn install_catalog(path: &Path, store: &mut impl RulesetStore) -> Result<usize, String> {
    let catalog = RulesetCatalog::from_path(path).map_err(|e| e.to_string())?;
    let n = catalog
        .install(store)
        .map_err(|e| format!("failed to install rulesets: {e}"))?;
    info!(path = %path.display(), installed = n, "ruleset catalog installed");
    Ok(n)
}

pub fn execute_run<S: ChartStore>(args: &RunArgs, store: S) -> Result<String, String> {
    let chart_id = ChartId::new(args.chart_id.as_str()).map_err(|e| format!("chart id: {e}"))?;
    let pillars = FourPillars::parse(&args.pillars).map_err(|e| format!("pillars: {e}"))?;
    let mut request = ChartRequest::v1(chart_id, pillars).map_err(|e| e.to_string())?;
    if let Some(raw) = &args.project {
        let kind = if args.annual {
            ProjectionKind::Annual
        } else {
            ProjectionKind::Decade
        };
        request = request.with_projection(kind, parse_projection(raw)?);
    }

    let mut config = PipelineConfig::mvp_v1();
    if let Some(raw) = &args.ruleset {
        let ruleset_id = RulesetId::new(raw.as_str()).map_err(|e| format!("ruleset: {e}"))?;
        config = config.with_ruleset(ruleset_id);
    }

    let mut pipeline = ChartPipeline::new(config, store);
    let report = pipeline.run(&request).map_err(|e| e.to_string())?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    json.map_err(|e| format!("failed to encode report: {e}"))
}

/// Comma separated stem-branch pairs, each optionally prefixed `label=`.
/// Unlabelled entries are numbered from 1.
pub fn parse_projection(raw: &str) -> Result<Vec<ProjectionPillar>, String> {
    let mut out = Vec::new();
    for (i, entry) in raw
        .split(&[',', '，'][..])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
    {
        let (label, ganzhi) = match entry.split_once('=') {
            Some((label, ganzhi)) => (label.trim().to_string(), ganzhi.trim()),
            None => ((i + 1).to_string(), entry),
        };
        let mut chars = ganzhi.chars();
        let (stem, branch) = match (chars.next(), chars.next(), chars.next()) {
            (Some(s), Some(b), None) => (Stem::from_char(s), Branch::from_char(b)),
            _ => (None, None),
        };
        let (Some(stem), Some(branch)) = (stem, branch) else {
            return Err(format!("'{entry}' is not a stem-branch pair"));
        };
        out.push(ProjectionPillar {
            label,
            stem,
            branch,
        });
    }
    if out.is_empty() {
        return Err("no projection pillars given".to_string());
    }
    Ok(out)
}
