use crate::config::load_config;
use crate::diff;
use crate::dump::{ArchitectureDump, write_dump};
use crate::layout::{LayoutStrategy, compute_layout};
use crate::model::{SystemArchitecture, decode_graph, decode_role_gaps, decode_rule_usage};
use crate::raw::RawGraph;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "archmap", version, about = "Cloud architecture map builder and layout engine")]
pub struct Args {
    /// Graph payload (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout strategy
    #[arg(short = 'l', long = "layout", value_enum, default_value = "lanes")]
    pub layout: StrategyArg,

    /// Layout config (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Rule-usage payload, keyed by checkpoint id
    #[arg(long = "ruleUsage")]
    pub rule_usage: Option<PathBuf>,

    /// Role-gap payload, keyed by role name
    #[arg(long = "roleGaps")]
    pub role_gaps: Option<PathBuf>,

    /// Previous graph payload to diff against
    #[arg(long = "previous")]
    pub previous: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StrategyArg {
    Force,
    Lanes,
}

impl StrategyArg {
    fn strategy(self) -> LayoutStrategy {
        match self {
            Self::Force => LayoutStrategy::Force,
            Self::Lanes => LayoutStrategy::Lanes,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Force => "force",
            Self::Lanes => "lanes",
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let raw = decode_or_empty(&input, "input");
    let mut arch = SystemArchitecture::build(&raw);

    // Auxiliary data is best-effort: a missing or malformed file leaves
    // the affected checkpoints with zeroed usage counts.
    if let Some(path) = args.rule_usage.as_deref() {
        match std::fs::read_to_string(path).map_err(anyhow::Error::from).and_then(|text| {
            decode_rule_usage(&text).map_err(anyhow::Error::from)
        }) {
            Ok(payload) => arch.apply_rule_usage_payload(payload),
            Err(err) => eprintln!("warning: skipping rule usage ({err})"),
        }
    }
    if let Some(path) = args.role_gaps.as_deref() {
        match std::fs::read_to_string(path).map_err(anyhow::Error::from).and_then(|text| {
            decode_role_gaps(&text).map_err(anyhow::Error::from)
        }) {
            Ok(payload) => arch.apply_role_gap_payload(payload),
            Err(err) => eprintln!("warning: skipping role gaps ({err})"),
        }
    }

    let report = match args.previous.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let previous = SystemArchitecture::build(&decode_or_empty(&text, "previous"));
            diff::diff(Some(&previous), &arch)
        }
        None => diff::diff(None, &arch),
    };

    let layout = compute_layout(&arch, args.layout.strategy(), &config);
    let dump = ArchitectureDump::new(&arch, &layout, report, args.layout.label());

    match args.output.as_deref() {
        Some(path) => write_dump(path, &dump)?,
        None => {
            let text = serde_json::to_string_pretty(&dump)?;
            println!("{text}");
        }
    }
    Ok(())
}

/// Decode a payload, degrading to the empty graph on failure so a bad
/// fetch renders as "no data" instead of aborting the run.
fn decode_or_empty(text: &str, label: &str) -> RawGraph {
    match decode_graph(text) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("warning: treating {label} payload as empty ({err})");
            RawGraph::default()
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
