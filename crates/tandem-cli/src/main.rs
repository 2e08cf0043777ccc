//! # Tandem CLI
//!
//! The `tandem` binary: reads an XML assembly description, computes a
//! minimum-parallel-cost multi-agent plan, and writes the annotated plan
//! as XML (and optionally DOT).
//!
//! Exit code 0 on success; any parse, validation, or planning failure
//! prints a single diagnostic and exits non-zero without writing output.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tandem_planner::{PlanOutcome, Planner};

/// Multi-agent assembly planner over AND/OR graphs.
#[derive(Parser)]
#[command(name = "tandem")]
#[command(version, about, long_about = None)]
struct Cli {
    /// XML assembly description to plan.
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Where to write the planned assembly XML.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Optional DOT visualisation of the annotated graph.
    #[arg(long, value_name = "FILE")]
    dot: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TANDEM_LOG", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .init();

    let (mut assembly, config) = tandem_io::xml::read_file(&cli.input)
        .with_context(|| format!("reading assembly description {}", cli.input.display()))?;
    info!(
        input = %cli.input.display(),
        agents = config.agents.len(),
        "assembly description loaded"
    );

    let plan = match Planner::new()
        .plan(&assembly, &config)
        .context("planning failed")?
    {
        PlanOutcome::Plan(plan) => plan,
        PlanOutcome::NoPlan => {
            anyhow::bail!("no feasible assembly plan exists for the given agents")
        }
    };
    info!(
        steps = plan.len(),
        total_cost = plan.total_cost,
        "plan computed"
    );

    plan.annotate(&mut assembly)
        .context("annotating the assembly graph")?;

    tandem_io::xml::write_file(&assembly, &cli.output)
        .with_context(|| format!("writing plan to {}", cli.output.display()))?;
    if let Some(dot_path) = &cli.dot {
        tandem_io::dot::write_file(&assembly, dot_path)
            .with_context(|| format!("writing DOT to {}", dot_path.display()))?;
    }

    println!(
        "plan: {} step(s), total parallel cost {}",
        plan.len(),
        plan.total_cost
    );
    Ok(())
}
