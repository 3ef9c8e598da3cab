#![deny(warnings)]

//! Headless CLI: evaluate a scenario against a catalog snapshot.

use anyhow::{bail, Context, Result};
use hp_catalog::CatalogItem;
use hp_core::RegionCode;
use hp_engine::{evaluate, Scenario};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "usage: hp-roi --scenario <file.yaml> [--catalog <file.json>] [--region <code>] [--json]";

#[derive(Debug, Default)]
struct Args {
    scenario: Option<String>,
    catalog: Option<String>,
    region: Option<String>,
    json: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--catalog" => args.catalog = it.next(),
            "--region" => args.region = it.next(),
            "--json" => args.json = true,
            _ => {}
        }
    }
    args
}

fn load_catalog(path: Option<&str>) -> Result<Vec<CatalogItem>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading catalog {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing catalog {path}"))
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    info!(?args, "starting CLI");
    let Some(scenario_path) = args.scenario.as_deref() else {
        bail!(USAGE);
    };

    let text = std::fs::read_to_string(scenario_path)
        .with_context(|| format!("reading scenario {scenario_path}"))?;
    let mut scenario = Scenario::from_yaml_str(&text)?;
    if let Some(code) = args.region.as_deref() {
        let region: RegionCode = code.parse()?;
        scenario.region.select_region(region);
    }
    let catalog = load_catalog(args.catalog.as_deref())?;
    info!(items = catalog.len(), region = ?scenario.region.region, "catalog loaded");

    let report = evaluate(&scenario, &catalog)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
