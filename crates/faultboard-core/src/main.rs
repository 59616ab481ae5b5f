use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use faultboard_core::{run_simulator, BoardConfig, BoardView, SimulatorConfig};
use faultboard_graph::{ColorAssignmentStore, GroupEngine};
use faultboard_store::{Document, Snapshot};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("faultboard")
        .version(faultboard_core::VERSION)
        .about("Record board fault grouping tools")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Board config file (TOML)"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("groups")
                .about("Group the fault records in a JSON document dump")
                .arg(
                    Arg::new("snapshot")
                        .long("snapshot")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of documents, or an object keyed by document id"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run concurrent link/unlink clients and check the converged groups")
                .arg(
                    Arg::new("records")
                        .long("records")
                        .default_value("40")
                        .value_parser(value_parser!(usize))
                        .help("Number of fault records to seed"),
                )
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of link/unlink requests"),
                )
                .arg(
                    Arg::new("clients")
                        .long("clients")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Number of concurrent board sessions"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                ),
        )
}

fn init_tracing(config: &BoardConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("snapshot {} is not valid JSON", path.display()))?;

    let documents = match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                Document::from_flat(item)
                    .with_context(|| format!("document {index} has no string id"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?,
        Value::Object(map) => map
            .into_iter()
            .map(|(id, fields)| match fields {
                Value::Object(fields) => Ok(Document::new(id, fields)),
                _ => bail!("document {id} is not an object"),
            })
            .collect::<anyhow::Result<Vec<_>>>()?,
        _ => bail!("snapshot must be a JSON array or object"),
    };
    Ok(Snapshot {
        revision: 0,
        documents,
    })
}

fn run_groups(config: &BoardConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(path) = args.get_one::<PathBuf>("snapshot") else {
        bail!("--snapshot is required");
    };
    let snapshot = load_snapshot(path)?;
    let faults = snapshot.fault_records()?;

    let mut colors = ColorAssignmentStore::new(config.palette()?);
    let view = BoardView::compute(snapshot.revision, &faults, &GroupEngine::new(), &mut colors);
    let summaries = view.summaries();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!(
        "{} fault record(s), {} group(s)",
        faults.len(),
        summaries.len()
    );
    for summary in &summaries {
        let color = summary.color.as_ref().map_or("-", |c| c.as_str());
        println!();
        println!("{}  {}  [{}]", summary.group_id, summary.title, color);
        println!("  created {}", summary.created_at);
        for member in &summary.members {
            println!("  - {member}");
        }
    }
    Ok(())
}

async fn run_simulate(args: &ArgMatches) -> anyhow::Result<bool> {
    let config = SimulatorConfig {
        records: args.get_one::<usize>("records").copied().unwrap_or(40),
        operations: args.get_one::<u64>("operations").copied().unwrap_or(1_000),
        clients: args.get_one::<usize>("clients").copied().unwrap_or(4),
        seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
        ..SimulatorConfig::default()
    };

    println!("Running link/unlink simulator...");
    println!("Records: {}", config.records);
    println!("Operations: {}", config.operations);
    println!("Clients: {}", config.clients);
    println!("Seed: {}", config.seed);
    println!();

    let report = run_simulator(config).await?;
    println!("{}", report.generate_text());
    Ok(report.passed())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => BoardConfig::load(path)?,
        None => BoardConfig::default(),
    };
    init_tracing(&config);

    match matches.subcommand() {
        Some(("groups", args)) => run_groups(&config, args),
        Some(("simulate", args)) => {
            let passed = run_simulate(args).await?;
            std::process::exit(if passed { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}
