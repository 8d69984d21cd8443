use std::io::Read;

use clap::{Parser, Subcommand};
use scmetrics::metrics::MetricsResponse;
use scmetrics::storage::repository;

#[derive(Parser)]
#[command(name = "scmetrics", about = "Pull-request productivity metrics CLI")]
struct Cli {
    /// Database path (default: ~/.scmetrics/scmetrics.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load accounts, pull requests and reviews from a JSON export
    Import {
        /// Path to the export file
        path: String,
    },
    /// Compute metrics for a request payload
    Compute {
        /// Path to the payload JSON, or '-' for stdin
        payload: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the registered metric rules
    Rules,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show warehouse status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => scmetrics::Database::open_at(path).await?,
        None => scmetrics::Database::open().await?,
    };

    match cli.command {
        Commands::Import { path } => {
            let dataset = scmetrics::Dataset::load(&path)?;
            let report = scmetrics::import_dataset(&db, dataset).await?;
            println!(
                "Imported {} accounts, {} pull requests, {} reviews",
                report.accounts, report.pull_requests, report.reviews
            );
            if report.skipped > 0 {
                println!("Skipped {} rows (run with -v for details)", report.skipped);
            }
        }
        Commands::Compute { payload, json } => {
            let raw = read_payload(&payload)?;
            let payload: serde_json::Value = serde_json::from_str(&raw)?;
            let engine = scmetrics::MetricsEngine::from_database(db).await?;
            let response = engine.calculate_metrics(&payload).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Commands::Rules => {
            let engine = scmetrics::MetricsEngine::from_database(db).await?;
            println!(
                "{:<20} {:<15} {:<8} {:<8} {}",
                "RULE", "CATEGORY", "UNIT", "OP", "PEERS"
            );
            for rule in engine.rules() {
                let d = rule.descriptor();
                println!(
                    "{:<20} {:<15} {:<8} {:<8} {}",
                    d.id,
                    d.category.name,
                    format!("{:?}", d.unit).to_lowercase(),
                    rule.operation(),
                    rule.peer_policy().as_str()
                );
            }
        }
        Commands::Config { action } => {
            handle_config(&db, action).await?;
        }
        Commands::Status => {
            print_status(&db).await?;
        }
    }

    Ok(())
}

fn read_payload(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source)
            .map_err(|e| anyhow::anyhow!("cannot read payload {source}: {e}"))
    }
}

fn print_response(response: &MetricsResponse) {
    for (snapshots, graphs) in response
        .snapshot_metrics
        .iter()
        .zip(&response.graph_metrics)
    {
        for (m, g) in snapshots.metrics.iter().zip(&graphs.metrics) {
            println!("[{}] {}", snapshots.category.name, m.label);
            println!("  Value:       {:.2}", m.value);
            println!("  Peers:       {:.2}", m.peers_value);
            for entry in &g.time_series {
                let points: Vec<String> = entry
                    .data
                    .iter()
                    .map(|p| format!("{}={:.2}", p.key, p.value))
                    .collect();
                println!("  {:<12} {}", entry.date, points.join("  "));
            }
        }
    }
}

async fn print_status(db: &scmetrics::Database) -> anyhow::Result<()> {
    let counts = db
        .reader()
        .call(|conn| repository::warehouse_counts(conn))
        .await?;

    println!("Warehouse Status");
    println!("  Accounts:      {}", counts.accounts);
    println!("  Pull requests: {}", counts.pull_requests);
    println!("  Merged:        {}", counts.merged_pull_requests);
    println!("  Reviews:       {}", counts.reviews);
    Ok(())
}

async fn handle_config(db: &scmetrics::Database, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let val: Option<String> = db
                .reader()
                .call({
                    let key = key.clone();
                    move |conn| repository::get_config(conn, &key)
                })
                .await?;
            match val {
                Some(v) => println!("{key} = {v}"),
                None => println!("{key} is not set"),
            }
        }
        ConfigAction::Set { key, value } => {
            scmetrics::EngineConfig::set(db, &key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items: Vec<(String, String)> = db
                .reader()
                .call(|conn| repository::list_config(conn))
                .await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}
