//! Quartermaster - bank ledger and task scheduler for a merchant agent
//!
//! CLI entry point for inspecting bank snapshots and simulating the merchant.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::json;
use tracing::info;

use quartermaster::actor::{Actor, SimActor};
use quartermaster::bank::Ledger;
use quartermaster::cli::{Cli, Command, OutputFormat};
use quartermaster::config::Config;
use quartermaster::domain::{BankSnapshot, StoredItem};
use quartermaster::policy::{compound_plans, upgrade_plans};
use quartermaster::scheduler::{TaskScheduler, TickOutcome};
use quartermaster::tasks::{self, Session};

fn setup_logging(level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quartermaster")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level: tracing::Level = level
        .parse()
        .map_err(|_| eyre::eyre!("Invalid log level: {}", level))?;
    let log_file = fs::File::create(log_dir.join("quartermaster.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --log-level wins over the config file
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| Config::load_log_level(cli.config.as_ref()))
        .unwrap_or_else(|| "info".to_string());
    setup_logging(&log_level).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Inspect { snapshot, format } => cmd_inspect(&config, &snapshot, format),
        Command::Plan { snapshot, format } => cmd_plan(&config, &snapshot, format),
        Command::Simulate {
            snapshot,
            inventory,
            gold,
            slots,
            rounds,
        } => cmd_simulate(&config, &snapshot, inventory.as_deref(), gold, slots, rounds).await,
        Command::Config => cmd_config(&config),
    }
}

fn load_snapshot(path: &Path) -> Result<BankSnapshot> {
    let content = fs::read_to_string(path).context(format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse snapshot {}", path.display()))
}

fn load_inventory(path: &Path) -> Result<Vec<Option<StoredItem>>> {
    let content = fs::read_to_string(path).context(format!("Failed to read inventory {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse inventory {}", path.display()))
}

/// Show container usage and item totals
fn cmd_inspect(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let ledger = Ledger::from_snapshot(config.bank.clone(), load_snapshot(path)?);

    match format {
        OutputFormat::Json => {
            let containers: serde_json::Map<String, serde_json::Value> = ledger
                .containers()
                .map(|c| {
                    (
                        c.id().to_string(),
                        json!({"used": c.occupied_count(), "capacity": c.capacity()}),
                    )
                })
                .collect();
            let items: serde_json::Map<String, serde_json::Value> = ledger
                .groups()
                .map(|g| (g.name().to_string(), json!(ledger.total(g.name()))))
                .collect();
            let report = json!({
                "gold": ledger.gold(),
                "free": ledger.free_slots(),
                "containers": containers,
                "items": items,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("{}", "Bank".bold());
            println!("  Gold:       {}", ledger.gold().to_string().yellow());
            println!("  Free slots: {}", ledger.free_slots());
            println!();
            println!("{}", "Containers".bold());
            for container in ledger.containers() {
                println!(
                    "  {:<10} {:>3}/{}",
                    container.id().to_string(),
                    container.occupied_count(),
                    container.capacity()
                );
            }
            println!();
            println!("{}", "Items".bold());
            for group in ledger.groups() {
                println!(
                    "  {:<16} {:>6}  ({} slots)",
                    group.name(),
                    ledger.total(group.name()),
                    group.len()
                );
            }
        }
    }
    Ok(())
}

/// Show upgrade and compound plans
fn cmd_plan(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let ledger = Ledger::from_snapshot(config.bank.clone(), load_snapshot(path)?);
    let upgrades = upgrade_plans(&ledger, &config.items);
    let compounds = compound_plans(&ledger, &config.items);

    match format {
        OutputFormat::Json => {
            let report = json!({"upgrade": upgrades, "compound": compounds});
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("{}", "Upgrades".bold());
            if upgrades.is_empty() {
                println!("  {}", "nothing to upgrade".dimmed());
            }
            for plan in &upgrades {
                let positions: Vec<String> = plan.positions.iter().map(ToString::to_string).collect();
                println!(
                    "  {} -> +{}: {}",
                    plan.name.cyan(),
                    plan.target_level,
                    positions.join(", ")
                );
            }
            println!();
            println!("{}", "Compounds".bold());
            if compounds.is_empty() {
                println!("  {}", "nothing to compound".dimmed());
            }
            for plan in &compounds {
                let positions: Vec<String> = plan.positions.iter().map(ToString::to_string).collect();
                println!("  {} +{}: {}", plan.name.cyan(), plan.level, positions.join(", "));
            }
        }
    }
    Ok(())
}

/// Run the merchant tasks against a simulated actor
async fn cmd_simulate(
    config: &Config,
    snapshot: &Path,
    inventory: Option<&Path>,
    gold: u64,
    slots: usize,
    rounds: usize,
) -> Result<()> {
    let bank_map = config.bank.location.map_name().unwrap_or("bank");
    let mut actor = SimActor::new("merchant", slots)
        .with_bank(load_snapshot(snapshot)?, config.bank.container_capacity)
        .with_bank_map(bank_map)
        .with_catalog(config.items.clone())
        .with_gold(gold);
    if let Some(path) = inventory {
        for (slot, item) in load_inventory(path)?.into_iter().enumerate() {
            if let Some(item) = item {
                actor = actor.with_item(slot, item);
            }
        }
    }
    let actor = Arc::new(actor);

    let session = Session::new(
        actor.clone(),
        Ledger::new(config.bank.clone()),
        config.items.clone(),
        config.merchant.clone(),
    );
    let scheduler = TaskScheduler::new(actor.name(), config.scheduler.clone());
    tasks::install(&scheduler, session.clone()).await?;
    info!(%rounds, "Simulation started");

    println!("{}", "Startup".bold());
    drain(&scheduler).await;
    for round in 1..=rounds {
        println!("{} {}", "Round".bold(), round);
        scheduler.trigger_background().await;
        drain(&scheduler).await;
    }
    let stats = scheduler.stats().await;
    scheduler.shutdown().await;

    let ledger = session.ledger.lock().await;
    let bank = actor.bank_contents();
    println!();
    println!("{}", "Result".bold());
    println!("  Tasks completed: {}", stats.total_completed);
    println!("  Tasks failed:    {}", stats.total_failed);
    println!("  Actor calls:     {}", actor.calls().len());
    println!("  Gold carried:    {}", actor.gold());
    println!("  Gold in bank:    {}", bank.gold.to_string().yellow());
    match ledger.check_consistency() {
        Ok(()) => println!("  Ledger:          {}", "consistent".green()),
        Err(e) => println!("  Ledger:          {} ({})", "inconsistent".red(), e),
    }
    println!();
    println!("{}", "Bank".bold());
    println!("{}", serde_json::to_string_pretty(&bank)?);
    Ok(())
}

/// Run queued tasks until the scheduler falls idle
async fn drain(scheduler: &TaskScheduler) {
    loop {
        match scheduler.tick().await {
            TickOutcome::Completed { name, ok: true, .. } => println!("  {} {}", "done".green(), name),
            TickOutcome::Completed { name, ok: false, .. } => println!("  {} {}", "failed".red(), name),
            _ => break,
        }
    }
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
