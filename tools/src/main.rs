//! sim-runner: headless runner for the microlending credit simulation.
//!
//! Usage:
//!   sim-runner --seed 12345 --db run.db --data-dir ./data
//!   sim-runner --seed 7 --as-of 2025-03-31

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use microlend_core::{
    config::SimConfig,
    engine::{RunReport, SimEngine},
    loan::LoanStatus,
    store::SimStore,
};
use rust_decimal::Decimal;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");

    let mut config = SimConfig::load(data_dir)?;
    if let Some(raw) = flag_value(&args, "--as-of") {
        config.generation.as_of = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("--as-of expects YYYY-MM-DD, got '{raw}'"))?;
    }

    println!("microlend sim-runner");
    println!("  seed:      {seed}");
    println!("  db:        {db}");
    println!("  data_dir:  {data_dir}");
    println!("  as_of:     {}", config.generation.as_of);
    println!();

    let store = if db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(db)?
    };
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", Utc::now().timestamp());
    let mut engine = SimEngine::build(run_id, seed, store, config)?;
    let report = engine.run()?;
    print_summary(&engine, &report)?;
    Ok(())
}

fn print_summary(engine: &SimEngine, report: &RunReport) -> Result<()> {
    let store = engine.store();
    let customers = store.customer_count()?;
    let (applications, approved) = store.application_counts()?;
    let approval_rate = if applications > 0 {
        approved as f64 / applications as f64 * 100.0
    } else {
        0.0
    };
    let statuses = store.loan_status_counts()?;
    let loans: i64 = statuses.values().sum();
    let repaid: Decimal = store.repaid_by_customer()?.values().copied().sum();
    let stats = store.profile_stats()?;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {}", report.run_id);
    println!("  customers:      {customers}");
    println!("  applications:   {applications}");
    println!("  approved:       {approved} ({approval_rate:.1}%)");
    println!("  loans:          {loans}");
    println!("  total repaid:   {repaid}");

    println!();
    println!("=== PHASES ===");
    for summary in &report.summaries {
        println!("  {summary}");
    }

    println!();
    println!("=== LOAN STATUS ===");
    for status in [LoanStatus::Active, LoanStatus::Paid, LoanStatus::Defaulted] {
        let n = statuses.get(&status).copied().unwrap_or(0);
        println!("  {:<10} {n:>8} ({:.1}%)", status.as_str(), share(n, loans));
    }

    println!();
    println!("=== LOAN TIERS ===");
    for (tier, n) in &stats.tier_distribution {
        println!("  tier {tier}: {n:>8} ({:.1}%)", share(*n, customers));
    }

    println!();
    println!("=== CRB LISTINGS ===");
    if stats.crb_listings.is_empty() {
        println!("  (none)");
    }
    for (kind, n) in &stats.crb_listings {
        println!("  {kind:<14} {n:>8}");
    }

    println!();
    println!("=== CREDIT SCORES ===");
    for (band, n) in &stats.score_bands {
        println!("  {band:<8} {n:>8} ({:.1}%)", share(*n, customers));
    }
    Ok(())
}

fn share(n: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 / total as f64 * 100.0
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
