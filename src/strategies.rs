use std::path::Path;

use anyhow::Result;

use crate::store::{StoredStrategy, StrategyStore};

/// Entry point for the `strategies` command.
pub fn list(store_dir: Option<&Path>, creator: Option<&str>) -> Result<()> {
    let store = StrategyStore::open(store_dir)?;
    let entries = match creator {
        Some(c) => store.by_creator(c),
        None => store.all(),
    };

    if entries.is_empty() {
        println!("No stored strategies ({}).", store.file().display());
        return Ok(());
    }

    println!(
        "{:<28} {:<10} {:>5} {:>6} {:<20} CREATED",
        "ID", "STATUS", "STEPS", "RUNS", "CREATOR"
    );
    for entry in &entries {
        print_row(entry);
    }
    println!("\n{} of {} strategies", entries.len(), store.total());
    Ok(())
}

fn print_row(entry: &StoredStrategy) {
    let status = match entry.next_step {
        Some(next) => format!("{:?}@{}", entry.status, next + 1).to_lowercase(),
        None => format!("{:?}", entry.status).to_lowercase(),
    };
    println!(
        "{:<28} {:<10} {:>5} {:>6} {:<20} {}",
        entry.strategy.id,
        status,
        entry.strategy.steps.len(),
        entry.history.len(),
        entry.creator,
        entry.created_at.format("%Y-%m-%d %H:%M")
    );
}

/// Entry point for the `delete` command.
pub fn delete(store_dir: Option<&Path>, id: &str, caller: &str) -> Result<()> {
    let mut store = StrategyStore::open(store_dir)?;
    let remaining = store.delete(id, caller)?;
    println!("Strategy '{id}' deleted. Total strategies: {remaining}");
    Ok(())
}
