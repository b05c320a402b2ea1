use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};

use crate::config::{RunOptions, RuntimeConfig};
use crate::model::{ExecutionContext, GasPreference, Strategy, WalletKind};
use crate::orchestrator::{Coordinator, ExecutionReport, PauseSignal, RunState};
use crate::registry::AdapterRegistry;
use crate::store::StrategyStore;

/// CLI-facing execution options (before environment resolution).
pub struct ExecConfig {
    pub user: String,
    pub amount: String,
    pub wallet: String,
    pub slippage_percent: f64,
    pub gas: String,
    pub dry_run: bool,
}

/// Entry point for the `execute` command.
pub fn execute(strategy_path: &Path, cfg: &ExecConfig, store_dir: Option<&Path>) -> Result<()> {
    let strategy = load(strategy_path)?;
    let ctx = build_context(strategy, cfg)?;
    let config = RuntimeConfig::from_cli(&RunOptions { dry_run: cfg.dry_run })?;

    let mut store = StrategyStore::open(store_dir)?;
    if store.get(&ctx.strategy.id).is_some() {
        store.update(ctx.strategy.clone(), &cfg.user)?;
    } else {
        let total = store.store(ctx.strategy.clone(), &cfg.user)?;
        println!("Stored strategy '{}' (total strategies: {total})", ctx.strategy.id);
    }

    print_header("execute", &ctx, &config);
    let pause = install_pause_handler()?;

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let report = rt.block_on(async {
        let coordinator = build_coordinator(&config)?;
        let out = coordinator.execute_with_pause(&ctx, &pause).await?;
        anyhow::Ok(out)
    })?;

    store.record_run(&ctx.strategy.id, &report)?;
    print_report(&ctx.strategy, &report);
    Ok(())
}

/// Entry point for the `resume` command.
pub fn resume(
    id: &str,
    from: Option<usize>,
    cfg: &ExecConfig,
    store_dir: Option<&Path>,
) -> Result<()> {
    let mut store = StrategyStore::open(store_dir)?;
    let entry = store
        .get(id)
        .ok_or_else(|| anyhow!("strategy '{id}' not found in {}", store.file().display()))?;
    let from = from.or(entry.next_step).ok_or_else(|| {
        anyhow!("strategy '{id}' has no recorded resume point; pass --from <step index>")
    })?;

    let ctx = build_context(entry.strategy.clone(), cfg)?;
    let config = RuntimeConfig::from_cli(&RunOptions { dry_run: cfg.dry_run })?;

    print_header("resume", &ctx, &config);
    println!("From:     step {} of {}", from + 1, ctx.strategy.steps.len());
    println!();
    let pause = install_pause_handler()?;

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let report = rt.block_on(async {
        let coordinator = build_coordinator(&config)?;
        let out = coordinator.resume_strategy(&ctx, from, Some(&pause)).await?;
        anyhow::Ok(out)
    })?;

    store.record_run(id, &report)?;
    print_report(&ctx.strategy, &report);
    Ok(())
}

/// Entry point for the `estimate` command. Never submits anything.
pub fn estimate(strategy_path: &Path, user: &str, amount: &str) -> Result<()> {
    let strategy = load(strategy_path)?;
    let mut ctx = ExecutionContext::new(strategy, user);
    ctx.investment_amount = amount.to_string();
    let config = RuntimeConfig::from_cli(&RunOptions { dry_run: true })?;

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let totals = rt.block_on(async {
        let coordinator = build_coordinator(&config)?;
        let out = coordinator.estimate_for_strategy(&ctx).await?;
        anyhow::Ok(out)
    })?;

    println!("Estimated fees for '{}':", ctx.strategy.id);
    for (chain, fee) in &totals.0 {
        println!("  {chain:<10} {fee}");
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────

fn load(path: &Path) -> Result<Strategy> {
    crate::validate::load_and_validate(path).map_err(|errors| {
        let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow!("Strategy validation failed:\n  {}", msgs.join("\n  "))
    })
}

fn build_context(strategy: Strategy, cfg: &ExecConfig) -> Result<ExecutionContext> {
    let wallet_kind: WalletKind = cfg.wallet.parse().map_err(|e: String| anyhow!(e))?;
    let gas_preference: GasPreference = cfg.gas.parse().map_err(|e: String| anyhow!(e))?;
    if !(0.0..=100.0).contains(&cfg.slippage_percent) {
        bail!("slippage must be within 0..=100 percent, got {}", cfg.slippage_percent);
    }

    let mut ctx = ExecutionContext::new(strategy, cfg.user.clone());
    ctx.investment_amount = cfg.amount.clone();
    ctx.wallet_kind = wallet_kind;
    ctx.gas_preference = gas_preference;
    ctx.slippage_tolerance_percent = cfg.slippage_percent;
    Ok(ctx)
}

fn build_coordinator(config: &RuntimeConfig) -> Result<Coordinator> {
    let registry = AdapterRegistry::live(&config.chains, &config.adapter)?;
    Ok(Coordinator::new(Arc::new(registry)).with_step_delay(config.step_delay))
}

/// Ctrl-C requests a pause; the current step always finishes first.
fn install_pause_handler() -> Result<PauseSignal> {
    let pause = PauseSignal::new();
    let handle = pause.clone();
    ctrlc::set_handler(move || {
        if !handle.is_requested() {
            eprintln!("\nPause requested; stopping after the current step...");
        }
        handle.request();
    })
    .context("installing Ctrl-C handler")?;
    Ok(pause)
}

fn print_header(command: &str, ctx: &ExecutionContext, config: &RuntimeConfig) {
    println!("=== yield-flow {command} ===");
    println!(
        "Strategy: {} ({} steps)",
        ctx.strategy.id,
        ctx.strategy.steps.len()
    );
    println!("User:     {} ({:?})", ctx.user_address, ctx.wallet_kind);
    println!("Amount:   {}", ctx.investment_amount);
    println!("Gas:      {:?}", ctx.gas_preference);
    println!("Dry run:  {}", config.adapter.dry_run);
    println!();
}

fn print_report(strategy: &Strategy, report: &ExecutionReport) {
    println!();
    for result in &report.results {
        let status = if result.is_failed() { "FAILED" } else { "ok" };
        print!("  [{status:>6}] {}", result.step_id);
        if let Some(hash) = &result.transaction_hash {
            print!("  tx={hash}");
        }
        if let Some(block) = result.block_number {
            print!("  block={block}");
        }
        if let Some(gas) = result.gas_used {
            print!("  gas={gas}");
        }
        if let Some(err) = &result.error {
            print!("  error={err}");
        }
        println!();
    }

    let total = strategy.steps.len();
    match report.state {
        RunState::Completed => {
            println!("\nCompleted: {} step(s) executed.", report.results.len());
        }
        RunState::Aborted { failed_step } => {
            println!(
                "\nPartial success: {} of {} step(s) succeeded; step {} failed, later steps skipped.",
                report.succeeded(),
                total,
                failed_step + 1
            );
        }
        RunState::Paused { next } => {
            println!("\nPaused before step {} of {}.", next + 1, total);
        }
        other => println!("\nFinished in state {other}."),
    }
    if report.next_step().is_some() {
        println!("Resume with: yield-flow resume {} --user <address>", strategy.id);
    } else if report.failed_after_broadcast() {
        println!(
            "The failed step broadcast a transaction; check it on-chain, then resume with --from <step index>."
        );
    }
}
