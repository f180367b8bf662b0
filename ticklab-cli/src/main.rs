//! ticklab CLI — run a tick-level backtest or a parameter sweep.
//!
//! Loads a tab-separated tick export, simulates a moving-average crossover
//! strategy against it, and optionally sweeps the strategy's parameter
//! grid to find the best combination.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use ticklab_core::data::{TickParser, TickStore};
use ticklab_core::domain::{Position, SimulationPeriod, Trade};
use ticklab_core::engine::{
    AccountProperties, ExecutionMode, Optimizer, Results, Simulator,
};
use ticklab_core::strategy::{MaCrossover, MaCrossoverParams};

#[derive(Parser)]
#[command(name = "ticklab")]
#[command(about = "Tick-level strategy backtester", version)]
struct Cli {
    /// Tab-separated tick file (MetaTrader export schema).
    ticks: PathBuf,

    /// Simulation stride: tick, s1, s5, s10, s30, or min1.
    #[arg(long, default_value = "s1")]
    period: String,

    /// Initial account balance.
    #[arg(long, default_value_t = 10_000.0)]
    balance: f64,

    /// Account leverage.
    #[arg(long, default_value_t = 50)]
    leverage: u32,

    /// Sweep the strategy parameter grid instead of a single run.
    #[arg(long)]
    sweep: bool,

    /// Run the sweep sequentially instead of on the worker pool.
    #[arg(long)]
    sequential: bool,

    /// Write the results as JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let period = parse_period(&cli.period)?;

    let parse_started = Instant::now();
    let ticks = TickParser::new()
        .parse_file(&cli.ticks)
        .with_context(|| format!("failed to parse ticks from {}", cli.ticks.display()))?;
    if ticks.is_empty() {
        bail!("no ticks in {}; check the file's schema", cli.ticks.display());
    }
    info!(
        count = ticks.len(),
        elapsed_ms = parse_started.elapsed().as_millis() as u64,
        "parsed ticks"
    );

    let store = TickStore::new(ticks);
    let properties = AccountProperties {
        account_balance: cli.balance,
        leverage: cli.leverage,
        ..Default::default()
    };
    let simulator = Simulator::new(&store, period, properties);

    let results = if cli.sweep {
        run_sweep(&simulator, cli.sequential)?
    } else {
        run_single(&simulator)
    };

    print_results(&results);

    if let Some(path) = &cli.json {
        let json = serde_json::to_string_pretty(&results)
            .context("failed to serialize results to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote results");
    }

    Ok(())
}

fn parse_period(text: &str) -> Result<SimulationPeriod> {
    match text.to_ascii_lowercase().as_str() {
        "tick" => Ok(SimulationPeriod::Tick),
        "s1" => Ok(SimulationPeriod::S1),
        "s5" => Ok(SimulationPeriod::S5),
        "s10" => Ok(SimulationPeriod::S10),
        "s30" => Ok(SimulationPeriod::S30),
        "min1" => Ok(SimulationPeriod::Min1),
        other => bail!("unknown simulation period '{other}'"),
    }
}

fn run_single(simulator: &Simulator) -> Results {
    let started = Instant::now();
    let mut strategy = MaCrossover::new(9, 20, 0.01, 1.6);
    let results = simulator.run(&mut strategy);
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        balance = results.account_balance,
        "single run finished"
    );
    results
}

fn run_sweep(simulator: &Simulator, sequential: bool) -> Result<Results> {
    let combinations = parameter_grid();
    let mode = if sequential {
        ExecutionMode::Sequential
    } else {
        ExecutionMode::Parallel
    };

    let optimizer = Optimizer::new(simulator, MaCrossover::from_params);

    let started = Instant::now();
    let Some((results, best)) = optimizer.find_best(mode, &combinations) else {
        bail!("parameter grid is empty");
    };
    info!(
        combinations = combinations.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        sequential,
        "sweep finished"
    );

    println!(
        "Best parameters: fast={} slow={} allowed_loss={:.3} risk_reward={:.1}",
        best.fast_period, best.slow_period, best.allowed_loss, best.risk_reward_ratio
    );
    Ok(results)
}

/// The sweep grid: fast 5..12, slow 12..40, allowed loss 0.5%..2.5% in
/// 0.5% steps, risk/reward 1.0..2.0 in 0.2 steps.
fn parameter_grid() -> Vec<MaCrossoverParams> {
    let mut combinations = Vec::new();
    for fast_period in 5..12 {
        for slow_period in 12..40 {
            for loss_step in 1..5 {
                let allowed_loss = 0.005 * loss_step as f64;
                for ratio_step in 0..5 {
                    let risk_reward_ratio = 1.0 + 0.2 * ratio_step as f64;
                    combinations.push(MaCrossoverParams {
                        fast_period,
                        slow_period,
                        allowed_loss,
                        risk_reward_ratio,
                    });
                }
            }
        }
    }
    combinations
}

fn print_results(results: &Results) {
    println!("==== Unclosed positions ====");
    for position in &results.open_positions {
        print_position(position);
    }

    println!();
    println!("==== Trades ====");
    for trade in &results.trades {
        print_trade(trade);
    }

    println!();
    println!("Final account balance: {:.2}", results.account_balance);
    println!("Final total equity:    {:.2}", results.total_equity);
}

fn print_position(position: &Position) {
    println!(
        "{} position opened {} at {:.5}, volume {}",
        if position.is_long { "Long" } else { "Short" },
        position.open_time,
        position.open_price,
        position.volume,
    );
}

fn print_trade(trade: &Trade) {
    println!(
        "{} {:?} opened {} at {:.5}, closed {} at {:.5}, volume {}, profit {:.2}",
        if trade.is_long { "Long" } else { "Short" },
        trade.close_type,
        trade.open_time,
        trade.open_price,
        trade.close_time,
        trade.close_price,
        trade.volume,
        trade.profit(),
    );
}
