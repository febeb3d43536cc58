//! poolctl - snapshot-in, snapshot-out harness for the pool engine.
//!
//! Stands in for the external caller: loads a JSON state snapshot, applies
//! exactly one operation, writes the new snapshot back and prints any
//! payment instructions for the caller to execute. A rejected operation
//! leaves the snapshot file untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};

use pool_model::{ClaimKey, Line, Payment, PoolModel};

#[derive(Parser)]
#[command(name = "poolctl")]
#[command(about = "Pool accounting engine CLI - apply one operation to a state snapshot", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the JSON state snapshot
    #[arg(short, long, default_value = "pool.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh, empty pool snapshot
    Init {
        /// Fixed-point precision (power of ten)
        #[arg(long, default_value_t = 1_000_000)]
        precision: i128,

        /// Seconds a deposit stays locked before approval
        #[arg(long, default_value_t = 0)]
        entry_lock_period: i64,
    },

    /// Print a human-readable summary of the snapshot
    Show,

    /// Deposit liquidity as a pending, time-locked entry
    Deposit {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        amount: i128,
        #[arg(long)]
        now: i64,
    },

    /// Approve a matured entry into a share-holding position
    Approve {
        #[arg(long)]
        entry: u64,
        #[arg(long)]
        now: i64,
    },

    /// Cancel a pending entry and refund it
    Cancel {
        #[arg(long)]
        entry: u64,
    },

    /// Register a recurring event line
    AddLine {
        #[arg(long)]
        measure_period: i64,
        #[arg(long)]
        bets_period: i64,
        #[arg(long, default_value_t = 0)]
        last_close: i64,
        #[arg(long)]
        max_events: u64,
        #[arg(long)]
        paused: bool,
        #[arg(long, default_value_t = 0)]
        min_betting_period: i64,
    },

    /// Toggle a line's pause flag
    PauseLine {
        #[arg(long)]
        line: u64,
    },

    /// Create one event on a line, committing a slice of pool liquidity
    CreateEvent {
        #[arg(long)]
        line: u64,
        #[arg(long)]
        event: u64,
        #[arg(long)]
        now: i64,
    },

    /// Burn shares from a position, paying out the unexposed value
    Claim {
        #[arg(long)]
        position: u64,
        #[arg(long)]
        shares: i128,
    },

    /// Settle an event with its final result
    PayReward {
        #[arg(long)]
        event: u64,
        #[arg(long)]
        amount: i128,
    },

    /// Withdraw resolved claims, given as event:position pairs
    Withdraw {
        #[arg(long = "claim", required = true)]
        claims: Vec<String>,
    },

    /// Unconditional transfer into the pool
    TopUp {
        #[arg(long)]
        amount: i128,
    },

    /// Change the lock applied to future deposits
    SetEntryLockPeriod {
        #[arg(long)]
        period: i64,
    },
}

fn load_pool(path: &Path) -> Result<PoolModel> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let pool = serde_json::from_str(&raw)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    debug!("loaded snapshot from {}", path.display());
    Ok(pool)
}

fn save_pool(path: &Path, pool: &PoolModel) -> Result<()> {
    let raw = serde_json::to_string_pretty(pool).context("serializing snapshot")?;
    std::fs::write(path, raw)
        .with_context(|| format!("writing snapshot {}", path.display()))?;
    debug!("saved snapshot to {}", path.display());
    Ok(())
}

fn parse_claim_key(raw: &str) -> Result<ClaimKey> {
    let (event, position) = raw
        .split_once(':')
        .with_context(|| format!("claim key '{raw}' is not event:position"))?;
    Ok(ClaimKey {
        event_id: event.parse().with_context(|| format!("bad event id in '{raw}'"))?,
        position_id: position
            .parse()
            .with_context(|| format!("bad position id in '{raw}'"))?,
    })
}

fn print_payment(payment: &Payment) {
    if payment.amount > 0 {
        println!(
            "{} {} -> {}",
            "pay".green().bold(),
            payment.amount,
            payment.provider
        );
    }
}

fn print_payouts(payouts: &BTreeMap<String, i128>) {
    for (provider, amount) in payouts {
        print_payment(&Payment { provider: provider.clone(), amount: *amount });
    }
}

fn show(pool: &PoolModel) -> Result<()> {
    println!("{}", "pool snapshot".bold());
    println!("  balance:                {}", pool.balance);
    println!("  total shares:           {}", pool.total_shares);
    println!("  active liquidity (F):   {}", pool.active_liquidity_f);
    println!("  withdrawable (F):       {}", pool.withdrawable_liquidity_f);
    println!("  free liquidity (F):     {}", pool.free_liquidity_f()?);
    println!("  counter:                {}", pool.counter);
    println!("  capacity slots:         {}", pool.max_events);
    println!(
        "  lines/events/positions: {}/{}/{}",
        pool.lines.len(),
        pool.events.len(),
        pool.positions.len()
    );
    println!(
        "  entries/claims/active:  {}/{}/{}",
        pool.entries.len(),
        pool.claims.len(),
        pool.active_events.len()
    );
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { precision, entry_lock_period } = cli.command {
        let pool = PoolModel::new(precision, entry_lock_period);
        save_pool(&cli.state, &pool)?;
        println!("{} {}", "initialized".green().bold(), cli.state.display());
        return Ok(());
    }

    let mut pool = load_pool(&cli.state)?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Show => return show(&pool),
        Commands::Deposit { provider, amount, now } => {
            let entry_id = pool.deposit_liquidity(&provider, amount, now)?;
            info!("deposit of {amount} from {provider} accepted");
            println!("entry {entry_id}");
        }
        Commands::Approve { entry, now } => {
            let position_id = pool.approve_liquidity(entry, now)?;
            info!("entry {entry} approved into position {position_id}");
            println!("position {position_id}");
        }
        Commands::Cancel { entry } => {
            let payment = pool.cancel_liquidity(entry)?;
            info!("entry {entry} cancelled");
            print_payment(&payment);
        }
        Commands::AddLine {
            measure_period,
            bets_period,
            last_close,
            max_events,
            paused,
            min_betting_period,
        } => {
            let line_id = pool.add_line(Line {
                measure_period,
                bets_period,
                last_bets_close_time: last_close,
                max_events,
                is_paused: paused,
                min_betting_period,
            })?;
            info!("line {line_id} added with {max_events} slots");
            println!("line {line_id}");
        }
        Commands::PauseLine { line } => {
            let paused = pool.trigger_pause_line(line)?;
            println!("line {line} {}", if paused { "paused".yellow() } else { "active".green() });
        }
        Commands::CreateEvent { line, event, now } => {
            pool.create_event(line, event, now)?;
            let provided = pool.events.get(&event).map(|e| e.provided).unwrap_or(0);
            info!("event {event} created on line {line}, provided {provided}");
            println!("event {event} provided {provided}");
        }
        Commands::Claim { position, shares } => {
            let payment = pool.claim_liquidity(position, shares)?;
            info!("claimed {shares} shares from position {position}");
            print_payment(&payment);
        }
        Commands::PayReward { event, amount } => {
            pool.pay_reward(event, amount)?;
            info!("event {event} resolved with result {amount}");
        }
        Commands::Withdraw { claims } => {
            let keys = claims
                .iter()
                .map(|raw| parse_claim_key(raw))
                .collect::<Result<Vec<_>>>()?;
            let payouts = pool.withdraw_liquidity(&keys)?;
            info!("withdrew {} claims", keys.len());
            print_payouts(&payouts);
        }
        Commands::TopUp { amount } => {
            pool.default(amount)?;
            info!("pool topped up by {amount}");
        }
        Commands::SetEntryLockPeriod { period } => {
            pool.set_entry_lock_period(period)?;
            info!("entry lock period set to {period}");
        }
    }

    save_pool(&cli.state, &pool)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        let fatal = err
            .downcast_ref::<pool_model::PoolError>()
            .map(|e| e.is_invariant())
            .unwrap_or(false);
        if fatal {
            eprintln!("{} {err:#}", "fatal:".red().bold());
        } else {
            eprintln!("{} {err:#}", "error:".red().bold());
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        save_pool(&path, &<PoolModel as Default>::default()).unwrap();
        (dir, path)
    }

    #[test]
    fn snapshot_file_round_trips() {
        let (_dir, path) = init_file();
        let mut pool = load_pool(&path).unwrap();
        pool.deposit_liquidity("alice", 100, 0).unwrap();
        save_pool(&path, &pool).unwrap();
        assert_eq!(load_pool(&path).unwrap(), pool);
    }

    #[test]
    fn rejected_operation_leaves_the_file_untouched() {
        let (_dir, path) = init_file();
        let cli = Cli {
            state: path.clone(),
            command: Commands::Approve { entry: 99, now: 0 },
        };
        assert!(run(cli).is_err());
        assert_eq!(load_pool(&path).unwrap(), <PoolModel as Default>::default());
    }

    #[test]
    fn claim_keys_parse_and_reject() {
        assert_eq!(
            parse_claim_key("3:7").unwrap(),
            ClaimKey { event_id: 3, position_id: 7 }
        );
        assert!(parse_claim_key("37").is_err());
        assert!(parse_claim_key("a:7").is_err());
    }

    #[test]
    fn deposit_then_approve_through_the_harness() {
        let (_dir, path) = init_file();
        run(Cli {
            state: path.clone(),
            command: Commands::Deposit { provider: "alice".into(), amount: 100, now: 0 },
        })
        .unwrap();
        run(Cli {
            state: path.clone(),
            command: Commands::Approve { entry: 0, now: 0 },
        })
        .unwrap();
        let pool = load_pool(&path).unwrap();
        assert_eq!(pool.total_shares, 100);
        assert_eq!(pool.balance, 100);
    }
}
