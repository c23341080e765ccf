//! txflow: prepare, sign and confirm on-chain lending and staking actions.
//!
//! # Architecture Overview
//!
//! ```text
//!     User intent (CLI args)
//!         │
//!         ▼
//!   ┌────────────┐    ┌────────────────┐    ┌─────────────────┐
//!   │  prepare   │───▶│   sequence     │───▶│     wallet      │──▶ eth_sendTransaction
//!   │ (backend)  │    │ (reducer +     │    │  (executor +    │
//!   └────────────┘    │  sequencer)    │    │   LocalWallet)  │
//!                     │                │    └─────────────────┘
//!                     │                │    ┌─────────────────┐
//!                     │                │───▶│   blockchain    │──▶ eth_getTransactionReceipt
//!                     │                │    │ (receipt waiter)│
//!                     │                │    └─────────────────┘
//!                     │                │    ┌─────────────────┐
//!                     │                │───▶│    tracker      │──▶ tracking service
//!                     └────────────────┘    └─────────────────┘
//!
//!   Cross-cutting: config, observability, resilience, lifecycle
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use txflow::blockchain::{ChainRegistry, LocalWallet};
use txflow::config::{load_config, TxflowConfig};
use txflow::lifecycle::signals::spawn_ctrl_c_handler;
use txflow::observability::{logging, metrics};
use txflow::prepare::{Action, ActionParams, ActionRequest, HttpPrepareApi};
use txflow::sequence::{describe, Orchestrator, Sequencer, Stage, StageView};
use txflow::tracker::{HttpTracker, NoopTracker, Tracker};
use txflow::wallet::WalletExecutor;
use txflow::Shutdown;

#[derive(Parser)]
#[command(name = "txflow")]
#[command(about = "Transaction lifecycle orchestrator for lending and staking actions", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "txflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare and execute one action with the local key wallet (TXFLOW_PRIVATE_KEY)
    Run {
        /// supply, withdraw, borrow, repay, stake or unstake
        action: Action,

        #[arg(long)]
        chain_id: u64,

        #[arg(long)]
        token: String,

        /// Decimal amount in token units
        #[arg(long)]
        amount: String,

        /// Automatic retries for retryable failures
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Validate the config file and print the effective values
    DescribeConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::DescribeConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Run {
            action,
            chain_id,
            token,
            amount,
            retries,
        } => {
            logging::init_logging(&config.observability);
            if config.observability.metrics_enabled {
                match config.observability.metrics_address.parse() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %config.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }
            tracing::info!("txflow v{} starting", env!("CARGO_PKG_VERSION"));

            let stage = run_action(&config, action, chain_id, token, amount, retries).await?;
            if stage != Stage::Confirmed {
                return Err(format!("{} did not confirm (last stage: {})", action, stage).into());
            }
            Ok(())
        }
    }
}

async fn run_action(
    config: &TxflowConfig,
    action: Action,
    chain_id: u64,
    token: String,
    amount: String,
    retries: u32,
) -> Result<Stage, Box<dyn std::error::Error>> {
    let chain = config
        .chain(chain_id)
        .ok_or_else(|| format!("chain {} has no [[chains]] entry", chain_id))?;

    let wallet = LocalWallet::from_env(&chain.rpc_url)?;
    let user_address = wallet.address();
    let registry = ChainRegistry::connect(&config.chains).await?;
    let api = HttpPrepareApi::new(&config.backend)?;
    let tracker: Arc<dyn Tracker> = if config.tracker.enabled {
        Arc::new(HttpTracker::new(&config.tracker)?)
    } else {
        Arc::new(NoopTracker)
    };

    let orchestrator = Orchestrator::from_config(
        config,
        Arc::new(api),
        WalletExecutor::new(Arc::new(wallet)),
        Arc::new(registry),
    )
    .with_tracker(tracker);

    let shutdown = Shutdown::new();
    spawn_ctrl_c_handler(shutdown.clone());

    let request = ActionRequest::new(
        action,
        ActionParams {
            chain_id,
            token,
            amount,
            user_address,
        },
    );
    let mut sequencer = shutdown
        .abandon_on_shutdown(orchestrator.begin(&request))
        .await?;
    print_updates(&mut sequencer);
    println!("{}", sequencer.view());

    let mut stage = sequencer.run_until_abandoned(&shutdown).await?;
    let mut attempts_left = retries;
    while attempts_left > 0 {
        let view = sequencer.view();
        let next = next_attempt(&view);
        if next == NextAttempt::Stop {
            if let Some(chain_id) = view.switch_network_to {
                tracing::warn!(
                    chain_id,
                    "Wallet is on the wrong network; switch networks and run again"
                );
            }
            break;
        }
        attempts_left -= 1;

        stage = if next == NextAttempt::Recheck {
            tracing::info!(attempts_left, "Re-checking timed-out transaction");
            shutdown.abandon_on_shutdown(sequencer.recheck()).await?
        } else {
            tracing::info!(attempts_left, "Retrying failed step");
            shutdown.abandon_on_shutdown(sequencer.retry()).await?
        };
    }

    if let Ok(record) = sequencer.tracker().get_transaction().await {
        tracing::info!(
            tracking_id = %record.id,
            status = record.status.as_str(),
            "Tracker record"
        );
    }
    Ok(stage)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextAttempt {
    Recheck,
    Retry,
    Stop,
}

/// What `run --retries` does with the current state.
///
/// A wrong network needs the user's wallet to switch first, so it is never
/// retried automatically.
fn next_attempt(view: &StageView) -> NextAttempt {
    let retryable = view.retry_enabled && view.error.map_or(false, |e| e.is_retryable());
    if view.stage == Stage::Confirmed || !retryable || view.switch_network_to.is_some() {
        NextAttempt::Stop
    } else if view.stage == Stage::Timeout {
        NextAttempt::Recheck
    } else {
        NextAttempt::Retry
    }
}

/// Print every published state until the sequencer is dropped.
fn print_updates(sequencer: &mut Sequencer) {
    let mut rx = sequencer.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = describe(&rx.borrow_and_update());
            println!("{}", view);
        }
    });
}
