use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Yield strategy executor: validate, price and run AI-generated DeFi
/// strategies across EVM chains and NEAR.
#[derive(Parser)]
#[command(name = "yield-flow", version, about)]
pub struct Cli {
    /// Directory holding strategies.json (default: ~/.yield-flow)
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Output the JSON schema for strategy documents (for the generator)
    Schema,

    /// Output an example strategy JSON to stdout
    Example,

    /// Validate a strategy JSON file and show where each step routes
    Validate {
        /// Path to the strategy JSON file
        file: PathBuf,
    },

    /// Estimate per-chain fees for a strategy
    Estimate {
        /// Path to the strategy JSON file
        file: PathBuf,

        /// User address (EVM hex address or NEAR account id)
        #[arg(long)]
        user: String,

        /// Total investment amount, used by steps without their own amount
        #[arg(long, default_value = "0")]
        amount: String,
    },

    /// Execute a strategy step by step (Ctrl-C pauses between steps)
    Execute {
        /// Path to the strategy JSON file
        file: PathBuf,

        #[command(flatten)]
        exec: ExecArgs,
    },

    /// Resume a paused or failed strategy from its recorded next step
    Resume {
        /// Stored strategy id
        id: String,

        #[command(flatten)]
        exec: ExecArgs,

        /// Override the step index (0-based) to resume from
        #[arg(long)]
        from: Option<usize>,
    },

    /// List stored strategies
    Strategies {
        /// Only strategies stored by this creator
        #[arg(long)]
        creator: Option<String>,
    },

    /// Delete a stored strategy (creator only)
    Delete {
        /// Stored strategy id
        id: String,

        /// Caller identity; must match the creator
        #[arg(long)]
        caller: String,
    },
}

/// Options shared by `execute` and `resume`.
#[derive(clap::Args, Clone)]
pub struct ExecArgs {
    /// User address (EVM hex address or NEAR account id)
    #[arg(long)]
    pub user: String,

    /// Total investment amount, used by steps without their own amount
    #[arg(long, default_value = "0")]
    pub amount: String,

    /// Wallet kind: evm or near
    #[arg(long, default_value = "evm")]
    pub wallet: String,

    /// Max slippage in percent
    #[arg(long, default_value = "0.5")]
    pub slippage: f64,

    /// Gas preference: slow, standard or fast
    #[arg(long, default_value = "standard")]
    pub gas: String,

    /// Run preflight reads only; never submit transactions
    #[arg(long)]
    pub dry_run: bool,
}
