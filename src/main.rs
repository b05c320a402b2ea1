use clap::Parser;

mod cli;

use yield_flow::{example, run, schema, strategies, validate};

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = cli::Cli::parse();
    let store_dir = cli.store_dir.as_deref();

    match cli.command {
        cli::Command::Schema => schema::run(),
        cli::Command::Example => example::run(),
        cli::Command::Validate { file } => validate::run(&file),
        cli::Command::Estimate { file, user, amount } => run::estimate(&file, &user, &amount),
        cli::Command::Execute { file, exec } => run::execute(&file, &exec.into(), store_dir),
        cli::Command::Resume { id, exec, from } => run::resume(&id, from, &exec.into(), store_dir),
        cli::Command::Strategies { creator } => strategies::list(store_dir, creator.as_deref()),
        cli::Command::Delete { id, caller } => strategies::delete(store_dir, &id, &caller),
    }
}

impl From<cli::ExecArgs> for run::ExecConfig {
    fn from(args: cli::ExecArgs) -> Self {
        run::ExecConfig {
            user: args.user,
            amount: args.amount,
            wallet: args.wallet,
            slippage_percent: args.slippage,
            gas: args.gas,
            dry_run: args.dry_run,
        }
    }
}
