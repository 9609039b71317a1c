//! CLI entry point for range-repair.

use std::sync::Arc;

use clap::{CommandFactory, Parser};

use cli::{init_logging, RangeRepairCli};
use nodetool::{CommandRunner, SystemRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = RangeRepairCli::parse();
    init_logging(&args)?;

    let options = args.into_options();
    if let Err(err) = options.validate() {
        RangeRepairCli::command().print_help()?;
        eprintln!("\nerror: {err}");
        std::process::exit(1);
    }

    tracing::info!(
        host = %options.host,
        workers = options.workers,
        steps = options.steps,
        resume = options.resume,
        "starting range repair"
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    repair::driver::run(options, runner).await
}
