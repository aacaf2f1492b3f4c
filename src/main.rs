// src/main.rs

use shrinkwrap::config::load_and_validate;
use shrinkwrap::console::ConsoleSink;
use shrinkwrap::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        if tracing::dispatcher::has_been_set() {
            tracing::error!("shrinkwrap error: {err:#}");
        } else {
            eprintln!("shrinkwrap error: {err:?}");
        }
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let console = ConsoleSink::stdout();

    let config = load_and_validate(&args)?;
    logging::init_logging(console.clone(), args.log_level, config.debug())?;

    run(config, console, args.dry_run).await
}
