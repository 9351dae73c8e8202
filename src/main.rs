// src/main.rs

use watchrun::{cli, config, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("watchrun error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    let raw = config::load_for_cli(args.config.as_deref())?;
    logging::init_logging(args.log_level, raw.run.log_level.as_deref())?;
    Ok(run(args, raw).await?)
}
