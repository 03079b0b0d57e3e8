use anyhow::Result;
use clap::Parser;

use battleboard_infrastructure::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "battleboard")]
#[command(about = "Battle and kill feed collector", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Run every job once, drain the work queue and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(config) = args.config {
        std::env::set_var("BATTLEBOARD_CONFIG", config);
    }

    let config = AppConfig::load().await?;
    let _log_guard = battleboard_bootstrap::init_tracing(config.log_dir.as_deref())?;

    if args.once {
        battleboard_bootstrap::run_once(config).await
    } else {
        battleboard_bootstrap::run_standalone(config).await
    }
}
