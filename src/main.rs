use anyhow::Result;
use clap::Parser;
use voxloop::app::{run_conversation, run_devices, run_say};
use voxloop::cli::{Cli, Commands};
use voxloop::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so the credential check sees it (DEEPGRAM_API_KEY,
    // OPENAI_API_KEY).
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        None => {
            run_conversation(config, cli.device, cli.grace_period, cli.quiet, cli.verbose).await?;
        }
        Some(Commands::Devices) => {
            run_devices()?;
        }
        Some(Commands::Say { text }) => {
            run_say(config, &text, cli.quiet).await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides())
}
