use clap::Parser;
use medai_cli::{Cli, Command, commands, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; credentials may come from the shell.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let default_level = match cli.command {
        Command::Chat { .. } => "warn",
        _ => "info",
    };
    telemetry::init(cli.log_json, default_level);

    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Index { input, out } => commands::run_index(config, &input, out).await,
        Command::Chat { index_dir, patients, no_log } => {
            commands::run_chat(config, index_dir, patients, no_log).await
        }
        Command::Lookup { name, patients } => commands::run_lookup(config, &name, patients),
    }
}
