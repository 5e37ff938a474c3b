use clap::Parser;
use pollroom::cli::{self, Cli, Command, ConfigCommand};
use pollroom::{config, logging, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or_default() {
        Command::Start { port, bind } => {
            let mut cfg = config::load_config()?;
            cli::apply_start_overrides(&mut cfg, port, bind);
            config::ensure_valid(&cfg)?;
            logging::init_logging(&cfg.logging)?;
            info!(
                version = env!("CARGO_PKG_VERSION"),
                config = %config::get_config_path().display(),
                "starting pollroom"
            );
            server::serve(&cfg, shutdown_signal()).await?;
        }
        Command::Config(ConfigCommand::Show) => cli::handle_config_show()?,
        Command::Config(ConfigCommand::Path) => cli::handle_config_path(),
        Command::Version => cli::handle_version(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
