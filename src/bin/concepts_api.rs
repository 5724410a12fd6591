use clap::Parser;
use concepts::config::toml_config::TomlConfig;
use concepts::utils::{logger, validation::Validate};
use concepts::{ServerArgs, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    logger::init_server_logger(args.log_json);
    tracing::info!("Starting concepts API v{}", env!("CARGO_PKG_VERSION"));

    let file = match &args.config {
        Some(path) => {
            let file = TomlConfig::from_file(path)?;
            file.validate()?;
            Some(file)
        }
        None => None,
    };

    let config = ServerConfig::resolve(args.host, args.port, args.database, file.as_ref())?;
    tracing::debug!("Server config: {:?}", config);

    if let Err(e) = concepts::api::serve(&config).await {
        tracing::error!("💡 {}", e.recovery_suggestion());
        return Err(e.into());
    }
    Ok(())
}
