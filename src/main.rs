use clap::Parser;
use concepts::config::s3::{self, CredentialCheck};
use concepts::config::toml_config::TomlConfig;
use concepts::utils::{logger, validation::Validate};
use concepts::{
    CliConfig, Command, ConceptPipeline, ConceptsError, EtlEngine, Fetcher, S3ObjectStore,
    SyncConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting concepts CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(
            "❌ {:?} failed: {} (Category: {:?}, Severity: {:?})",
            cli.command,
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn load_config(cli: &CliConfig) -> Result<SyncConfig, ConceptsError> {
    let file = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let file = TomlConfig::from_file(path)?;
            file.validate()?;
            Some(file)
        }
        None => None,
    };
    SyncConfig::resolve(&cli.overrides, file.as_ref())
}

async fn run(cli: &CliConfig, config: &SyncConfig) -> Result<(), ConceptsError> {
    match cli.command {
        Command::Fetch => fetch(config).await,
        Command::Build => build(config, cli.monitor).await,
        Command::Sync => {
            fetch(config).await?;
            build(config, cli.monitor).await
        }
        Command::CheckCredentials => check_credentials(config).await,
    }
}

async fn s3_store(config: &SyncConfig) -> S3ObjectStore {
    let sdk_config = s3::load_sdk_config(config).await;
    S3ObjectStore::from_sdk_config(
        &sdk_config,
        config.bucket.clone(),
        config.endpoint_url.as_deref(),
    )
}

async fn fetch(config: &SyncConfig) -> Result<(), ConceptsError> {
    let store = s3_store(config).await;

    let report = Fetcher::new(store, config).run().await?;
    println!(
        "✅ Downloaded {} of {} objects from s3://{}/{} into {}",
        report.downloaded, report.listed, config.bucket, config.prefix, config.download_dir
    );
    Ok(())
}

async fn build(config: &SyncConfig, monitor: bool) -> Result<(), ConceptsError> {
    let pipeline = ConceptPipeline::from_config(config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor);

    let report = engine.run().await?;
    println!(
        "✅ Built {} with {} concepts. Found {} missing concept IDs:",
        config.database_path,
        report.concepts,
        report.missing_concepts.len()
    );
    for concept_id in &report.missing_concepts {
        println!("  - {}", concept_id);
    }
    Ok(())
}

async fn check_credentials(config: &SyncConfig) -> Result<(), ConceptsError> {
    let store = s3_store(config).await;

    match store.check_access(&config.prefix).await {
        CredentialCheck::Ok => {
            println!(
                "✅ Credentials loaded, s3://{}/{} is readable",
                store.bucket(),
                config.prefix
            );
            Ok(())
        }
        CredentialCheck::NoCredentials => {
            println!("No credentials found.");
            Err(ConceptsError::MissingConfigError {
                field: "AWS credentials".to_string(),
            })
        }
        CredentialCheck::Denied(reason) => Err(ConceptsError::storage(format!(
            "credentials resolved but s3://{}/{} is not accessible: {}",
            store.bucket(),
            config.prefix,
            reason
        ))),
    }
}
