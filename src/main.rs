mod cli;

use clap::Parser;
use cli::{Cli, Commands, ProbeArgs};
use scrapebox::config::Config;
use scrapebox::engine::Engine;
use scrapebox::modules::{ModuleDescriptor, ModuleSettings, ProbeModule};
use scrapebox::services::Services;
use tokio_util::sync::CancellationToken;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Probe(args) => probe(args).await?,
    }

    Ok(())
}

async fn probe(args: ProbeArgs) -> Result<(), AnyError> {
    let config = Config::load()?;
    let engine = Engine::from_config(config);

    let settings = ModuleSettings::builder()
        .base_url(args.base_url)
        .min_backoff(args.min_backoff)
        .build();
    let targets = args.targets;
    engine.register(vec![ModuleDescriptor::from_factory("probe", move || {
        Box::new(ProbeModule::new(settings.clone(), targets.clone()))
    })])?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let report = engine.start(Services::new(), cancel).await?;
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Run complete"
    );

    Ok(())
}
