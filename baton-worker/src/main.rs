mod cli;

use anyhow::Context;
use baton_core::ProcessId;
use baton_store::RedisStore;
use baton_worker::{DiagnosticReporter, Worker};
use clap::Parser;
use cli::Cli;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(cli.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.log_json).then(|| tracing_subscriber::fmt::layer().with_target(false)))
        .init();

    let store = Arc::new(RedisStore::new(cli.store_config()).context("creating store client")?);
    let config = cli.worker_config();

    if cli.get_errors {
        let reporter = DiagnosticReporter::new(store, config.keys.errors.clone());
        let report = reporter
            .report_and_clear()
            .await
            .context("reading error list")?;

        if cli.json {
            println!("{}", report.to_json()?);
        } else {
            println!("{}", report);
        }
        return Ok(());
    }

    let worker = Worker::new(store, ProcessId::current(), config)?;
    let handle = worker.handle();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping worker");
                handle.shutdown();
            }
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
    });

    let stats = worker.run().await?;
    info!("Final stats: {:?}", stats);
    Ok(())
}
