// Rust guideline compliant 2026-10-19

//! Fraud-scoring relay entry point.
//!
//! Waits for Kafka, ensures the input and output topics exist, then consumes
//! transactions, attaches a `fraud_score`, and republishes them until SIGINT or
//! SIGTERM. Configuration comes from environment variables (see
//! [`config::AppConfig::from_env`]).
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info KAFKA_BOOTSTRAP_SERVERS=localhost:9092 cargo run --bin fraud_scorer
//!
//! # Also show per-message debug output
//! RUST_LOG=debug cargo run --bin fraud_scorer
//! ```

mod adapters;
mod config;

use adapters::kafka_transport::{KafkaSettings, KafkaTransport, client_id};
use anyhow::Context as _;
use config::AppConfig;
use lifecycle::Lifecycle;
use relay::shutdown;
use scoring::ConstantScorer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize the tracing subscriber before any async work.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    config.log_summary();

    let transport = KafkaTransport::new(KafkaSettings {
        bootstrap_servers: config.bootstrap_servers.clone(),
        timeout: config.broker_timeout,
        auto_offset_reset: config.auto_offset_reset.as_str(),
        client_id: client_id(&config.lifecycle.group_id),
    });
    // Placeholder model until a real scorer is plugged in.
    let lifecycle = Lifecycle::new(config.lifecycle, ConstantScorer::default());

    let (handle, signal) = shutdown::channel();
    let run = lifecycle.run(&transport, signal);
    tokio::pin!(run);

    // The relay observes the signal between messages and drains itself, so
    // after triggering we keep awaiting it until it reaches Stopped.
    let report = tokio::select! {
        result = &mut run => result,
        () = termination() => {
            tracing::info!("main.shutdown: signal received, draining");
            handle.trigger();
            run.await
        }
    }
    .context("fraud scorer stopped with an error")?;

    tracing::info!(
        received = report.received,
        forwarded = report.forwarded,
        skipped = report.skipped(),
        "main.stopped"
    );
    Ok(())
}

/// Resolve on CTRL+C, or on SIGTERM where supported.
async fn termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("main.signal: cannot listen for ctrl_c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("main.signal: cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
