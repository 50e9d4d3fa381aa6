//! WAF Sensor - Main Entry Point
//!
//! Reads producer requests as JSON lines on stdin, classifies and stores
//! each one. Configuration comes from the environment (and `.env`).

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use waf_sensor::constants::{APP_NAME, APP_VERSION};
use waf_sensor::logic::model::{load_tampering_scorer, load_text_scorer};
use waf_sensor::{
    AuditStore, FallbackAdapter, Request, Sensor, SensorConfig, SensorEvent, SignatureEngine,
    ThreatClassifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = SensorConfig::from_env();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);
    log::info!("Audit database: {}", config.db_path.display());

    // Engines
    let signatures = SignatureEngine::builtin().context("failed compiling built-in signatures")?;
    log::info!("{} signatures loaded", signatures.signatures().pattern_count());

    let fallback = FallbackAdapter::new(
        load_text_scorer(&config.text_model),
        load_tampering_scorer(&config.tamper_model),
        config.scorer_timeout,
    )
    .with_call_limit(config.workers);
    let classifier = Arc::new(ThreatClassifier::new(signatures, fallback));

    let store = Arc::new(
        AuditStore::open(&config.db_path, &config.snapshot_dir)
            .context("failed opening audit store")?,
    );

    let (sensor, mut events) = Sensor::start(
        classifier,
        Arc::clone(&store),
        config.workers,
        config.queue_capacity,
    );

    let reporter = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SensorEvent::Stored { id, phase, threats } => {
                    log::info!("Stored #{} ({} phase): {:?}", id, phase, threats);
                }
                SensorEvent::Rejected { origin, error } => {
                    log::warn!("Rejected request from {}: {}", origin, error);
                }
                SensorEvent::Failed { error } => {
                    log::error!("Store failure: {}", error);
                }
            }
        }
    });

    // Producer feed
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("failed reading stdin")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let req: Request = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                log::warn!("Skipping line {}: {}", line_no, e);
                continue;
            }
        };
        if sensor.submit(req).await.is_err() {
            break;
        }
    }

    let stats = sensor.shutdown().await;
    reporter.await.context("event reporter failed")?;

    log::info!(
        "Done: {} classified ({} by signature, {} by fallback), {} rejected, {} scorer failures, {} records in store",
        stats.classified,
        stats.signature_decisions,
        stats.ml_decisions,
        stats.rejected,
        stats.scorer_failures,
        store.count().context("failed counting audit records")?
    );

    Ok(())
}
