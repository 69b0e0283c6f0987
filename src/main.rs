mod config;
mod decoder;
mod error;
mod location;
mod models;
mod source;
mod stream;
mod telemetry;
mod utils;

use log::{error, info};
use time::OffsetDateTime;

use config::ExporterConfig;
use error::ExporterError;
use location::LocationTable;
use source::DecoderProcess;
use stream::StreamProcessor;
use telemetry::{install_exporter, PrometheusSink};
use utils::format_datetime;

/// Feed decoder output into the metric sink until the decoder stops
///
/// A failing stream kills the decoder; a drained stream waits for its exit status.
async fn run_pipeline(config: &ExporterConfig, table: &LocationTable) -> Result<(), ExporterError> {
    let mut process = DecoderProcess::spawn(&config.subprocess)?;
    let output = process.take_output()?;

    let sink = PrometheusSink;
    let mut processor = StreamProcessor::new(table, &sink);

    match processor.run(output).await {
        Ok(lines) => {
            info!("Processed {} decoder lines ({:?})", lines, processor.state());
            process.wait().await
        }
        Err(e) => {
            error!(
                "Stream {:?} after {} lines, stopping decoder",
                processor.state(),
                processor.lines_processed()
            );
            process.kill().await;
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match ExporterConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let table = LocationTable::new(config.matchers.clone());
    info!(
        "Starting rtl_433 exporter at {} (id matchers: {}, channel matchers: {})",
        format_datetime(&OffsetDateTime::now_utc()),
        table.id_matcher_count(),
        table.channel_matcher_count()
    );

    if let Err(e) = install_exporter(config.listen_addr) {
        error!("{}", e);
        return Err(e.into());
    }

    // Run the pipeline or wait for shutdown signal
    tokio::select! {
        result = run_pipeline(&config, &table) => {
            match result {
                Ok(()) => info!("Decoder stream finished"),
                Err(e) => {
                    error!("Fatal error: {}", e);
                    return Err(e.into());
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
