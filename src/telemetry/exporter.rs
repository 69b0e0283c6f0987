use log::{error, info};
use metrics::{describe_counter, describe_gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::net::SocketAddr;

use crate::error::{ExporterError, Result};
use crate::telemetry::{BATTERY, HUMIDITY, PACKETS_RECEIVED, TEMPERATURE, TIMESTAMP};

/// Install the global Prometheus recorder and start its HTTP listener
///
/// Must be called from within the tokio runtime, the listener is spawned onto it.
pub fn install_exporter(listen_addr: SocketAddr) -> Result<PrometheusHandle> {
    let (recorder, listener) = PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .build()
        .map_err(|e| ExporterError::Metrics(format!("failed to build exporter: {}", e)))?;

    let handle = install_recorder(recorder)?;

    tokio::spawn(async move {
        // ExporterError implements neither Debug nor Display in this version
        if let Err(_e) = listener.await {
            error!("Prometheus HTTP listener stopped");
        }
    });

    info!("Prometheus exporter listening on http://{}/metrics", listen_addr);
    Ok(handle)
}

/// Make `recorder` the process-wide target of the `metrics` macros
fn install_recorder(recorder: PrometheusRecorder) -> Result<PrometheusHandle> {
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|_| {
        ExporterError::Metrics("a global metrics recorder is already installed".into())
    })?;

    describe_metrics();
    Ok(handle)
}

/// Register help text for every series the exporter writes
pub fn describe_metrics() {
    describe_counter!(
        PACKETS_RECEIVED,
        Unit::Count,
        "Packets (temperature messages) received."
    );
    describe_gauge!(TEMPERATURE, "Temperature in Celsius");
    describe_gauge!(HUMIDITY, "Relative Humidity (0-1.0)");
    describe_gauge!(
        TIMESTAMP,
        Unit::Seconds,
        "Timestamp we received the message (Unix seconds)"
    );
    describe_gauge!(BATTERY, "Battery high (1) or low (0).");
}
