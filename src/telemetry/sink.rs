/// Metric updates for resolved observations
use metrics::{counter, gauge, Label};

use crate::telemetry::{BATTERY, HUMIDITY, PACKETS_RECEIVED, TEMPERATURE, TIMESTAMP};
use crate::models::LabelTuple;
use crate::utils::unix_timestamp_now;

/// Destination for per-observation metric updates
///
/// Implementations must tolerate concurrent reads of their state (the HTTP
/// scrape path) while the stream writes to them.
pub trait MetricSink {
    fn increment_packet_count(&self, labels: &LabelTuple);
    fn set_timestamp_to_now(&self, labels: &LabelTuple);
    fn set_temperature(&self, labels: &LabelTuple, celsius: f64);
    fn set_humidity(&self, labels: &LabelTuple, fraction: f64);
    /// 1.0 for high, 0.0 for low
    fn set_battery(&self, labels: &LabelTuple, value: f64);
}

/// Sink writing to whatever `metrics` recorder is installed
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSink;

fn series_labels(labels: &LabelTuple) -> Vec<Label> {
    vec![
        Label::new("model", labels.model.clone()),
        Label::new("id", labels.id.clone()),
        Label::new("channel", labels.channel.clone()),
        Label::new("location", labels.location.clone()),
    ]
}

impl MetricSink for PrometheusSink {
    fn increment_packet_count(&self, labels: &LabelTuple) {
        counter!(PACKETS_RECEIVED, series_labels(labels)).increment(1);
    }

    fn set_timestamp_to_now(&self, labels: &LabelTuple) {
        gauge!(TIMESTAMP, series_labels(labels)).set(unix_timestamp_now());
    }

    fn set_temperature(&self, labels: &LabelTuple, celsius: f64) {
        gauge!(TEMPERATURE, series_labels(labels)).set(celsius);
    }

    fn set_humidity(&self, labels: &LabelTuple, fraction: f64) {
        gauge!(HUMIDITY, series_labels(labels)).set(fraction);
    }

    fn set_battery(&self, labels: &LabelTuple, value: f64) {
        gauge!(BATTERY, series_labels(labels)).set(value);
    }
}
