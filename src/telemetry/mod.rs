pub mod exporter;
pub mod sink;

pub use exporter::install_exporter;
pub use sink::{MetricSink, PrometheusSink};

pub const PACKETS_RECEIVED: &str = "rtl_433_packets_received";
pub const TEMPERATURE: &str = "rtl_433_temperature_celsius";
pub const HUMIDITY: &str = "rtl_433_humidity";
pub const TIMESTAMP: &str = "rtl_433_timestamp_seconds";
pub const BATTERY: &str = "rtl_433_battery";
