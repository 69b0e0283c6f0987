/// Battery status after resolving the decoder's alternative encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryState {
    Unknown,
    High,
    Low,
}

impl BatteryState {
    /// Gauge value for the battery metric, None when nothing should be written
    pub fn gauge_value(self) -> Option<f64> {
        match self {
            BatteryState::High => Some(1.0),
            BatteryState::Low => Some(0.0),
            BatteryState::Unknown => None,
        }
    }
}

/// A single canonical sensor reading
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    // Passed through as received, e.g. "2019-05-23 20:41:45"
    pub time: String,
    pub model: String,
    pub id: String,
    pub channel: String,
    pub battery: BatteryState,
    pub temperature: Option<f64>,
    pub humidity_fraction: Option<f64>,
}

/// Ordered label set every metric series is keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelTuple {
    pub model: String,
    pub id: String,
    pub channel: String,
    pub location: String,
}
