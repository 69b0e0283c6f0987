/// Decoding of rtl_433 JSON lines into canonical observations
use serde::Deserialize;
use serde_json::{Number, Value};

use crate::error::DecodeError;
use crate::models::{BatteryState, Observation};

/// One line of `rtl_433 -F json` output as received
///
/// Firmware variants disagree on field types, so the ambiguous fields are kept
/// as raw JSON values and resolved afterwards.
#[derive(Debug, Deserialize)]
struct RawRecord {
    time: Option<String>,
    model: Option<String>,
    // Sensors without an id report as id 0
    #[serde(default = "missing_id")]
    id: Value,
    // A missing channel deserializes to Null and fails resolution
    #[serde(default)]
    channel: Value,
    // "OK" / "LOW" / "", case-insensitive
    battery: Option<Value>,
    // 1 or 0
    battery_ok: Option<Value>,
    // 1 or 0, inverted
    battery_low: Option<Value>,
    #[serde(rename = "temperature_C")]
    temperature: Option<f64>,
    // 0-100
    humidity: Option<f64>,
}

fn missing_id() -> Value {
    Value::from(0)
}

/// Decode a single decoder output line into an [`Observation`]
///
/// `id` and `channel` may arrive as JSON strings or numbers; numbers are
/// rendered as plain integers (`94.0` becomes `"94"`). An absent `id` becomes
/// `"0"`. Any other JSON type for those fields (including `null`), an absent
/// `channel`, or a missing/empty `model` is a [`DecodeError::UnresolvableField`].
///
/// Temperature and humidity are passed through without range checks; humidity
/// is scaled from percent to a 0-1 fraction.
pub fn decode_observation(line: &str) -> Result<Observation, DecodeError> {
    let raw: RawRecord = serde_json::from_str(line)?;

    let model = match raw.model.as_deref() {
        Some(model) if !model.is_empty() => model.to_string(),
        other => {
            return Err(DecodeError::UnresolvableField {
                field: "model",
                value: format!("{:?}", other),
            })
        }
    };

    let id = resolve_label_field("id", &raw.id)?;
    let channel = resolve_label_field("channel", &raw.channel)?;
    let battery = resolve_battery(&raw);

    Ok(Observation {
        time: raw.time.unwrap_or_default(),
        model,
        id,
        channel,
        battery,
        temperature: raw.temperature,
        humidity_fraction: raw.humidity.map(|percent| percent / 100.0),
    })
}

/// Resolve a string-or-number field to its canonical string form
fn resolve_label_field(field: &'static str, value: &Value) -> Result<String, DecodeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(integer_string(n)),
        other => Err(DecodeError::UnresolvableField {
            field,
            value: other.to_string(),
        }),
    }
}

/// Render a JSON number as an integer with no fractional part or exponent
fn integer_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }

    let whole = n.as_f64().unwrap_or_default().trunc();
    if whole.abs() < i64::MAX as f64 {
        // `as` also folds -0.0 into 0
        (whole as i64).to_string()
    } else {
        // f64 Display never switches to scientific notation
        format!("{}", whole)
    }
}

/// Resolve battery state, first match wins:
/// 1. `battery` string: "OK" -> High, "LOW" -> Low, any other non-empty -> Unknown
/// 2. `battery_ok` flag: 1 -> High, 0 -> Low
/// 3. `battery_low` flag: 1 -> Low, 0 -> High
/// 4. Unknown
fn resolve_battery(raw: &RawRecord) -> BatteryState {
    if let Some(Value::String(status)) = &raw.battery {
        if !status.is_empty() {
            return if status.eq_ignore_ascii_case("OK") {
                BatteryState::High
            } else if status.eq_ignore_ascii_case("LOW") {
                BatteryState::Low
            } else {
                BatteryState::Unknown
            };
        }
    }

    match raw.battery_ok.as_ref().and_then(flag_value) {
        Some(true) => return BatteryState::High,
        Some(false) => return BatteryState::Low,
        None => {}
    }

    match raw.battery_low.as_ref().and_then(flag_value) {
        Some(true) => BatteryState::Low,
        Some(false) => BatteryState::High,
        None => BatteryState::Unknown,
    }
}

/// Interpret a boolean-like field. Only exact 0/1 (or JSON booleans) count.
fn flag_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 1.0 => Some(true),
            Some(x) if x == 0.0 => Some(false),
            _ => None,
        },
        _ => None,
    }
}
