/// Time helpers for metric timestamps and log output
use time::macros::format_description;
use time::OffsetDateTime;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Current wall-clock time as fractional Unix seconds
pub fn unix_timestamp_now() -> f64 {
    unix_seconds(OffsetDateTime::now_utc())
}

fn unix_seconds(dt: OffsetDateTime) -> f64 {
    dt.unix_timestamp_nanos() as f64 / 1_000_000_000.0
}
