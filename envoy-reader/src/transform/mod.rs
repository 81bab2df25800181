use chrono::{DateTime, Local};
use envoy_client::{InverterRecord, SystemReading};

use crate::pipeline::FetchError;

/// Pick the production summary written by this cycle.
///
/// The gateway may report several inverter summaries; the first one is used.
/// An empty list means the device answered without usable system data.
pub fn select_system_reading(readings: Vec<SystemReading>) -> Result<SystemReading, FetchError> {
    readings
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::MissingData("no system data found".to_string()))
}

/// The system reading, if its timestamp makes it writable.
pub fn valid_system(reading: &SystemReading) -> Option<&SystemReading> {
    reading.is_valid().then_some(reading)
}

pub fn valid_inverters(records: &[InverterRecord]) -> impl Iterator<Item = &InverterRecord> {
    records.iter().filter(|r| r.is_valid())
}

/// Whether a sink that skips invalid data has anything to write at all.
pub fn has_writable_data(system: &SystemReading, records: &[InverterRecord]) -> bool {
    system.is_valid() || valid_inverters(records).next().is_some()
}

pub fn total_watts(records: &[InverterRecord]) -> i64 {
    records.iter().map(|r| r.production.last_report_watts).sum()
}

fn local_time(unix_seconds: i64) -> String {
    DateTime::from_timestamp(unix_seconds, 0)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| unix_seconds.to_string())
}

pub fn log_reading(system: &SystemReading, records: &[InverterRecord]) {
    tracing::info!(
        active_count = system.active_count,
        reading_time = %local_time(system.reading_time),
        wh_lifetime = system.wh_lifetime,
        w_now = system.w_now,
        "system production"
    );

    for record in valid_inverters(records) {
        let status = record
            .device
            .as_ref()
            .map(|d| format!("producing={} communicating={}", d.producing, d.communicating))
            .unwrap_or_else(|| "not in inventory".to_string());
        tracing::debug!(
            serial = %record.serial_number(),
            report_time = %local_time(record.production.last_report_date),
            watts = record.production.last_report_watts,
            %status,
            "inverter production"
        );
    }

    tracing::info!(inverters = records.len(), total_watts = total_watts(records), "inverter production");
}
