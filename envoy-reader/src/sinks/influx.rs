use std::time::Duration;

use envoy_client::{InverterRecord, SystemReading};

use crate::pipeline::{Reading, Sink, WriteError, WriteOutcome};
use crate::transform::{valid_inverters, valid_system};

const SYSTEM_MEASUREMENT: &str = "inverters";
const INVERTER_MEASUREMENT: &str = "inverter";

/// Escape measurement/tag keys/tag values/field keys for line protocol.
///
/// Commas, spaces and equals signs must be escaped with a backslash.
fn escape_ident(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            ',' | ' ' | '=' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
}

/// Empty tag values are not allowed by line protocol; the tag is left out.
fn push_tag(out: &mut String, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push(',');
    escape_ident(key, out);
    out.push('=');
    escape_ident(value, out);
}

fn push_field_i64(out: &mut String, first: &mut bool, key: &str, value: i64) {
    if *first {
        *first = false;
    } else {
        out.push(',');
    }

    escape_ident(key, out);
    out.push('=');
    out.push_str(&value.to_string());
    out.push('i');
}

pub trait LineEncode {
    /// Timestamps are unix seconds; the write uses `precision=s`.
    fn write_line(&self, out: &mut String);
}

impl LineEncode for SystemReading {
    fn write_line(&self, out: &mut String) {
        out.push_str(SYSTEM_MEASUREMENT);

        out.push(' ');
        let mut first = true;
        push_field_i64(out, &mut first, "activecount", self.active_count);
        push_field_i64(out, &mut first, "whlifetime", self.wh_lifetime);
        push_field_i64(out, &mut first, "WNow", self.w_now);

        out.push(' ');
        out.push_str(&self.reading_time.to_string());
    }
}

impl LineEncode for InverterRecord {
    fn write_line(&self, out: &mut String) {
        out.push_str(INVERTER_MEASUREMENT);
        push_tag(out, "serialnumber", self.serial_number());

        out.push(' ');
        let mut first = true;
        push_field_i64(out, &mut first, "lastreportwatts", self.production.last_report_watts);
        push_field_i64(out, &mut first, "maxreportwatts", self.production.max_report_watts);

        out.push(' ');
        out.push_str(&self.production.last_report_date.to_string());
    }
}

/// Line protocol batch of the valid parts of `reading`, or `None` when
/// nothing in it is valid.
pub fn encode_batch(reading: &Reading) -> Option<String> {
    // Heuristic capacity: ~80 bytes per line.
    let mut s = String::with_capacity((reading.inverters.len() + 1).saturating_mul(80));
    let mut lines = 0usize;

    if let Some(system) = valid_system(&reading.system) {
        system.write_line(&mut s);
        s.push('\n');
        lines += 1;
    }

    for record in valid_inverters(&reading.inverters) {
        record.write_line(&mut s);
        s.push('\n');
        lines += 1;
    }

    (lines > 0).then_some(s)
}

/// Transport for one batched point write.
#[async_trait::async_trait]
pub trait LineWriter: Send + Sync {
    async fn write_lines(&self, body: String) -> Result<(), WriteError>;
}

/// InfluxDB 1.x `/write` endpoint.
pub struct InfluxHttpWriter {
    url: String,
    database: String,
    timeout: Duration,
}

impl InfluxHttpWriter {
    pub fn new(url: &str, database: &str, timeout: Duration) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            database: database.to_string(),
            timeout,
        }
    }
}

/// The backend reports failures as `{"error": "..."}`; fall back to the raw body.
pub fn backend_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait::async_trait]
impl LineWriter for InfluxHttpWriter {
    async fn write_lines(&self, body: String) -> Result<(), WriteError> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let response = client
            .post(format!("{}/write", self.url))
            .query(&[("db", self.database.as_str()), ("precision", "s")])
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        Err(WriteError::Backend(backend_error_message(&body)))
    }
}

pub struct InfluxSink<W = InfluxHttpWriter> {
    description: String,
    writer: W,
}

impl InfluxSink<InfluxHttpWriter> {
    pub fn new(url: &str, database: &str, timeout: Duration) -> Self {
        Self {
            description: format!("influxdb {database} @ {url}"),
            writer: InfluxHttpWriter::new(url, database, timeout),
        }
    }
}

impl<W: LineWriter> InfluxSink<W> {
    pub fn with_writer(description: &str, writer: W) -> Self {
        Self {
            description: description.to_string(),
            writer,
        }
    }
}

#[async_trait::async_trait]
impl<W: LineWriter> Sink for InfluxSink<W> {
    fn name(&self) -> &str {
        "influxdb"
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn write(&self, reading: &Reading) -> Result<WriteOutcome, WriteError> {
        let Some(batch) = encode_batch(reading) else {
            return Ok(WriteOutcome::NotNeeded);
        };

        let lines = batch.lines().count();
        self.writer.write_lines(batch).await?;
        tracing::debug!(points = lines, "influx batch written");

        Ok(WriteOutcome::Written)
    }
}
