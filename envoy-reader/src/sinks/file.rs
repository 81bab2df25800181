use std::{fmt::Write as _, path::PathBuf};

use chrono::{Local, NaiveDate};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::pipeline::{Reading, Sink, WriteError, WriteOutcome};

const DATE_PLACEHOLDER: &str = "{date}";

/// Replace `{date}` in a configured path with `date` as `yyyyMMdd`.
pub fn expand_path(template: &str, date: NaiveDate) -> PathBuf {
    PathBuf::from(template.replace(DATE_PLACEHOLDER, &date.format("%Y%m%d").to_string()))
}

/// One line per entity, each prefixed with `stamp`. Every line ends in `\n`.
pub fn render_lines(reading: &Reading, stamp: &str) -> String {
    let mut out = String::new();
    let system = &reading.system;

    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "[{stamp}] systemProduction: ReadingTime: {}, ActiveCount: {}, WhLifeTime: {}, WNow: {}",
        system.reading_time, system.active_count, system.wh_lifetime, system.w_now
    );

    for record in &reading.inverters {
        let p = &record.production;
        let _ = writeln!(
            out,
            "[{stamp}] inverter: SerialNumber: {}, LastReportDate: {}, LastReportWatts: {}, MaxReportWatts: {}",
            p.serial_number, p.last_report_date, p.last_report_watts, p.max_report_watts
        );
    }

    out
}

/// Append-only text log of every reading, valid or not.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// The `{date}` placeholder is resolved once, here.
    pub fn new(template: &str) -> Self {
        Self {
            path: expand_path(template, Local::now().date_naive()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait::async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn write(&self, reading: &Reading) -> Result<WriteOutcome, WriteError> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let data = render_lines(reading, &stamp);

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        // A single write keeps the lines of one cycle together.
        file.write_all(data.as_bytes()).await?;
        file.flush().await?;

        Ok(WriteOutcome::Written)
    }
}
