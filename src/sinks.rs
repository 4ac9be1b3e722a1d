//! Sink adapters. Formatting (`Formatter`) and transport (`Transport`) are kept
//! independently extensible, the way the reference workspace separates response
//! serialization from the transport that carries it; a `Sink` pairs exactly one of each.

use crate::composite::AggregatedStats;
use crate::errors::{Result, SensorPipelineError};
use crate::record::SensorRecord;
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

/// What a single `Display` call carries downstream.
pub enum DisplayItem<'a> {
    Record(&'a SensorRecord),
    Stats { label: &'a str, stats: &'a AggregatedStats },
    Alert(&'a str),
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonPayload<'a> {
    Record(&'a SensorRecord),
    Stats { label: &'a str, stats: &'a AggregatedStats },
    Alert { message: &'a str },
}

pub trait Formatter: Send + Sync {
    fn format(&self, item: &DisplayItem) -> String;
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, item: &DisplayItem) -> String {
        match item {
            DisplayItem::Record(r) => format!(
                "[{}] serial={} type={} temp={:.2} hum={:.2} bat={:.2}",
                r.timestamp.format("%H:%M:%S"),
                r.serial,
                r.sensor_type,
                r.temperature,
                r.humidity,
                r.battery_level
            ),
            DisplayItem::Stats { label, stats } => format!(
                "{}: points={} temp={:.2} hum={:.2} bat={:.2}",
                label, stats.data_point_count, stats.temperature, stats.humidity, stats.battery_level
            ),
            DisplayItem::Alert(message) => message.to_string(),
        }
    }
}

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, item: &DisplayItem) -> String {
        let payload = match item {
            DisplayItem::Record(r) => JsonPayload::Record(r),
            DisplayItem::Stats { label, stats } => JsonPayload::Stats { label, stats },
            DisplayItem::Alert(message) => JsonPayload::Alert { message },
        };
        serde_json::to_string(&payload).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

pub trait Transport: Send + Sync {
    fn write_line(&self, line: &str) -> Result<()>;
    fn flush(&self) -> Result<()>;
}

pub struct ConsoleTransport;

impl Transport for ConsoleTransport {
    fn write_line(&self, line: &str) -> Result<()> {
        println!("{}", line);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        std::io::stdout().flush().map_err(SensorPipelineError::Io)
    }
}

pub struct FileTransport {
    file: Mutex<File>,
}

impl FileTransport {
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        writeln!(file, "Sensor Monitoring Log - {}", Utc::now().to_rfc3339())?;
        Ok(FileTransport { file: Mutex::new(file) })
    }
}

impl Transport for FileTransport {
    fn write_line(&self, line: &str) -> Result<()> {
        let mut file = self.file.lock().expect("file transport mutex poisoned");
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut file = self.file.lock().expect("file transport mutex poisoned");
        file.flush().map_err(SensorPipelineError::Io)
    }
}

/// Pairs one formatter with one transport. Write failures are logged and do not stop
/// the remaining sinks from receiving the same item.
pub struct Sink {
    formatter: Box<dyn Formatter>,
    transport: Box<dyn Transport>,
}

impl Sink {
    pub fn new(formatter: Box<dyn Formatter>, transport: Box<dyn Transport>) -> Self {
        Sink { formatter, transport }
    }

    pub fn display(&self, item: &DisplayItem) {
        let line = self.formatter.format(item);
        if let Err(e) = self.transport.write_line(&line) {
            tracing::error!(error = %e, "sink write failed");
        }
        if let Err(e) = self.transport.flush() {
            tracing::error!(error = %e, "sink flush failed");
        }
    }
}

#[derive(Default)]
pub struct SinkRegistry {
    sinks: Vec<Sink>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        SinkRegistry::default()
    }

    pub fn add(&mut self, sink: Sink) {
        self.sinks.push(sink);
    }

    pub fn display(&self, item: DisplayItem) {
        for sink in &self.sinks {
            sink.display(&item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SensorType;
    use tempfile::NamedTempFile;

    #[test]
    fn text_formatter_renders_a_record() {
        let formatter = TextFormatter;
        let record = SensorRecord { serial: "111".into(), sensor_type: SensorType::Temp, temperature: 24.5, ..Default::default() };
        let line = formatter.format(&DisplayItem::Record(&record));
        assert!(line.contains("serial=111"));
        assert!(line.contains("temp=24.50"));
    }

    #[test]
    fn json_formatter_tags_the_payload_kind() {
        let formatter = JsonFormatter;
        let line = formatter.format(&DisplayItem::Alert("test alert"));
        assert!(line.contains("\"kind\":\"alert\""));
        assert!(line.contains("test alert"));
    }

    #[test]
    fn file_transport_writes_header_and_truncates() {
        let tmp = NamedTempFile::new().unwrap();
        let transport = FileTransport::create(tmp.path()).unwrap();
        transport.write_line("hello").unwrap();
        transport.flush().unwrap();

        let contents = std::fs::read_to_string(tmp.path()).unwrap();
        assert!(contents.starts_with("Sensor Monitoring Log - "));
        assert!(contents.contains("hello"));
    }

    #[test]
    fn sink_registry_fans_out_to_every_sink() {
        let tmp = NamedTempFile::new().unwrap();
        let mut registry = SinkRegistry::new();
        registry.add(Sink::new(Box::new(TextFormatter), Box::new(ConsoleTransport)));
        registry.add(Sink::new(Box::new(JsonFormatter), Box::new(FileTransport::create(tmp.path()).unwrap())));

        registry.display(DisplayItem::Alert("both sinks see this"));
        let contents = std::fs::read_to_string(tmp.path()).unwrap();
        assert!(contents.contains("both sinks see this"));
    }
}
