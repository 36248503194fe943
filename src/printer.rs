//! Output formatting for decoded events
//!
//! Text output uses the event summary; JSON output writes one object per
//! line.

use std::io::{self, Write};

use clap::ValueEnum;
use hid_event::{HexDump, HidError, HidEvent, Notification, RawEnvelope, WriterSink};
use serde::{Deserialize, Serialize};

use crate::config::OutputConfig;
use crate::replay::ReplayRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output (one object per line)
    Json,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    index: usize,
    notification: &'a Notification,
    event: &'a HidEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a [String]>,
}

#[derive(Serialize)]
struct JsonSlice {
    index: usize,
    start: usize,
    end: usize,
    data: String,
}

pub struct Printer {
    format: OutputFormat,
    show_hex: bool,
    show_trace: bool,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            show_hex: false,
            show_trace: false,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.format)
            .with_hex(config.hex)
            .with_trace(config.trace)
    }

    pub fn with_hex(mut self, hex: bool) -> Self {
        self.show_hex = hex;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.show_trace = trace;
        self
    }

    /// Print one replayed notification
    pub fn print_record(&self, out: &mut impl Write, record: &ReplayRecord) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(
                    out,
                    "#{} message 0x{:04X} wparam 0x{:X}",
                    record.index, record.notification.message, record.notification.wparam
                )?;
                if self.show_hex {
                    match &record.image {
                        Some(image) => writeln!(out, "  raw: {}", HexDump(image))?,
                        None => writeln!(out, "  raw: <none>")?,
                    }
                }
                record
                    .event
                    .trace_to(&WriterSink::with_prefix(&mut *out, "  "));
                if self.show_trace {
                    for line in &record.trace {
                        writeln!(out, "  | {line}")?;
                    }
                }
                Ok(())
            }
            OutputFormat::Json => {
                let json = JsonRecord {
                    index: record.index,
                    notification: &record.notification,
                    event: &record.event,
                    raw: self
                        .show_hex
                        .then(|| record.image.as_deref().map(|i| HexDump(i).to_string()))
                        .flatten(),
                    trace: self.show_trace.then_some(record.trace.as_slice()),
                };
                serde_json::to_writer(&mut *out, &json)?;
                writeln!(out)
            }
        }
    }

    /// Print the totals of a replay run (text output only)
    pub fn print_summary(&self, out: &mut impl Write, records: &[ReplayRecord]) -> io::Result<()> {
        if self.format != OutputFormat::Text {
            return Ok(());
        }
        let valid = records.iter().filter(|r| r.event.is_valid()).count();
        let usages: usize = records.iter().map(|r| r.event.usages().len()).sum();
        writeln!(
            out,
            "{} notification(s), {} valid, {} usage(s)",
            records.len(),
            valid,
            usages
        )
    }

    /// Print the report slice table of one envelope without resolving usages
    pub fn print_walk(&self, out: &mut impl Write, envelope: &RawEnvelope<'_>) -> io::Result<()> {
        let walker = envelope.reports();
        let mut slices = Vec::new();
        let mut failure: Option<HidError> = None;
        for (index, report) in walker.clone().enumerate() {
            match report {
                Ok(report) => {
                    let (start, end) = walker.span(index).unwrap_or((0, 0));
                    slices.push((index, start, end, report));
                }
                Err(err) => failure = Some(err),
            }
        }

        match self.format {
            OutputFormat::Text => {
                writeln!(
                    out,
                    "device {} type {:?} report size {} count {} ({} bytes)",
                    envelope.device(),
                    envelope.device_type(),
                    envelope.report_size(),
                    envelope.report_count(),
                    envelope.buffer().len()
                )?;
                for (index, start, end, report) in &slices {
                    writeln!(out, "  [{index}] {start:>4}..{end:<4} {}", HexDump(report))?;
                }
                if let Some(err) = failure {
                    writeln!(out, "  {err}")?;
                }
                Ok(())
            }
            OutputFormat::Json => {
                let rows: Vec<JsonSlice> = slices
                    .iter()
                    .map(|(index, start, end, report)| JsonSlice {
                        index: *index,
                        start: *start,
                        end: *end,
                        data: HexDump(report).to_string(),
                    })
                    .collect();
                let json = serde_json::json!({
                    "device": envelope.device(),
                    "device_type": envelope.device_type().tag(),
                    "report_size": envelope.report_size(),
                    "report_count": envelope.report_count(),
                    "reports": rows,
                    "error": failure.map(|e| e.to_string()),
                });
                serde_json::to_writer(&mut *out, &json)?;
                writeln!(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hid_event::{encode_hid_input, DeviceHandle, EnvelopeLayout};

    fn walk_output(printer: &Printer, payload: &[u8], count: u32) -> String {
        let layout = EnvelopeLayout::default();
        let image = encode_hid_input(layout, DeviceHandle(0x10), 0, 3, count, payload).unwrap();
        let envelope = RawEnvelope::parse(&image, layout).unwrap();
        let mut out = Vec::new();
        printer.print_walk(&mut out, &envelope).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_walk_table_text() {
        let text = walk_output(
            &Printer::new(OutputFormat::Text),
            &[0x01, 0xE9, 0x00, 0x01, 0xEA, 0x00],
            2,
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("device 0x10 type Generic report size 3 count 2"));
        assert!(lines[1].contains("32..35"));
        assert!(lines[1].ends_with("01E900"));
        assert!(lines[2].contains("35..38"));
    }

    #[test]
    fn test_walk_table_reports_out_of_bounds() {
        let text = walk_output(&Printer::new(OutputFormat::Text), &[0x01, 0xE9, 0x00], 2);
        assert!(text.lines().last().unwrap().contains("Report 1 out of bounds"));
    }

    #[test]
    fn test_walk_json() {
        let text = walk_output(&Printer::new(OutputFormat::Json), &[0x01, 0xE9, 0x00], 2);
        let json: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(json["device"], 0x10);
        assert_eq!(json["reports"][0]["start"], 32);
        assert_eq!(json["reports"][0]["data"], "01E900");
        assert!(json["error"].is_string());
    }

    #[test]
    fn test_output_format_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: OutputFormat,
        }
        let w: Wrapper = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(w.format, OutputFormat::Json);
    }
}
