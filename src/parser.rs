//! Parser set. Format selection is by exclusive prefix; the actual key/value
//! extraction is format-agnostic and shared by every parser, matching the reference
//! workspace's pattern of registering trait-object line handlers in a `Vec` and trying
//! each in registration order until one claims the input.

use crate::record::SensorRecord;
use std::collections::HashMap;

pub trait LineParser: Send + Sync {
    fn can_parse(&self, raw: &str) -> bool;
    fn parse(&self, raw: &str) -> SensorRecord;
    fn name(&self) -> &'static str;
}

pub struct StandardParser;

impl LineParser for StandardParser {
    fn can_parse(&self, raw: &str) -> bool {
        raw.trim_start().to_ascii_lowercase().starts_with("serial:")
    }

    fn parse(&self, raw: &str) -> SensorRecord {
        build_record(raw)
    }

    fn name(&self) -> &'static str {
        "StandardParser"
    }
}

pub struct ManufacturerFirstParser;

impl LineParser for ManufacturerFirstParser {
    fn can_parse(&self, raw: &str) -> bool {
        let lower = raw.trim_start().to_ascii_lowercase();
        lower.starts_with("manufac:") || lower.starts_with("manu:")
    }

    fn parse(&self, raw: &str) -> SensorRecord {
        build_record(raw)
    }

    fn name(&self) -> &'static str {
        "ManufacturerFirstParser"
    }
}

/// Returns the default parser chain in registration order, standard format first so a
/// line starting with `serial:` is never mistakenly tried against the manufacturer parser.
pub fn default_parsers() -> Vec<Box<dyn LineParser>> {
    vec![Box::new(StandardParser), Box::new(ManufacturerFirstParser)]
}

fn build_record(raw: &str) -> SensorRecord {
    let fields = tokenize(raw);
    let mut record = SensorRecord::default();

    for (key, value) in fields {
        match key.as_str() {
            "serial" | "serialnumber" => {
                if record.serial.is_empty() {
                    record.serial = value;
                }
            }
            "temp" => record.temperature = parse_f64(&value),
            "hum" => record.humidity = parse_f64(&value),
            "bat" | "batlevel" | "batterylevel" => record.battery_level = parse_f64(&value),
            "batmax" => record.battery_max = parse_f64(&value),
            "batmin" => record.battery_min = parse_f64(&value),
            "state" => {
                if record.state.is_empty() {
                    record.state = value;
                }
            }
            "manu" | "manufac" | "manufacturer" => {
                if record.manufacturer.is_empty() {
                    record.manufacturer = value;
                }
            }
            "type" => record.sensor_type = value.as_str().into(),
            "error" => {
                if record.error.is_empty() {
                    record.error = value;
                }
            }
            "v" | "v2" | "v3" => record.voltage = parse_f64(&value),
            _ => { /* unknown key: ignored */ }
        }
    }

    record.normalize()
}

fn parse_f64(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

/// Scans `raw` for `<alpha_underscore+>:<value>` tokens. A token's value extends up to the
/// next key prefix or end-of-string; first occurrence of a duplicate key wins (handled by the
/// caller, which only fills still-empty fields). Keys are returned case-folded.
fn tokenize(raw: &str) -> Vec<(String, String)> {
    let starts = key_starts(raw);
    let mut tokens: HashMap<&str, ()> = HashMap::new();
    let mut out = Vec::with_capacity(starts.len());

    for (idx, &(key_start, colon_idx)) in starts.iter().enumerate() {
        let key = &raw[key_start..colon_idx];
        let value_end = starts.get(idx + 1).map(|&(s, _)| s).unwrap_or(raw.len());
        let value = raw[colon_idx + 1..value_end].trim().to_string();
        out.push((key.to_ascii_lowercase(), value));
        let _ = tokens.insert(key, ());
    }
    out
}

/// Returns (key_start, colon_index) for every maximal run of ASCII alphabetic/underscore
/// characters that is immediately followed by a `:`, scanned left to right and non-overlapping.
fn key_starts(raw: &str) -> Vec<(usize, usize)> {
    let bytes = raw.as_bytes();
    let mut result = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if is_key_byte(bytes[i]) {
            let start = i;
            let mut j = i;
            while j < bytes.len() && is_key_byte(bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b':' {
                result.push((start, j));
                i = j + 1;
            } else {
                i = j.max(start + 1);
            }
        } else {
            i += 1;
        }
    }
    result
}

#[inline]
fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}
