//! Raw flow records as supplied by capture sources and the request API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw schema a record was produced under.
///
/// The schema only selects which alias list is consulted for each field;
/// the canonical feature table is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RawSchema {
    /// Named-field map from the request API (`Flow_Bytes_s`, ...)
    #[default]
    Api,
    /// Suricata EVE JSON `flow` event
    Eve,
    /// NFStream flow object exported as JSON
    NfStream,
}

impl RawSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawSchema::Api => "api",
            RawSchema::Eve => "eve",
            RawSchema::NfStream => "nfstream",
        }
    }
}

impl fmt::Display for RawSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RawSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(RawSchema::Api),
            "eve" | "suricata" => Ok(RawSchema::Eve),
            "nfstream" => Ok(RawSchema::NfStream),
            other => Err(format!("unknown raw schema: {}", other)),
        }
    }
}

/// One raw flow, consumed once by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRecord {
    pub schema: RawSchema,
    pub fields: Map<String, Value>,
}

impl FlowRecord {
    pub fn new(schema: RawSchema, fields: Map<String, Value>) -> Self {
        Self { schema, fields }
    }

    /// Build from any JSON value. Non-object values yield an empty record,
    /// which the normalizer rejects for missing endpoints.
    pub fn from_json(schema: RawSchema, value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::new(schema, fields),
            _ => Self::new(schema, Map::new()),
        }
    }

    /// Look up a field by dotted path (`flow.bytes_toserver`).
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.fields.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        if current.is_null() { None } else { Some(current) }
    }

    /// First alias that resolves to a number (numeric strings accepted).
    pub fn number(&self, aliases: &[&str]) -> Option<f64> {
        aliases.iter()
            .filter_map(|alias| self.lookup(alias))
            .find_map(as_number)
    }

    /// First alias that resolves to a non-empty string (numbers are rendered).
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        aliases.iter()
            .filter_map(|alias| self.lookup(alias))
            .find_map(|value| match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Identifying summary of a flow, carried on every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    /// Application protocol when known, otherwise transport protocol
    pub proto: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_proto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<u64>,
    /// Timestamp reported by the capture source, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<String>,
}

impl FlowSummary {
    pub fn source(&self) -> String {
        format!("{}:{}", self.src_ip, self.src_port)
    }

    pub fn destination(&self) -> String {
        format!("{}:{}", self.dst_ip, self.dst_port)
    }
}
