//! Feature Normalizer
//!
//! Maps a raw `FlowRecord` of any supported schema onto the canonical
//! 36-feature vector. Resolution per feature:
//!
//! 1. a field carrying the feature directly (API schema only)
//! 2. derivation from alias-resolved base counters
//! 3. 0.0
//!
//! Rates use a duration floored to `MIN_DURATION_SECS`; ratios with a zero
//! denominator are 0.0. The resulting vector is sanitized (no NaN/inf).

use chrono::DateTime;

use crate::constants::{DEFAULT_FWD_HEADER_LENGTH, MIN_DURATION_SECS};
use super::aliases::{self, Counter};
use super::layout::{FEATURE_COUNT, FEATURE_LAYOUT};
use super::record::{FlowRecord, FlowSummary, RawSchema};
use super::vector::{FeatureVector, FeatureVectorBuilder};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    /// Minimum identifying fields are absent; the record is dropped
    #[error("invalid record ({schema}): missing {missing}")]
    InvalidRecord {
        schema: RawSchema,
        missing: &'static str,
    },
}

// ============================================================================
// BASE COUNTERS
// ============================================================================

/// Base quantities of one flow, in canonical units (bytes, packets, µs)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowCounters {
    pub duration_us: f64,
    pub bytes_fwd: f64,
    pub bytes_bwd: f64,
    pub packets_fwd: f64,
    pub packets_bwd: f64,
    pub dst_port: f64,
    pub header_length_fwd: Option<f64>,
    pub fwd_packet_length_std: f64,
    pub bwd_packet_length_std: f64,
    pub init_win_fwd: f64,
    pub init_win_bwd: f64,
    pub fwd_iat_std: f64,
    pub bwd_iat_std: f64,
    pub flow_iat_std: f64,
    pub flow_iat_max: Option<f64>,
    pub fwd_iat_mean: Option<f64>,
    pub bwd_iat_mean: Option<f64>,
    pub ack: f64,
    pub syn: f64,
    pub fin: f64,
    pub psh: f64,
    pub urg: f64,
}

impl FlowCounters {
    /// Resolve every counter through the alias table
    pub fn resolve(record: &FlowRecord) -> Self {
        let get = |counter: Counter| counter.resolve(record).unwrap_or(0.0);

        let mut counters = Self {
            duration_us: get(Counter::DurationUs),
            bytes_fwd: get(Counter::BytesFwd),
            bytes_bwd: get(Counter::BytesBwd),
            packets_fwd: get(Counter::PacketsFwd),
            packets_bwd: get(Counter::PacketsBwd),
            dst_port: aliases::DST_PORT.resolve_number(record).unwrap_or(0.0),
            header_length_fwd: Counter::HeaderLengthFwd.resolve(record),
            fwd_packet_length_std: get(Counter::FwdPacketLengthStd),
            bwd_packet_length_std: get(Counter::BwdPacketLengthStd),
            init_win_fwd: get(Counter::InitWinFwd),
            init_win_bwd: get(Counter::InitWinBwd),
            fwd_iat_std: get(Counter::FwdIatStd),
            bwd_iat_std: get(Counter::BwdIatStd),
            flow_iat_std: get(Counter::FlowIatStd),
            flow_iat_max: Counter::FlowIatMax.resolve(record),
            fwd_iat_mean: Counter::FwdIatMean.resolve(record),
            bwd_iat_mean: Counter::BwdIatMean.resolve(record),
            ack: get(Counter::AckCount),
            syn: get(Counter::SynCount),
            fin: get(Counter::FinCount),
            psh: get(Counter::PshCount),
            urg: get(Counter::UrgCount),
        };

        if record.schema == RawSchema::Eve {
            apply_eve_specifics(record, &mut counters);
        }

        counters
    }

    /// Duration in seconds, floored so rates never divide by zero
    pub fn duration_secs(&self) -> f64 {
        if self.duration_us > 0.0 {
            self.duration_us / 1_000_000.0
        } else {
            MIN_DURATION_SECS
        }
    }

    pub fn total_bytes(&self) -> f64 {
        self.bytes_fwd + self.bytes_bwd
    }

    pub fn total_packets(&self) -> f64 {
        self.packets_fwd + self.packets_bwd
    }
}

/// EVE reports duration as start/end timestamps and flags as hex strings
fn apply_eve_specifics(record: &FlowRecord, counters: &mut FlowCounters) {
    if let Some(duration_us) = eve_duration_us(record) {
        counters.duration_us = duration_us;
    }

    let flags = eve_flags(record, "tcp.tcp_flags_ts") | eve_flags(record, "tcp.tcp_flags_tc");
    let bit = |mask: u8| if flags & mask != 0 { 1.0 } else { 0.0 };
    counters.fin = bit(0x01);
    counters.syn = bit(0x02);
    counters.psh = bit(0x08);
    counters.ack = bit(0x10);
    counters.urg = bit(0x20);
}

fn eve_duration_us(record: &FlowRecord) -> Option<f64> {
    let start = record.text(&["flow.start"])?;
    let end = record.text(&["flow.end"])?;
    let start = parse_eve_timestamp(&start)?;
    let end = parse_eve_timestamp(&end)?;
    // Clock steps can put end before start; age is used instead
    let micros = (end - start).num_microseconds().filter(|m| *m >= 0)?;
    Some(micros as f64)
}

/// EVE timestamps look like `2024-01-01T10:00:00.123456+0000`
fn parse_eve_timestamp(value: &str) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
}

fn eve_flags(record: &FlowRecord, path: &str) -> u8 {
    record.text(&[path])
        .and_then(|raw| {
            let hex = raw.trim_start_matches("0x").trim_start_matches("0X");
            u8::from_str_radix(hex, 16).ok()
        })
        .unwrap_or(0)
}

/// Flow ids can exceed f64 precision, so they are read as integers
fn flow_id(record: &FlowRecord) -> Option<u64> {
    aliases::FLOW_ID.for_schema(record.schema)
        .iter()
        .filter_map(|path| record.lookup(path))
        .find_map(|value| value.as_u64().or_else(|| value.as_str()?.trim().parse().ok()))
}

// ============================================================================
// DERIVATION
// ============================================================================

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 { numerator / denominator } else { 0.0 }
}

/// Compute the canonical features from base counters
pub fn derive_features(c: &FlowCounters) -> [f64; FEATURE_COUNT] {
    let duration_s = c.duration_secs();
    let total_bytes = c.total_bytes();
    let total_packets = c.total_packets();
    let average_packet = ratio(total_bytes, total_packets);

    let flow_iat_mean = if total_packets > 1.0 { c.duration_us / total_packets } else { 0.0 };
    let fwd_iat_mean = c.fwd_iat_mean
        .unwrap_or(if c.packets_fwd > 1.0 { c.duration_us / c.packets_fwd } else { 0.0 });
    let bwd_iat_mean = c.bwd_iat_mean
        .unwrap_or(if c.packets_bwd > 1.0 { c.duration_us / c.packets_bwd } else { 0.0 });
    let flow_iat_max = c.flow_iat_max
        .filter(|v| *v != 0.0)
        .unwrap_or(c.duration_us);

    let mut builder = FeatureVectorBuilder::new();
    let named = [
        ("Fwd Header Length", c.header_length_fwd.unwrap_or(DEFAULT_FWD_HEADER_LENGTH)),
        ("Destination Port", c.dst_port),
        ("Flow Duration", c.duration_us),
        ("Total Length of Fwd Packets", c.bytes_fwd),
        ("Total Length of Bwd Packets", c.bytes_bwd),
        ("Fwd Packet Length Std", c.fwd_packet_length_std),
        ("Bwd Packet Length Std", c.bwd_packet_length_std),
        ("Flow Bytes/s", total_bytes / duration_s),
        ("Flow Packets/s", total_packets / duration_s),
        ("Total Fwd Packets", c.packets_fwd),
        ("Total Backward Packets", c.packets_bwd),
        ("Init_Win_bytes_forward", c.init_win_fwd),
        ("Init_Win_bytes_backward", c.init_win_bwd),
        ("Avg Fwd Segment Size", ratio(c.bytes_fwd, c.packets_fwd)),
        ("Avg Bwd Segment Size", ratio(c.bytes_bwd, c.packets_bwd)),
        ("Average Packet Size", average_packet),
        ("Packet Length Mean", average_packet),
        ("Fwd IAT Std", c.fwd_iat_std),
        ("Bwd IAT Std", c.bwd_iat_std),
        ("Flow IAT Mean", flow_iat_mean),
        ("Flow IAT Std", c.flow_iat_std),
        ("Flow IAT Max", flow_iat_max),
        ("Fwd IAT Mean", fwd_iat_mean),
        ("Bwd IAT Mean", bwd_iat_mean),
        ("ACK Flag Count", c.ack),
        ("SYN Flag Count", c.syn),
        ("FIN Flag Count", c.fin),
        ("PSH Flag Count", c.psh),
        ("URG Flag Count", c.urg),
        ("Subflow Fwd Packets", c.packets_fwd),
        ("Subflow Bwd Packets", c.packets_bwd),
        ("Subflow Fwd Bytes", c.bytes_fwd),
        ("Subflow Bwd Bytes", c.bytes_bwd),
        ("Fwd Packets/s", c.packets_fwd / duration_s),
        ("Bwd Packets/s", c.packets_bwd / duration_s),
        ("Down/Up Ratio", ratio(c.bytes_bwd, c.bytes_fwd)),
    ];
    for (name, value) in named {
        let known = builder.set(name, value);
        debug_assert!(known, "derived feature {} missing from layout", name);
    }

    *builder.build().as_array()
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Stateless mapper from raw records to canonical feature vectors
#[derive(Debug, Clone, Default)]
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one record into its flow summary and feature vector.
    pub fn normalize(&self, record: &FlowRecord) -> Result<(FlowSummary, FeatureVector), NormalizeError> {
        let summary = self.summarize(record)?;
        Ok((summary, self.features(record)))
    }

    /// Feature vector only. Does not check endpoints.
    pub fn features(&self, record: &FlowRecord) -> FeatureVector {
        let counters = FlowCounters::resolve(record);
        let mut values = derive_features(&counters);

        for (index, canonical) in FEATURE_LAYOUT.iter().enumerate() {
            if let Some(direct) = aliases::direct_feature(record, index, canonical) {
                values[index] = direct;
            }
        }

        FeatureVector::from_values(values)
    }

    /// Identifying fields of the flow. Both endpoint addresses are required.
    pub fn summarize(&self, record: &FlowRecord) -> Result<FlowSummary, NormalizeError> {
        let invalid = |missing| NormalizeError::InvalidRecord { schema: record.schema, missing };

        let src_ip = aliases::SRC_IP.resolve(record).ok_or_else(|| invalid("source address"))?;
        let dst_ip = aliases::DST_IP.resolve(record).ok_or_else(|| invalid("destination address"))?;

        let port = |value: Option<f64>| {
            value.filter(|v| v.is_finite() && *v >= 0.0 && *v <= u16::MAX as f64)
                .map(|v| v as u16)
                .unwrap_or(0)
        };
        let app_proto = aliases::APP_PROTOCOL.resolve(record);
        let transport = aliases::PROTOCOL.resolve(record).unwrap_or_else(|| "unknown".to_string());

        Ok(FlowSummary {
            src_ip,
            src_port: port(aliases::SRC_PORT.resolve_number(record)),
            dst_ip,
            dst_port: port(aliases::DST_PORT.resolve_number(record)),
            proto: app_proto.clone().unwrap_or(transport),
            app_proto,
            flow_id: flow_id(record),
            source_timestamp: aliases::TIMESTAMP.resolve(record),
        })
    }
}
