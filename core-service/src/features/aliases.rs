//! Raw field alias table
//!
//! Every canonical feature and every base flow counter is resolved by name,
//! through the aliases listed here for the record's schema. Ingest sources
//! share this one table; adding a source means adding an alias column.

use super::layout::FEATURE_COUNT;
use super::record::{FlowRecord, RawSchema};

// ============================================================================
// ALIAS TYPES
// ============================================================================

/// A raw field path plus the factor converting it to the canonical unit
#[derive(Debug, Clone, Copy)]
pub struct Alias {
    pub path: &'static str,
    pub scale: f64,
}

const fn field(path: &'static str) -> Alias {
    Alias { path, scale: 1.0 }
}

const fn millis_as_micros(path: &'static str) -> Alias {
    Alias { path, scale: 1_000.0 }
}

const fn secs_as_micros(path: &'static str) -> Alias {
    Alias { path, scale: 1_000_000.0 }
}

/// Aliases of one numeric field, per schema
#[derive(Debug)]
pub struct FieldAliases {
    pub api: &'static [Alias],
    pub eve: &'static [Alias],
    pub nfstream: &'static [Alias],
}

impl FieldAliases {
    pub fn for_schema(&self, schema: RawSchema) -> &'static [Alias] {
        match schema {
            RawSchema::Api => self.api,
            RawSchema::Eve => self.eve,
            RawSchema::NfStream => self.nfstream,
        }
    }

    /// First alias present in the record, converted to canonical units
    pub fn resolve(&self, record: &FlowRecord) -> Option<f64> {
        self.for_schema(record.schema)
            .iter()
            .find_map(|alias| record.number(&[alias.path]).map(|v| v * alias.scale))
    }
}

/// Aliases of one text field, per schema
#[derive(Debug)]
pub struct TextAliases {
    pub api: &'static [&'static str],
    pub eve: &'static [&'static str],
    pub nfstream: &'static [&'static str],
}

impl TextAliases {
    pub fn for_schema(&self, schema: RawSchema) -> &'static [&'static str] {
        match schema {
            RawSchema::Api => self.api,
            RawSchema::Eve => self.eve,
            RawSchema::NfStream => self.nfstream,
        }
    }

    pub fn resolve(&self, record: &FlowRecord) -> Option<String> {
        record.text(self.for_schema(record.schema))
    }

    pub fn resolve_number(&self, record: &FlowRecord) -> Option<f64> {
        record.number(self.for_schema(record.schema))
    }
}

// ============================================================================
// ENDPOINT FIELDS
// ============================================================================

pub const SRC_IP: TextAliases = TextAliases {
    api: &["src_ip", "Source_IP", "Source IP"],
    eve: &["src_ip"],
    nfstream: &["src_ip"],
};

pub const DST_IP: TextAliases = TextAliases {
    api: &["dst_ip", "dest_ip", "Destination_IP", "Destination IP"],
    eve: &["dest_ip"],
    nfstream: &["dst_ip"],
};

pub const SRC_PORT: TextAliases = TextAliases {
    api: &["src_port", "Source_Port", "Source Port"],
    eve: &["src_port"],
    nfstream: &["src_port"],
};

pub const DST_PORT: TextAliases = TextAliases {
    api: &["dst_port", "dest_port", "Destination_Port", "Destination Port"],
    eve: &["dest_port"],
    nfstream: &["dst_port"],
};

pub const PROTOCOL: TextAliases = TextAliases {
    api: &["proto", "protocol", "Protocol"],
    eve: &["proto"],
    nfstream: &["protocol"],
};

pub const APP_PROTOCOL: TextAliases = TextAliases {
    api: &["app_proto", "application_name"],
    eve: &["app_proto"],
    nfstream: &["application_name"],
};

pub const FLOW_ID: TextAliases = TextAliases {
    api: &["flow_id"],
    eve: &["flow_id"],
    nfstream: &["id"],
};

pub const TIMESTAMP: TextAliases = TextAliases {
    api: &["timestamp"],
    eve: &["timestamp"],
    nfstream: &["timestamp", "bidirectional_last_seen_ms"],
};

// ============================================================================
// BASE FLOW COUNTERS
// ============================================================================

/// Base quantities every derived feature is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    DurationUs,
    BytesFwd,
    BytesBwd,
    PacketsFwd,
    PacketsBwd,
    HeaderLengthFwd,
    FwdPacketLengthStd,
    BwdPacketLengthStd,
    InitWinFwd,
    InitWinBwd,
    FwdIatStd,
    BwdIatStd,
    FlowIatStd,
    FlowIatMax,
    FwdIatMean,
    BwdIatMean,
    AckCount,
    SynCount,
    FinCount,
    PshCount,
    UrgCount,
}

impl Counter {
    pub fn aliases(self) -> &'static FieldAliases {
        match self {
            Counter::DurationUs => &DURATION_US,
            Counter::BytesFwd => &BYTES_FWD,
            Counter::BytesBwd => &BYTES_BWD,
            Counter::PacketsFwd => &PACKETS_FWD,
            Counter::PacketsBwd => &PACKETS_BWD,
            Counter::HeaderLengthFwd => &HEADER_LENGTH_FWD,
            Counter::FwdPacketLengthStd => &FWD_PACKET_LENGTH_STD,
            Counter::BwdPacketLengthStd => &BWD_PACKET_LENGTH_STD,
            Counter::InitWinFwd => &INIT_WIN_FWD,
            Counter::InitWinBwd => &INIT_WIN_BWD,
            Counter::FwdIatStd => &FWD_IAT_STD,
            Counter::BwdIatStd => &BWD_IAT_STD,
            Counter::FlowIatStd => &FLOW_IAT_STD,
            Counter::FlowIatMax => &FLOW_IAT_MAX,
            Counter::FwdIatMean => &FWD_IAT_MEAN,
            Counter::BwdIatMean => &BWD_IAT_MEAN,
            Counter::AckCount => &ACK_COUNT,
            Counter::SynCount => &SYN_COUNT,
            Counter::FinCount => &FIN_COUNT,
            Counter::PshCount => &PSH_COUNT,
            Counter::UrgCount => &URG_COUNT,
        }
    }

    pub fn resolve(self, record: &FlowRecord) -> Option<f64> {
        self.aliases().resolve(record)
    }
}

// EVE duration prefers flow.start/flow.end; flow.age is the fallback.
const DURATION_US: FieldAliases = FieldAliases {
    api: &[field("Flow_Duration"), field("Flow Duration")],
    eve: &[secs_as_micros("flow.age")],
    nfstream: &[millis_as_micros("bidirectional_duration_ms")],
};

const BYTES_FWD: FieldAliases = FieldAliases {
    api: &[field("Total_Length_of_Fwd_Packets"), field("Total Length of Fwd Packets")],
    eve: &[field("flow.bytes_toserver")],
    nfstream: &[field("src2dst_bytes")],
};

const BYTES_BWD: FieldAliases = FieldAliases {
    api: &[field("Total_Length_of_Bwd_Packets"), field("Total Length of Bwd Packets")],
    eve: &[field("flow.bytes_toclient")],
    nfstream: &[field("dst2src_bytes")],
};

const PACKETS_FWD: FieldAliases = FieldAliases {
    api: &[field("Total_Fwd_Packets"), field("Total Fwd Packets")],
    eve: &[field("flow.pkts_toserver")],
    nfstream: &[field("src2dst_packets")],
};

const PACKETS_BWD: FieldAliases = FieldAliases {
    api: &[field("Total_Backward_Packets"), field("Total Backward Packets")],
    eve: &[field("flow.pkts_toclient")],
    nfstream: &[field("dst2src_packets")],
};

const HEADER_LENGTH_FWD: FieldAliases = FieldAliases {
    api: &[field("Fwd_Header_Length"), field("Fwd Header Length")],
    eve: &[],
    nfstream: &[],
};

const FWD_PACKET_LENGTH_STD: FieldAliases = FieldAliases {
    api: &[field("Fwd_Packet_Length_Std"), field("Fwd Packet Length Std")],
    eve: &[],
    nfstream: &[field("src2dst_stddev_ps")],
};

const BWD_PACKET_LENGTH_STD: FieldAliases = FieldAliases {
    api: &[field("Bwd_Packet_Length_Std"), field("Bwd Packet Length Std")],
    eve: &[],
    nfstream: &[field("dst2src_stddev_ps")],
};

const INIT_WIN_FWD: FieldAliases = FieldAliases {
    api: &[field("Init_Win_bytes_forward")],
    eve: &[field("tcp.win")],
    nfstream: &[field("src2dst_init_win_bytes")],
};

const INIT_WIN_BWD: FieldAliases = FieldAliases {
    api: &[field("Init_Win_bytes_backward")],
    eve: &[],
    nfstream: &[field("dst2src_init_win_bytes")],
};

const FWD_IAT_STD: FieldAliases = FieldAliases {
    api: &[field("Fwd_IAT_Std"), field("Fwd IAT Std")],
    eve: &[],
    nfstream: &[millis_as_micros("src2dst_stddev_piat_ms"), field("src2dst_stddev_ps")],
};

const BWD_IAT_STD: FieldAliases = FieldAliases {
    api: &[field("Bwd_IAT_Std"), field("Bwd IAT Std")],
    eve: &[],
    nfstream: &[millis_as_micros("dst2src_stddev_piat_ms"), field("dst2src_stddev_ps")],
};

const FLOW_IAT_STD: FieldAliases = FieldAliases {
    api: &[field("Flow_IAT_Std"), field("Flow IAT Std")],
    eve: &[],
    nfstream: &[field("bidirectional_stddev_ps")],
};

const FLOW_IAT_MAX: FieldAliases = FieldAliases {
    api: &[field("Flow_IAT_Max"), field("Flow IAT Max")],
    eve: &[],
    nfstream: &[field("bidirectional_max_ps")],
};

const FWD_IAT_MEAN: FieldAliases = FieldAliases {
    api: &[field("Fwd_IAT_Mean"), field("Fwd IAT Mean")],
    eve: &[],
    nfstream: &[field("src2dst_mean_ps")],
};

const BWD_IAT_MEAN: FieldAliases = FieldAliases {
    api: &[field("Bwd_IAT_Mean"), field("Bwd IAT Mean")],
    eve: &[],
    nfstream: &[field("dst2src_mean_ps")],
};

// EVE flag counts come from tcp_flags_ts/tcp_flags_tc, see normalizer.
const ACK_COUNT: FieldAliases = FieldAliases {
    api: &[field("ACK_Flag_Count"), field("ACK Flag Count")],
    eve: &[],
    nfstream: &[field("bidirectional_ack_packets")],
};

const SYN_COUNT: FieldAliases = FieldAliases {
    api: &[field("SYN_Flag_Count"), field("SYN Flag Count")],
    eve: &[],
    nfstream: &[field("bidirectional_syn_packets")],
};

const FIN_COUNT: FieldAliases = FieldAliases {
    api: &[field("FIN_Flag_Count"), field("FIN Flag Count")],
    eve: &[],
    nfstream: &[field("bidirectional_fin_packets")],
};

const PSH_COUNT: FieldAliases = FieldAliases {
    api: &[field("PSH_Flag_Count"), field("PSH Flag Count")],
    eve: &[],
    nfstream: &[field("bidirectional_psh_packets")],
};

const URG_COUNT: FieldAliases = FieldAliases {
    api: &[field("URG_Flag_Count"), field("URG Flag Count")],
    eve: &[],
    nfstream: &[field("bidirectional_urg_packets")],
};

// ============================================================================
// DIRECT FEATURE FIELDS
// ============================================================================

/// Request API field carrying each canonical feature directly, in layout order.
///
/// Only the API schema supplies precomputed features; capture schemas are
/// always derived from counters.
pub const API_FEATURE_FIELDS: [&str; FEATURE_COUNT] = [
    "Fwd_Header_Length",
    "Destination_Port",
    "Flow_Duration",
    "Total_Length_of_Fwd_Packets",
    "Total_Length_of_Bwd_Packets",
    "Fwd_Packet_Length_Std",
    "Bwd_Packet_Length_Std",
    "Flow_Bytes_s",
    "Flow_Packets_s",
    "Total_Fwd_Packets",
    "Total_Backward_Packets",
    "Init_Win_bytes_forward",
    "Init_Win_bytes_backward",
    "Avg_Fwd_Segment_Size",
    "Avg_Bwd_Segment_Size",
    "Average_Packet_Size",
    "Packet_Length_Mean",
    "Fwd_IAT_Std",
    "Bwd_IAT_Std",
    "Flow_IAT_Mean",
    "Flow_IAT_Std",
    "Flow_IAT_Max",
    "Fwd_IAT_Mean",
    "Bwd_IAT_Mean",
    "ACK_Flag_Count",
    "SYN_Flag_Count",
    "FIN_Flag_Count",
    "PSH_Flag_Count",
    "URG_Flag_Count",
    "Subflow_Fwd_Packets",
    "Subflow_Bwd_Packets",
    "Subflow_Fwd_Bytes",
    "Subflow_Bwd_Bytes",
    "Fwd_Packets_s",
    "Bwd_Packets_s",
    "Down_Up_Ratio",
];

/// Direct value of canonical feature `index`, if the record carries one
pub fn direct_feature(record: &FlowRecord, index: usize, canonical: &str) -> Option<f64> {
    match record.schema {
        RawSchema::Api => {
            let api_name = *API_FEATURE_FIELDS.get(index)?;
            record.number(&[api_name, canonical])
        }
        RawSchema::Eve | RawSchema::NfStream => None,
    }
}
