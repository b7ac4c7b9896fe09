//! Integration Tests for Feature Normalization
//!
//! Exercise the alias table, derivation and sanitization together for every
//! supported raw schema.

use proptest::prelude::*;
use serde_json::json;

use crate::features::{
    FeatureNormalizer, FlowRecord, NormalizeError, RawSchema,
    FEATURE_COUNT, feature_index,
};

fn value(vector: &crate::features::FeatureVector, name: &str) -> f64 {
    vector.get_by_name(name).unwrap_or_else(|| panic!("unknown feature {}", name))
}

/// Zero packets, zero duration → everything zero except the header default
#[test]
fn test_empty_flow_is_zero_except_header_length() {
    let record = FlowRecord::from_json(RawSchema::NfStream, json!({
        "src_ip": "10.0.0.1",
        "dst_ip": "10.0.0.2",
        "src2dst_packets": 0,
        "dst2src_packets": 0,
        "bidirectional_duration_ms": 0,
    }));

    let (_, vector) = FeatureNormalizer::new().normalize(&record).unwrap();
    let header = feature_index("Fwd Header Length").unwrap();

    for (i, v) in vector.as_slice().iter().enumerate() {
        if i == header {
            assert_eq!(*v, 20.0);
        } else {
            assert_eq!(*v, 0.0, "feature {} should be zero", i);
        }
    }
}

#[test]
fn test_nfstream_flow_mapping() {
    let record = FlowRecord::from_json(RawSchema::NfStream, json!({
        "id": 7,
        "src_ip": "192.168.1.10",
        "src_port": 51512,
        "dst_ip": "93.184.216.34",
        "dst_port": 443,
        "protocol": 6,
        "application_name": "TLS",
        "bidirectional_duration_ms": 500,
        "src2dst_bytes": 1200,
        "dst2src_bytes": 4800,
        "src2dst_packets": 10,
        "dst2src_packets": 20,
        "bidirectional_syn_packets": 1,
        "bidirectional_ack_packets": 29,
        "src2dst_mean_ps": 120.0,
    }));

    let (summary, vector) = FeatureNormalizer::new().normalize(&record).unwrap();

    assert_eq!(summary.src_port, 51512);
    assert_eq!(summary.dst_port, 443);
    assert_eq!(summary.proto, "TLS");
    assert_eq!(summary.flow_id, Some(7));

    assert_eq!(value(&vector, "Flow Duration"), 500_000.0);
    assert_eq!(value(&vector, "Destination Port"), 443.0);
    assert_eq!(value(&vector, "Flow Bytes/s"), 12_000.0);
    assert_eq!(value(&vector, "Flow Packets/s"), 60.0);
    assert_eq!(value(&vector, "Avg Fwd Segment Size"), 120.0);
    assert_eq!(value(&vector, "Avg Bwd Segment Size"), 240.0);
    assert_eq!(value(&vector, "Average Packet Size"), 200.0);
    assert_eq!(value(&vector, "Down/Up Ratio"), 4.0);
    assert_eq!(value(&vector, "Fwd IAT Mean"), 120.0);
    assert_eq!(value(&vector, "SYN Flag Count"), 1.0);
    assert_eq!(value(&vector, "ACK Flag Count"), 29.0);
    assert_eq!(value(&vector, "Subflow Bwd Bytes"), 4800.0);
    // No bidirectional_max_ps: falls back to the duration
    assert_eq!(value(&vector, "Flow IAT Max"), 500_000.0);
}

#[test]
fn test_eve_flow_mapping() {
    let record = FlowRecord::from_json(RawSchema::Eve, json!({
        "timestamp": "2024-01-01T10:00:02.000000+0000",
        "flow_id": 1_234_567_890_123_456_789u64,
        "event_type": "flow",
        "src_ip": "10.1.1.5",
        "src_port": 40000,
        "dest_ip": "10.1.1.9",
        "dest_port": 22,
        "proto": "TCP",
        "flow": {
            "pkts_toserver": 10,
            "pkts_toclient": 20,
            "bytes_toserver": 1000,
            "bytes_toclient": 3000,
            "start": "2024-01-01T10:00:00.000000+0000",
            "end": "2024-01-01T10:00:02.000000+0000",
            "age": 9,
        },
        "tcp": {
            "tcp_flags_ts": "1b",
            "tcp_flags_tc": "0x00",
        },
    }));

    let (summary, vector) = FeatureNormalizer::new().normalize(&record).unwrap();

    assert_eq!(summary.dst_ip, "10.1.1.9");
    assert_eq!(summary.proto, "TCP");
    assert_eq!(summary.flow_id, Some(1_234_567_890_123_456_789));

    // start/end wins over age
    assert_eq!(value(&vector, "Flow Duration"), 2_000_000.0);
    assert_eq!(value(&vector, "Flow Bytes/s"), 2_000.0);
    assert_eq!(value(&vector, "Fwd IAT Mean"), 200_000.0);
    assert_eq!(value(&vector, "Bwd IAT Mean"), 100_000.0);
    assert_eq!(value(&vector, "Down/Up Ratio"), 3.0);
    assert_eq!(value(&vector, "FIN Flag Count"), 1.0);
    assert_eq!(value(&vector, "SYN Flag Count"), 1.0);
    assert_eq!(value(&vector, "PSH Flag Count"), 1.0);
    assert_eq!(value(&vector, "ACK Flag Count"), 1.0);
    assert_eq!(value(&vector, "URG Flag Count"), 0.0);
    assert_eq!(value(&vector, "Fwd Header Length"), 20.0);
}

#[test]
fn test_eve_age_fallback() {
    let record = FlowRecord::from_json(RawSchema::Eve, json!({
        "src_ip": "10.1.1.5",
        "dest_ip": "10.1.1.9",
        "flow": { "age": 4, "pkts_toserver": 4, "bytes_toserver": 400 },
    }));

    let vector = FeatureNormalizer::new().features(&record);
    assert_eq!(value(&vector, "Flow Duration"), 4_000_000.0);
    assert_eq!(value(&vector, "Fwd Packets/s"), 1.0);
}

#[test]
fn test_eve_end_before_start_uses_age() {
    let record = FlowRecord::from_json(RawSchema::Eve, json!({
        "src_ip": "10.1.1.5",
        "dest_ip": "10.1.1.9",
        "flow": {
            "pkts_toserver": 2,
            "pkts_toclient": 1,
            "start": "2024-01-01T10:00:05.000000+0000",
            "end": "2024-01-01T10:00:00.000000+0000",
            "age": 2,
        },
    }));

    let vector = FeatureNormalizer::new().features(&record);
    assert_eq!(value(&vector, "Flow Duration"), 2_000_000.0);
    assert_eq!(value(&vector, "Fwd IAT Mean"), 1_000_000.0);
    assert!(vector.as_slice().iter().all(|v| *v >= 0.0));

    // No age either: duration stays at zero rather than going negative
    let record = FlowRecord::from_json(RawSchema::Eve, json!({
        "src_ip": "10.1.1.5",
        "dest_ip": "10.1.1.9",
        "flow": {
            "pkts_toserver": 3,
            "start": "2024-01-01T10:00:05.000000+0000",
            "end": "2024-01-01T10:00:00.000000+0000",
        },
    }));
    let vector = FeatureNormalizer::new().features(&record);
    assert_eq!(value(&vector, "Flow Duration"), 0.0);
    assert!(vector.as_slice().iter().all(|v| *v >= 0.0));
}

#[test]
fn test_api_fields_pass_through() {
    let record = FlowRecord::from_json(RawSchema::Api, json!({
        "src_ip": "172.16.0.1",
        "dst_ip": "172.16.0.2",
        "Flow_Duration": 1_000_000.0,
        "Total_Fwd_Packets": 4.0,
        // Supplied rate wins over the derived one
        "Flow_Packets_s": 999.0,
        "Fwd_Header_Length": 32.0,
    }));

    let vector = FeatureNormalizer::new().features(&record);
    assert_eq!(value(&vector, "Flow Packets/s"), 999.0);
    assert_eq!(value(&vector, "Fwd Packets/s"), 4.0);
    assert_eq!(value(&vector, "Fwd Header Length"), 32.0);
    assert_eq!(value(&vector, "Bwd IAT Std"), 0.0);
}

#[test]
fn test_missing_endpoints_rejected() {
    let normalizer = FeatureNormalizer::new();

    let no_dst = FlowRecord::from_json(RawSchema::Eve, json!({ "src_ip": "10.0.0.1" }));
    assert_eq!(
        normalizer.normalize(&no_dst).unwrap_err(),
        NormalizeError::InvalidRecord { schema: RawSchema::Eve, missing: "destination address" }
    );

    let blank_src = FlowRecord::from_json(RawSchema::Api, json!({ "src_ip": "  ", "dst_ip": "10.0.0.2" }));
    assert!(matches!(
        normalizer.normalize(&blank_src),
        Err(NormalizeError::InvalidRecord { missing: "source address", .. })
    ));
}

#[test]
fn test_normalization_is_deterministic() {
    let record = FlowRecord::from_json(RawSchema::NfStream, json!({
        "src_ip": "1.1.1.1", "dst_ip": "2.2.2.2",
        "src2dst_bytes": 77, "dst2src_bytes": 5, "src2dst_packets": 3,
        "bidirectional_duration_ms": 13,
    }));
    let normalizer = FeatureNormalizer::new();
    assert_eq!(normalizer.features(&record), normalizer.features(&record));
}

fn adversarial() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        Just(-0.0),
        Just(f64::MAX),
        Just(-f64::MAX),
        Just(f64::MIN_POSITIVE),
        any::<f64>().prop_filter("finite", |v| v.is_finite()),
    ]
}

proptest! {
    #[test]
    fn prop_features_always_finite(
        duration in adversarial(),
        bytes_fwd in adversarial(),
        bytes_bwd in adversarial(),
        pkts_fwd in adversarial(),
        pkts_bwd in adversarial(),
        iat_max in adversarial(),
    ) {
        let record = FlowRecord::from_json(RawSchema::NfStream, json!({
            "src_ip": "10.0.0.1",
            "dst_ip": "10.0.0.2",
            "bidirectional_duration_ms": duration,
            "src2dst_bytes": bytes_fwd,
            "dst2src_bytes": bytes_bwd,
            "src2dst_packets": pkts_fwd,
            "dst2src_packets": pkts_bwd,
            "bidirectional_max_ps": iat_max,
        }));

        let vector = FeatureNormalizer::new().features(&record);
        prop_assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
        for v in vector.as_slice() {
            prop_assert!(v.is_finite());
        }
    }

    #[test]
    fn prop_api_overrides_are_sanitized(rate in adversarial(), ratio in adversarial()) {
        let record = FlowRecord::from_json(RawSchema::Api, json!({
            "src_ip": "10.0.0.1",
            "dst_ip": "10.0.0.2",
            "Flow_Bytes_s": rate,
            "Down_Up_Ratio": ratio,
            "Flow_Duration": 0.0,
        }));

        let vector = FeatureNormalizer::new().features(&record);
        prop_assert!(vector.as_slice().iter().all(|v| v.is_finite()));
    }
}
