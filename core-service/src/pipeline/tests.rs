//! End-to-end pipeline tests with deterministic classifiers.

use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;

use crate::capture::{IterSource, JsonLineSource, ReadMode};
use crate::config::HistoryLimits;
use crate::constants::EXPLANATION_PLACEHOLDER;
use crate::explain::{DisabledExplainer, ExplainError, Explainer, KeyIndicators};
use crate::features::{FlowRecord, RawSchema};
use crate::journal::{read_entries, AnomalyJournal};
use crate::model::tests::{syn_echo_scorer, FailingClassifier, FixedClassifier};
use crate::model::{EnsembleScorer, ModelKind, ScoreResult, ScoringPolicy, StandardScaler};
use crate::subscribers::{ChannelSubscriber, StreamMessage, SubscriberRegistry};
use super::*;

struct TimeoutExplainer;

impl Explainer for TimeoutExplainer {
    fn explain(&self, _score: &ScoreResult, _indicators: &KeyIndicators) -> Result<String, ExplainError> {
        Err(ExplainError::Transport("timed out".to_string()))
    }
}

/// API record whose ensemble score equals `syn` under `syn_echo_scorer`
fn flow(port: u16, syn: f64) -> FlowRecord {
    FlowRecord::from_json(RawSchema::Api, json!({
        "src_ip": "10.0.0.1",
        "src_port": 40000 + port,
        "dst_ip": "10.0.0.2",
        "dst_port": port,
        "SYN_Flag_Count": syn,
    }))
}

fn pipeline_with(scorer: EnsembleScorer, explainer: Arc<dyn Explainer>, limits: HistoryLimits) -> EventPipeline {
    EventPipeline::new(
        FlowAnalyzer::new(Arc::new(scorer), explainer),
        Arc::new(PipelineState::new(limits)),
        Arc::new(SubscriberRegistry::new()),
    )
}

fn pipeline() -> EventPipeline {
    pipeline_with(syn_echo_scorer(), Arc::new(DisabledExplainer), HistoryLimits::default())
}

fn mixed_records() -> Vec<FlowRecord> {
    vec![
        flow(1, 0.1),
        flow(2, 0.9),
        flow(3, 0.2),
        flow(4, 0.7),
        flow(5, 0.36),
        flow(6, 0.0),
    ]
}

fn expect_event(message: &StreamMessage) -> &Event {
    match message {
        StreamMessage::Event(event) => event,
        other => panic!("expected event, got {:?}", other),
    }
}

#[test]
fn test_events_follow_capture_order() {
    let pipeline = pipeline();
    let summary = pipeline.run(&mut IterSource::new(mixed_records()));

    assert_eq!(summary.processed, 6);
    assert_eq!(summary.anomalies, 3);

    let ports: Vec<u16> = pipeline.state().recent_events(10).iter().rev().map(|e| e.flow.dst_port).collect();
    assert_eq!(ports, vec![1, 2, 3, 4, 5, 6]);

    let stats = pipeline.state().stats();
    assert_eq!(stats.total_flows, 6);
    assert_eq!(stats.total_anomaly, 3);
    assert_eq!(stats.total_normal, 3);
    assert_eq!((stats.high, stats.medium, stats.low), (1, 1, 1));
}

#[test]
fn test_replay_is_deterministic() {
    let first = pipeline();
    let second = pipeline();
    first.run(&mut IterSource::new(mixed_records()));
    second.run(&mut IterSource::new(mixed_records()));

    let summarize = |p: &EventPipeline| -> Vec<(u16, ScoreResult, EventKind)> {
        p.state().recent_events(10).into_iter()
            .map(|e| (e.flow.dst_port, e.prediction, e.kind))
            .collect()
    };
    assert_eq!(summarize(&first), summarize(&second));
    assert_eq!(first.state().stats(), second.state().stats());
}

#[test]
fn test_late_subscriber_gets_bounded_init_then_events() {
    let limits = HistoryLimits { init_events: 4, init_anomalies: 2, ..HistoryLimits::default() };
    let pipeline = pipeline_with(syn_echo_scorer(), Arc::new(DisabledExplainer), limits);

    let earlier: Vec<FlowRecord> = (0..10).map(|i| flow(i, if i % 2 == 0 { 0.9 } else { 0.1 })).collect();
    pipeline.run(&mut IterSource::new(earlier));

    let (subscriber, mut rx) = ChannelSubscriber::channel(32);
    pipeline.subscribe(Arc::new(subscriber)).unwrap();

    pipeline.run(&mut IterSource::new(vec![flow(100, 0.1), flow(101, 0.9), flow(102, 0.2)]));

    let init = rx.try_recv().unwrap();
    match init.as_ref() {
        StreamMessage::Init(init) => {
            assert_eq!(init.snapshot.stats.total_flows, 10);
            assert_eq!(init.snapshot.events.len(), 4);
            assert_eq!(init.snapshot.anomalies.len(), 2);
            assert_eq!(init.snapshot.events[0].flow.dst_port, 9);
        }
        other => panic!("expected init, got {:?}", other),
    }

    let ports: Vec<u16> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|m| expect_event(&m).flow.dst_port)
        .collect();
    assert_eq!(ports, vec![100, 101, 102]);
}

#[test]
fn test_event_stats_are_consecutive() {
    let pipeline = pipeline();
    let (subscriber, mut rx) = ChannelSubscriber::channel(32);
    pipeline.subscribe(Arc::new(subscriber)).unwrap();

    pipeline.run(&mut IterSource::new(mixed_records()));

    rx.try_recv().unwrap();
    let totals: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|m| expect_event(&m).stats.total_flows)
        .collect();
    assert_eq!(totals, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_failed_subscriber_is_pruned_and_pipeline_continues() {
    let pipeline = pipeline();
    let (gone, gone_rx) = ChannelSubscriber::channel(8);
    pipeline.subscribe(Arc::new(gone)).unwrap();
    drop(gone_rx);

    let (alive, mut rx) = ChannelSubscriber::channel(32);
    pipeline.subscribe(Arc::new(alive)).unwrap();

    let summary = pipeline.run(&mut IterSource::new(mixed_records()));
    assert_eq!(summary.processed, 6);
    assert_eq!(pipeline.registry().len(), 1);

    assert_eq!(std::iter::from_fn(|| rx.try_recv().ok()).count(), 7);
}

#[test]
fn test_journal_receives_anomalies_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("anomalies.jsonl");
    let pipeline = pipeline().with_journal(Arc::new(AnomalyJournal::new(&path)));

    pipeline.run(&mut IterSource::new(mixed_records()));

    let entries = read_entries(&path).unwrap();
    let ports: Vec<u16> = entries.iter().map(|e| e.dst_port).collect();
    assert_eq!(ports, vec![2, 4, 5]);
    assert!(entries.iter().all(|e| e.prediction.is_anomaly));
    assert!(entries.iter().all(|e| e.explanation.as_deref() == Some(EXPLANATION_PLACEHOLDER)));
}

#[test]
fn test_journal_failure_does_not_stop_pipeline() {
    let dir = tempdir().unwrap();
    let pipeline = pipeline().with_journal(Arc::new(AnomalyJournal::new(dir.path())));

    let summary = pipeline.run(&mut IterSource::new(mixed_records()));
    assert_eq!(summary.processed, 6);
    assert_eq!(pipeline.state().recent_anomalies(10).len(), 3);
}

#[test]
fn test_explainer_failure_degrades_to_placeholder() {
    let pipeline = pipeline_with(syn_echo_scorer(), Arc::new(TimeoutExplainer), HistoryLimits::default());
    let event = pipeline.process(&flow(22, 0.95)).unwrap();

    assert!(event.is_anomaly());
    let explanation = event.explanation.unwrap();
    assert!(explanation.starts_with(EXPLANATION_PLACEHOLDER));
    assert!(explanation.contains("timed out"));

    let normal = pipeline.process(&flow(23, 0.05)).unwrap();
    assert!(normal.explanation.is_none());
}

#[test]
fn test_invalid_records_are_dropped_without_stats() {
    let pipeline = pipeline();
    let records = vec![
        flow(1, 0.1),
        FlowRecord::from_json(RawSchema::Api, json!({ "dst_port": 80, "SYN_Flag_Count": 1.0 })),
        FlowRecord::from_json(RawSchema::Api, json!("not an object")),
        flow(2, 0.9),
    ];

    let summary = pipeline.run(&mut IterSource::new(records));
    assert_eq!(summary.invalid, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(pipeline.state().stats().total_flows, 2);
}

#[test]
fn test_scoring_failures_are_dropped_without_stats() {
    let scorer = EnsembleScorer::new(
        Box::new(StandardScaler::identity()),
        Box::new(FixedClassifier { kind: ModelKind::Tabular, probability: 0.9 }),
        Box::new(FixedClassifier { kind: ModelKind::Sequence, probability: 0.9 }),
        Box::new(FailingClassifier(ModelKind::Residual)),
        ScoringPolicy::default(),
    );
    let pipeline = pipeline_with(scorer, Arc::new(DisabledExplainer), HistoryLimits::default());
    let (subscriber, mut rx) = ChannelSubscriber::channel(8);
    pipeline.subscribe(Arc::new(subscriber)).unwrap();

    let summary = pipeline.run(&mut IterSource::new(mixed_records()));
    assert_eq!(summary.scoring_failures, 6);
    assert_eq!(summary.processed, 0);
    assert_eq!(pipeline.state().stats(), Stats::default());
    assert!(pipeline.state().recent_events(10).is_empty());

    rx.try_recv().unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_spawned_pipeline_drains_source() {
    let pipeline = Arc::new(pipeline());
    let handle = Arc::clone(&pipeline)
        .spawn(Box::new(IterSource::new(mixed_records())))
        .unwrap();

    let summary = handle.join().unwrap();
    assert_eq!(summary.processed, 6);
    assert_eq!(pipeline.state().stats().total_flows, 6);
}

#[test]
fn test_undecodable_capture_line_does_not_end_run() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(br#"{"src_ip":"10.0.0.1","dst_ip":"10.0.0.2","dst_port":1,"SYN_Flag_Count":0.1}"#);
    bytes.push(b'\n');
    bytes.extend_from_slice(b"{\"src_ip\":\"\xff\xfe\"}\n");
    bytes.extend_from_slice(br#"{"src_ip":"10.0.0.1","dst_ip":"10.0.0.2","dst_port":2,"SYN_Flag_Count":0.9}"#);
    bytes.push(b'\n');

    let pipeline = pipeline();
    let mut source = JsonLineSource::from_reader(Cursor::new(bytes), RawSchema::Api, ReadMode::Replay);
    let summary = pipeline.run(&mut source);

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.anomalies, 1);
    assert_eq!(source.skipped(), 1);
    assert_eq!(pipeline.state().stats().total_flows, 2);
}

#[test]
fn test_subscribers_joining_mid_run_see_gapless_totals() {
    const TOTAL: u64 = 400;

    let pipeline = Arc::new(pipeline());
    let slow = (1..=TOTAL as u16).map(|port| {
        thread::sleep(Duration::from_micros(500));
        flow(port, 0.1)
    });
    let handle = Arc::clone(&pipeline).spawn(Box::new(IterSource::new(slow))).unwrap();

    let receivers: Vec<_> = thread::scope(|scope| {
        let joiners: Vec<_> = [20, 90, 160, 250]
            .into_iter()
            .map(|after| {
                let pipeline = Arc::clone(&pipeline);
                scope.spawn(move || {
                    while pipeline.state().stats().total_flows < after {
                        thread::yield_now();
                    }
                    let (subscriber, rx) = ChannelSubscriber::channel(TOTAL as usize + 1);
                    pipeline.subscribe(Arc::new(subscriber)).unwrap();
                    rx
                })
            })
            .collect();
        joiners.into_iter().map(|j| j.join().unwrap()).collect()
    });

    let summary = handle.join().unwrap();
    assert_eq!(summary.processed, TOTAL);

    for mut rx in receivers {
        let joined_at = match rx.try_recv().unwrap().as_ref() {
            StreamMessage::Init(init) => init.snapshot.stats.total_flows,
            other => panic!("expected init, got {:?}", other),
        };
        let totals: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| expect_event(&m).stats.total_flows)
            .collect();
        let expected: Vec<u64> = (joined_at + 1..=TOTAL).collect();
        assert_eq!(totals, expected, "subscriber joined at {}", joined_at);
    }
}
