//! Contract tests for the reconciliation decision logic
//!
//! These tests drive `Reconciler::tick()` directly with test doubles,
//! so no real time passes and no real infrastructure is touched.

mod common;

use common::{
    FlakyHistoryStore, MemoryConfigRecord, RecordingRestarter, ScriptedSource, TEST_KEY,
    test_config,
};
use ipsync_core::{Reconciler, TickOutcome};

fn build_reconciler(
    source: &ScriptedSource,
    record: &MemoryConfigRecord,
    history: &FlakyHistoryStore,
    restarter: &RecordingRestarter,
) -> Reconciler {
    Reconciler::new(
        Box::new(source.clone()),
        Box::new(record.clone()),
        Box::new(history.clone()),
        Box::new(restarter.clone()),
        test_config(),
    )
    .expect("test config must be valid")
}

#[tokio::test]
async fn first_run_applies_the_address_exactly_once() {
    let source = ScriptedSource::new();
    source.push_address("203.0.113.5");
    let record = MemoryConfigRecord::new();
    let history = FlakyHistoryStore::new();
    let restarter = RecordingRestarter::new();

    let mut reconciler = build_reconciler(&source, &record, &history, &restarter);

    let outcome = reconciler.tick().await;
    assert_eq!(
        outcome,
        TickOutcome::Updated {
            address: "203.0.113.5".to_string(),
            previous: None,
        }
    );

    // Exactly one config write, one restart, one history insert.
    assert_eq!(record.value(TEST_KEY).as_deref(), Some("203.0.113.5"));
    assert_eq!(record.write_call_count(), 1);
    assert_eq!(restarter.restart_call_count(), 1);
    assert_eq!(history.len(), 1);
    assert_eq!(history.latest_address().as_deref(), Some("203.0.113.5"));
}

#[tokio::test]
async fn agreeing_observations_are_a_no_op() {
    let source = ScriptedSource::new();
    source.push_address("203.0.113.5");
    let record = MemoryConfigRecord::new();
    record.seed(TEST_KEY, "203.0.113.5");
    let history = FlakyHistoryStore::new();
    history.seed("203.0.113.5");
    let restarter = RecordingRestarter::new();

    let mut reconciler = build_reconciler(&source, &record, &history, &restarter);

    let outcome = reconciler.tick().await;
    assert_eq!(
        outcome,
        TickOutcome::InSync {
            address: "203.0.113.5".to_string(),
        }
    );

    // No write, no restart, no new history record.
    assert_eq!(record.write_call_count(), 0);
    assert_eq!(restarter.restart_call_count(), 0);
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn changed_address_flows_through_the_whole_pipeline() {
    let source = ScriptedSource::new();
    source.push_address("203.0.113.5");
    source.push_address("203.0.113.6");
    let record = MemoryConfigRecord::new();
    let history = FlakyHistoryStore::new();
    let restarter = RecordingRestarter::new();

    let mut reconciler = build_reconciler(&source, &record, &history, &restarter);

    let first = reconciler.tick().await;
    assert!(matches!(first, TickOutcome::Updated { .. }));

    let second = reconciler.tick().await;
    assert_eq!(
        second,
        TickOutcome::Updated {
            address: "203.0.113.6".to_string(),
            previous: Some("203.0.113.5".to_string()),
        }
    );

    assert_eq!(record.value(TEST_KEY).as_deref(), Some("203.0.113.6"));
    assert_eq!(restarter.restart_call_count(), 2);
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn config_drift_is_detected_and_repaired() {
    // History and the fetched address agree on "A", but the config
    // record was edited to "B" behind our back.
    let source = ScriptedSource::new();
    source.push_address("203.0.113.5");
    let record = MemoryConfigRecord::new();
    record.seed(TEST_KEY, "198.51.100.9");
    let history = FlakyHistoryStore::new();
    history.seed("203.0.113.5");
    let restarter = RecordingRestarter::new();

    let mut reconciler = build_reconciler(&source, &record, &history, &restarter);

    let outcome = reconciler.tick().await;
    assert!(matches!(outcome, TickOutcome::Updated { .. }));

    assert_eq!(record.value(TEST_KEY).as_deref(), Some("203.0.113.5"));
    assert_eq!(restarter.restart_call_count(), 1);
}

#[tokio::test]
async fn absent_config_value_alone_is_not_drift() {
    let source = ScriptedSource::new();
    source.push_address("203.0.113.5");
    let record = MemoryConfigRecord::new();
    let history = FlakyHistoryStore::new();
    history.seed("203.0.113.5");
    let restarter = RecordingRestarter::new();

    let mut reconciler = build_reconciler(&source, &record, &history, &restarter);

    let outcome = reconciler.tick().await;
    assert_eq!(
        outcome,
        TickOutcome::InSync {
            address: "203.0.113.5".to_string(),
        }
    );
    assert_eq!(restarter.restart_call_count(), 0);
}

#[tokio::test]
async fn run_with_shutdown_stops_the_loop() {
    let source = ScriptedSource::new();
    source.push_address("203.0.113.5");
    let record = MemoryConfigRecord::new();
    let history = FlakyHistoryStore::new();
    let restarter = RecordingRestarter::new();

    let mut reconciler = build_reconciler(&source, &record, &history, &restarter);

    let (tx, rx) = tokio::sync::oneshot::channel();
    tx.send(()).unwrap();

    // The signal is already pending, so the loop runs exactly one
    // tick and stops during the following sleep.
    reconciler.run_with_shutdown(rx).await.unwrap();

    assert_eq!(source.fetch_call_count(), 1);
    assert_eq!(restarter.restart_call_count(), 1);
}
