//! Tests for metrics emission.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use mimir::{
    CompositeGenerator, MimirError, QuoteSource, Result, RetryConfig, RetryingSource,
    SelectionMode, SelectionPolicy, SequenceRandom, TextQuote, WeightedCoin, WeightedOptionSet,
    telemetry,
};

// ============================================================================
// Mock sources
// ============================================================================

struct OkSource;

#[async_trait]
impl QuoteSource<TextQuote> for OkSource {
    fn name(&self) -> &str {
        "ok"
    }

    async fn download_one(&self, _tag: Option<&str>) -> Result<TextQuote> {
        Ok(TextQuote::new("1", "fine"))
    }
}

struct DownSource;

#[async_trait]
impl QuoteSource<TextQuote> for DownSource {
    fn name(&self) -> &str {
        "down"
    }

    async fn download_one(&self, _tag: Option<&str>) -> Result<TextQuote> {
        Err(MimirError::Http("connection refused".into()))
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name and label filter.
fn counter_total(snapshot: &SnapshotVec, name: &str, labels: &[(&str, &str)]) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| {
            labels.iter().all(|(k, v)| {
                key.key()
                    .labels()
                    .any(|label| label.key() == *k && label.value() == *v)
            })
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn cache_first_policy() -> SelectionPolicy<TextQuote> {
    SelectionPolicy::new(Arc::new(OkSource)).with_coin(WeightedCoin::new().bounded(10, 10).unwrap())
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn download_then_cache_hit_records_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let policy = cache_first_policy();
                policy.get_random_quote(SelectionMode::Mixed).await.unwrap();
                policy.get_random_quote(SelectionMode::Mixed).await.unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL, &[]), 2);
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::REQUESTS_TOTAL,
            &[("route", "download"), ("status", "ok")]
        ),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::REQUESTS_TOTAL, &[("route", "cache")]),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::DOWNLOADS_TOTAL, &[("source", "ok")]),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL, &[]), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL, &[]), 1);
    assert!(
        has_histogram(&snapshot, telemetry::DOWNLOAD_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_download_records_error_status() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                SelectionPolicy::<TextQuote>::new(Arc::new(DownSource))
                    .get_random_quote(SelectionMode::Download)
                    .await
            })
        })
    });
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::REQUESTS_TOTAL,
            &[("source", "down"), ("status", "error")]
        ),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::DOWNLOADS_TOTAL, &[("status", "error")]),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn retries_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let config = RetryConfig::new()
                    .max_attempts(3)
                    .initial_delay(Duration::from_millis(1))
                    .jitter(false);
                RetryingSource::<TextQuote>::new(Arc::new(DownSource), config)
                    .download_one(None)
                    .await
            })
        })
    });
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();
    // Three attempts, two retries
    assert_eq!(
        counter_total(&snapshot, telemetry::RETRIES_TOTAL, &[("source", "down")]),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn source_picks_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let generator = CompositeGenerator::builder()
                    .source(cache_first_policy(), 1)
                    .build()
                    .unwrap();
                for _ in 0..3 {
                    generator
                        .get_random_quote(SelectionMode::Mixed)
                        .await
                        .unwrap();
                }
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::SOURCE_PICKS_TOTAL, &[("source", "ok")]),
        3
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn source_mismatch_is_not_counted_as_a_pick() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let options = WeightedOptionSet::with_max(10)
                    .with_random(Arc::new(SequenceRandom::new([9])))
                    .with_option("ok", 5)
                    .unwrap();
                let mut sources = HashMap::new();
                sources.insert("ok".to_string(), cache_first_policy());
                let generator = CompositeGenerator::new(options, sources).unwrap();
                generator.get_random_quote(SelectionMode::Mixed).await
            })
        })
    });
    assert!(matches!(result, Err(MimirError::SourceMismatch(_))));

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::SOURCE_PICKS_TOTAL, &[]),
        0
    );
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL, &[]), 0);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let policy = cache_first_policy();
    policy
        .get_random_quote(SelectionMode::Download)
        .await
        .unwrap();
}
