use super::*;
use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

/// Sets its flag when dropped, to observe that a losing scan is released.
struct DropProbe(Arc<AtomicBool>);

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

async fn never(probe: DropProbe) -> Result<String, DetectionError> {
    let _probe = probe;
    pending().await
}

async fn after(delay: Duration, result: Result<String, DetectionError>) -> Result<String, DetectionError> {
    tokio::time::sleep(delay).await;
    result
}

#[tokio::test]
async fn first_success_wins_and_releases_the_other() {
    let dropped = Arc::new(AtomicBool::new(false));
    let result = race(
        never(DropProbe(dropped.clone())),
        async { Ok("1.0.0".to_string()) },
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(result.unwrap(), "1.0.0");
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn one_failure_waits_for_the_other() {
    let result = race(
        async { Err(DetectionError::NoVersionForward) },
        after(Duration::from_millis(20), Ok("2.0".to_string())),
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(result.unwrap(), "2.0");
}

#[tokio::test]
async fn both_failures_report_not_found() {
    let result = race(
        async { Err(DetectionError::NoVersionForward) },
        async { Err(DetectionError::NoVersionBackward) },
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(result, Err(DetectionError::NoVersionFound)));
}

#[tokio::test]
async fn deadline_cancels_both_scans() {
    let forward_dropped = Arc::new(AtomicBool::new(false));
    let backward_dropped = Arc::new(AtomicBool::new(false));
    let result = race(
        never(DropProbe(forward_dropped.clone())),
        never(DropProbe(backward_dropped.clone())),
        Duration::from_millis(50),
    )
    .await;

    assert!(matches!(result, Err(DetectionError::Timeout(_))));
    assert!(forward_dropped.load(Ordering::SeqCst));
    assert!(backward_dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn deadline_applies_after_one_failure() {
    let result = race(
        async { Err(DetectionError::NoVersionForward) },
        pending(),
        Duration::from_millis(50),
    )
    .await;

    assert!(matches!(result, Err(DetectionError::Timeout(_))));
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn detects_leading_version_in_large_file() {
    let dir = TempDir::new().unwrap();
    let mut content = String::from(r#"{"reporting_entity_name": "acme", "version": "1.3.1", "in_network": ["#);
    for i in 0..50_000 {
        content.push_str(&format!(r#"{{"billing_code": "{i}"}},"#));
    }
    content.push_str("{}]}");
    let path = write(&dir, "in-network.json", &content);

    let version = VersionDetector::default().detect(&path).await.unwrap();
    assert_eq!(version, "1.3.1");
}

#[tokio::test]
async fn detects_trailing_version_when_nothing_leads() {
    let dir = TempDir::new().unwrap();
    // Not valid JSON from the start, so only the backward scan can succeed.
    let mut content = String::from(r#"{"in_network": [ oops "#);
    content.push_str(&" ".repeat(4096));
    content.push_str(r#"], "version": "1.0.0"}"#);
    let path = write(&dir, "trailing.json", &content);

    let version = VersionDetector::default().detect(&path).await.unwrap();
    assert_eq!(version, "1.0.0");
}

#[tokio::test]
async fn short_file_is_scanned_in_full() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "tiny.json", r#"{"version":"0.9"}"#);

    let detector = VersionDetector::new(4096, Duration::from_secs(5));
    assert_eq!(detector.detect(&path).await.unwrap(), "0.9");
}

#[tokio::test]
async fn nested_version_alone_is_not_found_forward() {
    let dir = TempDir::new().unwrap();
    let mut content = String::from(r#"{"plan": {"version": "nested"}, "in_network": ["#);
    content.push_str(&"1,".repeat(2048));
    content.push_str("1]}");
    let path = write(&dir, "nested.json", &content);

    let result = VersionDetector::default().detect(&path).await;
    assert!(matches!(result, Err(DetectionError::NoVersionFound)));
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result = VersionDetector::default()
        .detect(&dir.path().join("absent.json"))
        .await;
    assert!(matches!(result, Err(DetectionError::NoVersionFound)));
}

#[tokio::test]
async fn detect_times_out_on_slow_scan() {
    let dir = TempDir::new().unwrap();
    // No version anywhere, so the backward scan fails at once and only the
    // forward scan, which has megabytes to get through, is left running.
    let mut content = String::from(r#"{"in_network": ["#);
    content.push_str(&"1,".repeat(10_000_000));
    content.push_str("1]}");
    let path = write(&dir, "huge.json", &content);

    let deadline = Duration::from_millis(1);
    let result = VersionDetector::new(DEFAULT_WINDOW, deadline)
        .detect(&path)
        .await;
    assert!(matches!(result, Err(DetectionError::Timeout(d)) if d == deadline));
}
