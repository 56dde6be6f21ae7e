//! Tests for persistence failures on the HTTP path.
//!
//! When the backing file cannot be written after a mutation, the request
//! still succeeds (the change is already in memory) and the failure must show
//! up in the logs.
//!
//! # Test Approach
//!
//! 1. Use a custom tracing subscriber Layer to capture all log messages
//! 2. Point the store at a directory that does not exist
//! 3. Exercise the HTTP routes and inspect status codes and captured logs

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use todolist::config::Config;
use todolist::routes::{create_router, AppState};
use todolist::store::{TaskStore, TodoList};

// ============================================================================
// Log Capture Infrastructure
// ============================================================================

/// A buffer for capturing log output during tests.
#[derive(Clone, Default)]
struct LogCapture {
    logs: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    /// Returns all captured log messages joined into a single string.
    fn get_logs(&self) -> String {
        self.logs.lock().unwrap().join("\n")
    }
}

/// A tracing Layer that captures log events for inspection.
struct CaptureLayer {
    capture: LogCapture,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = StringVisitor::default();
        event.record(&mut visitor);

        let message = format!(
            "[{}] {}: {}",
            event.metadata().level(),
            event.metadata().target(),
            visitor.parts.join(" ")
        );

        self.capture.logs.lock().unwrap().push(message);
    }
}

/// A visitor that collects all event fields into strings.
#[derive(Default)]
struct StringVisitor {
    parts: Vec<String>,
}

impl tracing::field::Visit for StringVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.parts.push(format!("{}={:?}", field.name(), value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.parts.push(format!("{}={}", field.name(), value));
    }
}

/// Runs an async test body on a current-thread runtime with log capture.
///
/// Returns the captured logs for assertion.
fn with_log_capture<F, Fut>(test_fn: F) -> String
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let capture = LogCapture::default();
    let layer = CaptureLayer {
        capture: capture.clone(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(layer.with_filter(tracing_subscriber::filter::LevelFilter::DEBUG));

    tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(test_fn());
    });

    capture.get_logs()
}

/// Builds a router whose backing file lives in a missing directory.
fn unwritable_app(dir: &TempDir) -> axum::Router {
    let config = Config {
        tasks_file: dir.path().join("no-such-dir").join("tasks.json"),
        port: 0,
        index_file: dir.path().join("index.html"),
    };
    let store = TaskStore::new(TodoList::new(config.tasks_file.clone()));
    create_router(AppState::new(config, store))
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn create_succeeds_and_logs_when_save_fails() {
    let dir = TempDir::new().unwrap();

    let logs = with_log_capture(|| async {
        let app = unwritable_app(&dir);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        r#"{"description":"Buy milk","dueDate":"2024-01-15","priority":"low"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // The task is still served from memory.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let tasks: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(tasks.as_array().unwrap().len(), 1);
    });

    assert!(
        logs.contains("[WARN]") && logs.contains("Failed to save tasks"),
        "save failure should be logged at WARN, got:\n{logs}"
    );
    assert!(logs.contains("persisted=false"), "got:\n{logs}");
}

#[test]
fn not_found_does_not_attempt_a_save() {
    let dir = TempDir::new().unwrap();

    let logs = with_log_capture(|| async {
        let response = unwritable_app(&dir)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/tasks/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    });

    assert!(!logs.contains("Failed to save tasks"), "got:\n{logs}");
}
