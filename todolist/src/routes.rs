//! HTTP route handlers.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `GET /` - Static index page
//! - `GET /api/tasks` - List tasks, optionally filtered and sorted
//! - `POST /api/tasks` - Create a task
//! - `POST /api/tasks/{id}/complete` - Mark a task complete
//! - `DELETE /api/tasks/{id}` - Delete a task
//!
//! Any other method on these paths is answered with `405 Method Not Allowed`.
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`], which carries the
//! [`TaskStore`] handle and the configuration. Mutations are persisted by the
//! store; a failed save is logged there and the request still succeeds, since
//! the in-memory change has already been applied.
//!
//! # Example
//!
//! ```rust,no_run
//! use todolist::config::Config;
//! use todolist::routes::{create_router, AppState};
//! use todolist::store::TaskStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("failed to load config");
//!     let store = TaskStore::open(config.tasks_file.clone()).await;
//!     let app = create_router(AppState::new(config, store));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::TodoError;
use crate::store::TaskStore;
use crate::types::{parse_due_date, Priority, SortBy, TaskFilter};

// ============================================================================
// Constants
// ============================================================================

/// Maximum accepted request body size (64 KiB).
const MAX_BODY_SIZE: usize = 64 * 1024;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
///
/// Cloned for each request; the clones share the same task list.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Handle to the task list.
    pub store: TaskStore,
}

impl AppState {
    /// Creates application state around an already opened store.
    #[must_use]
    pub fn new(config: Config, store: TaskStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_index))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", delete(delete_task))
        .route("/api/tasks/{id}/complete", post(complete_task))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Error Response Types
// ============================================================================

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

/// Maps a [`TodoError`] onto a status code and JSON body.
fn error_response(err: &TodoError) -> Response {
    let (status, code) = match err {
        TodoError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        TodoError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        TodoError::Io(_) | TodoError::Parse(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
        }
        TodoError::IdsExhausted(_) => (StatusCode::CONFLICT, "ids_exhausted"),
    };
    let body = ErrorResponse {
        error: err.to_string(),
        code,
    };
    (status, Json(body)).into_response()
}

/// Parses the `{id}` path segment.
///
/// IDs are unsigned, so a negative segment is malformed rather than unknown.
fn parse_task_id(raw: &str) -> Result<u32, TodoError> {
    raw.parse()
        .map_err(|_| TodoError::validation(format!("Invalid task ID '{raw}'")))
}

// ============================================================================
// GET / - Index Page
// ============================================================================

/// GET / - Serves the configured index page.
///
/// # Responses
///
/// - `200 OK` - File contents as `text/html`
/// - `404 Not Found` - The file does not exist
async fn get_index(State(state): State<AppState>) -> Response {
    match tokio::fs::read(&state.config.index_file).await {
        Ok(contents) => Html(contents).into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %state.config.index_file.display(), "Index file not found");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            error!(
                path = %state.config.index_file.display(),
                error = %err,
                "Failed to read index file"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// GET /api/tasks - List Tasks
// ============================================================================

/// Query parameters for listing tasks. All are optional.
#[derive(Debug, Default, Deserialize)]
pub struct ListQueryParams {
    /// `date`, `priority` or `none`.
    pub sort: Option<String>,

    /// `low`, `medium` or `high`.
    pub priority: Option<String>,

    /// `true` or `false`.
    pub completed: Option<String>,
}

impl ListQueryParams {
    /// Builds a [`TaskFilter`] from the query parameters.
    fn to_filter(&self) -> Result<TaskFilter, TodoError> {
        let mut filter = TaskFilter::new();

        if let Some(ref priority) = self.priority {
            filter = filter.with_priority(priority.parse::<Priority>()?);
        }

        if let Some(ref completed) = self.completed {
            let completed = completed.trim().parse::<bool>().map_err(|_| {
                TodoError::validation(format!(
                    "invalid completed value '{completed}', expected true or false"
                ))
            })?;
            filter = filter.with_completed(completed);
        }

        Ok(filter)
    }

    fn sort_by(&self) -> SortBy {
        self.sort.as_deref().map(SortBy::from).unwrap_or_default()
    }
}

/// GET /api/tasks - Returns tasks as a JSON array.
///
/// Without query parameters every task is returned in insertion order.
///
/// # Responses
///
/// - `200 OK` - JSON array of tasks
/// - `400 Bad Request` - Unknown `priority` or `completed` value
async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> Response {
    let filter = match params.to_filter() {
        Ok(filter) => filter,
        Err(err) => {
            debug!(error = %err, "Rejected list query");
            return error_response(&err);
        }
    };

    let mut tasks = state.store.filter_tasks(filter).await;
    params.sort_by().apply(&mut tasks);

    Json(tasks).into_response()
}

// ============================================================================
// POST /api/tasks - Create Task
// ============================================================================

/// Request body for task creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub description: String,

    /// `YYYY-MM-DD`.
    pub due_date: String,

    pub priority: Priority,
}

/// POST /api/tasks - Creates a task.
///
/// # Request Body
///
/// ```json
/// {"description": "Buy milk", "dueDate": "2024-01-15", "priority": "low"}
/// ```
///
/// # Responses
///
/// - `201 Created` - The created task
/// - `400 Bad Request` - Undecodable body or bad date format
/// - `409 Conflict` - No task ID left to assign
async fn create_task(State(state): State<AppState>, body: Bytes) -> Response {
    let request: CreateTaskRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            debug!(error = %err, "Failed to parse task payload");
            return error_response(&TodoError::validation(format!("invalid task body: {err}")));
        }
    };

    let due_date = match parse_due_date(&request.due_date) {
        Ok(due_date) => due_date,
        Err(err) => {
            debug!(due_date = %request.due_date, "Rejected due date");
            return error_response(&err);
        }
    };

    let saved = match state
        .store
        .add_task(request.description, due_date, request.priority)
        .await
    {
        Ok(saved) => saved,
        Err(err) => {
            warn!(error = %err, "Failed to add task");
            return error_response(&err);
        }
    };

    info!(task_id = saved.value.id, persisted = saved.is_persisted(), "Task created");
    (StatusCode::CREATED, Json(saved.value)).into_response()
}

// ============================================================================
// POST /api/tasks/{id}/complete - Complete Task
// ============================================================================

/// POST /api/tasks/{id}/complete - Marks a task complete.
///
/// # Responses
///
/// - `204 No Content` - Task marked complete
/// - `400 Bad Request` - Non-numeric ID
/// - `404 Not Found` - No task with that ID
async fn complete_task(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let id = match parse_task_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };

    match state.store.mark_complete(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            debug!(task_id = id, error = %err, "Complete failed");
            error_response(&err)
        }
    }
}

// ============================================================================
// DELETE /api/tasks/{id} - Delete Task
// ============================================================================

/// DELETE /api/tasks/{id} - Deletes a task.
///
/// # Responses
///
/// - `204 No Content` - Task deleted
/// - `400 Bad Request` - Non-numeric ID
/// - `404 Not Found` - No task with that ID
async fn delete_task(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let id = match parse_task_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };

    match state.store.delete_task(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            debug!(task_id = id, error = %err, "Delete failed");
            error_response(&err)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::store::TodoList;
    use crate::types::Task;

    /// Builds state backed by files inside `dir`.
    fn test_state(dir: &TempDir) -> AppState {
        let config = Config {
            tasks_file: dir.path().join("tasks.json"),
            port: 0,
            index_file: dir.path().join("index.html"),
        };
        let store = TaskStore::new(TodoList::new(config.tasks_file.clone()));
        AppState::new(config, store)
    }

    async fn seed(state: &AppState) {
        let date = |day| Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        state.store.add_task("low later", date(20), Priority::Low).await.unwrap();
        state.store.add_task("high soon", date(2), Priority::High).await.unwrap();
        state.store.add_task("medium", date(10), Priority::Medium).await.unwrap();
        state.store.mark_complete(2).await.unwrap();
    }

    async fn get_tasks(app: Router, uri: &str) -> (StatusCode, Vec<Task>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let tasks = if status == StatusCode::OK {
            serde_json::from_slice(&body).unwrap()
        } else {
            Vec::new()
        };
        (status, tasks)
    }

    fn ids(tasks: &[Task]) -> Vec<u32> {
        tasks.iter().map(|t| t.id).collect()
    }

    // ========================================================================
    // Index tests
    // ========================================================================

    #[tokio::test]
    async fn index_serves_html_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Todo</h1>").unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<h1>Todo</h1>");
    }

    #[tokio::test]
    async fn index_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/favicon.ico")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // ========================================================================
    // List query tests
    // ========================================================================

    #[tokio::test]
    async fn list_without_params_keeps_insertion_order() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        seed(&state).await;

        let (status, tasks) = get_tasks(create_router(state), "/api/tasks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&tasks), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn list_sorts_by_date_and_priority() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        seed(&state).await;
        let app = create_router(state);

        let (_, by_date) = get_tasks(app.clone(), "/api/tasks?sort=date").await;
        assert_eq!(ids(&by_date), vec![2, 3, 1]);

        let (_, by_priority) = get_tasks(app, "/api/tasks?sort=priority").await;
        assert_eq!(ids(&by_priority), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn list_filters_by_priority_and_completion() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        seed(&state).await;
        let app = create_router(state);

        let (_, open) = get_tasks(app.clone(), "/api/tasks?completed=false").await;
        assert_eq!(ids(&open), vec![1, 3]);

        let (_, done_high) =
            get_tasks(app, "/api/tasks?priority=high&completed=true").await;
        assert_eq!(ids(&done_high), vec![2]);
    }

    #[tokio::test]
    async fn list_rejects_bad_filter_values() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let (status, _) = get_tasks(app.clone(), "/api/tasks?priority=urgent").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_tasks(app, "/api/tasks?completed=maybe").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ========================================================================
    // Create tests
    // ========================================================================

    #[tokio::test]
    async fn create_returns_created_task() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        r#"{"description":"Write report","dueDate":"2024-02-01","priority":"high"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let task: Task = serde_json::from_slice(&body).unwrap();
        assert_eq!(task.id, 1);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(
            task.due_date,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn create_rejects_invalid_json() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks")
                    .body(Body::from("not valid json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "invalid_request");
    }

    #[tokio::test]
    async fn create_rejects_unknown_priority() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks")
                    .body(Body::from(
                        r#"{"description":"x","dueDate":"2024-01-15","priority":"urgent"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_oversized_body() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks")
                    .body(Body::from("x".repeat(MAX_BODY_SIZE + 1)))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn create_after_max_id_is_conflict() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("tasks.json"),
            format!(
                r#"[{{"id":{},"description":"last","due_date":"2024-01-01T00:00:00Z","priority":"low","completed":false}}]"#,
                u32::MAX
            ),
        )
        .unwrap();
        let config = Config {
            tasks_file: dir.path().join("tasks.json"),
            port: 0,
            index_file: dir.path().join("index.html"),
        };
        let store = TaskStore::load(config.tasks_file.clone()).await.unwrap();
        let app = create_router(AppState::new(config, store.clone()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks")
                    .body(Body::from(
                        r#"{"description":"x","dueDate":"2024-01-15","priority":"low"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "ids_exhausted");
        assert_eq!(store.snapshot().await.len(), 1);
    }

    // ========================================================================
    // Complete / delete tests
    // ========================================================================

    #[tokio::test]
    async fn complete_rejects_non_numeric_id() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks/abc/complete")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn complete_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks/7/complete")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "task with ID 7 not found");
        assert_eq!(error["code"], "not_found");
    }

    #[tokio::test]
    async fn delete_negative_id_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/tasks/-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/tasks/3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // ========================================================================
    // Method tests
    // ========================================================================

    #[tokio::test]
    async fn wrong_methods_are_not_allowed() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        for (method, uri) in [
            ("PUT", "/api/tasks"),
            ("DELETE", "/api/tasks"),
            ("GET", "/api/tasks/1"),
            ("POST", "/api/tasks/1"),
            ("GET", "/api/tasks/1/complete"),
            ("DELETE", "/api/tasks/1/complete"),
        ] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(
                response.status(),
                StatusCode::METHOD_NOT_ALLOWED,
                "{method} {uri}"
            );
        }
    }

    // ========================================================================
    // Helper tests
    // ========================================================================

    #[test]
    fn parse_task_id_accepts_unsigned_integers_only() {
        assert_eq!(parse_task_id("42").unwrap(), 42);
        assert_eq!(parse_task_id("+7").unwrap(), 7);
        assert!(parse_task_id("-1").is_err());
        assert!(parse_task_id("4x").is_err());
        assert!(parse_task_id("").is_err());
        assert!(parse_task_id("99999999999").is_err());
    }

    #[test]
    fn error_response_always_carries_a_code() {
        let json = serde_json::to_value(ErrorResponse {
            error: "test error".to_string(),
            code: "invalid_request",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"error": "test error", "code": "invalid_request"}));
    }

    #[test]
    fn list_params_default_to_unsorted_and_unfiltered() {
        let params = ListQueryParams::default();
        assert_eq!(params.sort_by(), SortBy::None);
        assert!(params.to_filter().unwrap().is_empty());
    }
}
