//! File-backed task list.
//!
//! [`TodoList`] owns the ordered task sequence and knows how to load and save
//! it. [`TaskStore`] wraps one list behind a mutex and is the handle handed to
//! the HTTP routes and the interactive prompt. Every mutation through the store
//! runs mutate-then-save inside a single critical section.
//!
//! # Example
//!
//! ```rust,no_run
//! use todolist::store::TaskStore;
//! use todolist::types::{parse_due_date, Priority, SortBy};
//!
//! #[tokio::main]
//! async fn main() -> todolist::error::Result<()> {
//!     let store = TaskStore::load("tasks.json").await?;
//!     let saved = store
//!         .add_task("Buy milk", parse_due_date("2024-01-15")?, Priority::Low)
//!         .await?;
//!     assert_eq!(saved.value.description, "Buy milk");
//!
//!     for task in store.list_tasks(SortBy::Date).await {
//!         println!("{} {}", task.id, task.description);
//!     }
//!     Ok(())
//! }
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, TodoError};
use crate::types::{Priority, SortBy, Task, TaskFilter};

/// Ordered tasks plus the file they persist to.
#[derive(Debug, Clone)]
pub struct TodoList {
    tasks: Vec<Task>,
    path: PathBuf,
}

impl TodoList {
    /// Creates an empty list bound to `path`. Nothing is read or written.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            tasks: Vec::new(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// ID the next added task will receive: one past the highest ID in use.
    ///
    /// Deleting the highest task makes its ID available again.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::IdsExhausted`] when the highest ID is `u32::MAX`.
    pub fn next_id(&self) -> Result<u32> {
        match self.tasks.iter().map(|task| task.id).max() {
            None => Ok(1),
            Some(max) => max.checked_add(1).ok_or(TodoError::IdsExhausted(max)),
        }
    }

    /// Appends a new incomplete task and returns a copy of it.
    ///
    /// Only memory is touched; call [`save`](Self::save) to persist.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::IdsExhausted`] and adds nothing when no ID is left.
    pub fn add_task(
        &mut self,
        description: impl Into<String>,
        due_date: DateTime<Utc>,
        priority: Priority,
    ) -> Result<Task> {
        let task = Task::new(self.next_id()?, description, due_date, priority);
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Returns a copy of the tasks in the requested order.
    pub fn list_tasks(&self, sort_by: SortBy) -> Vec<Task> {
        let mut tasks = self.tasks.clone();
        sort_by.apply(&mut tasks);
        tasks
    }

    /// Marks the task with `id` as completed.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] and leaves the list untouched when no
    /// task has that ID.
    pub fn mark_complete(&mut self, id: u32) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(TodoError::NotFound(id))?;
        task.completed = true;
        Ok(())
    }

    /// Removes the first task with `id`, keeping the order of the rest.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] when no task has that ID.
    pub fn delete_task(&mut self, id: u32) -> Result<Task> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(TodoError::NotFound(id))?;
        Ok(self.tasks.remove(index))
    }

    /// Returns the tasks matching `filter` in list order.
    pub fn filter_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    /// Writes the whole list to the backing file as indented JSON.
    ///
    /// The data is written to a temporary file next to the target and then
    /// renamed over it. On Unix an existing file keeps its mode and a new one
    /// is created `0644`.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Io`] if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            // Temp files are created 0600; keep the target's mode, or 0644 for a new file.
            let mode = fs::metadata(&self.path).map_or(0o644, |meta| meta.permissions().mode());
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(mode & 0o7777))?;
        }
        serde_json::to_writer_pretty(&mut tmp, &self.tasks)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;

        debug!(path = %self.path.display(), count = self.tasks.len(), "Tasks saved");
        Ok(())
    }

    /// Replaces the in-memory list with the contents of the backing file.
    ///
    /// A missing file yields an empty list. On error the list is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Parse`] for malformed JSON and [`TodoError::Io`]
    /// for any other read failure.
    pub fn load(&mut self) -> Result<()> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Task file does not exist yet");
                self.tasks.clear();
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.tasks = serde_json::from_slice(&data)?;
        Ok(())
    }
}

/// Result of a store mutation.
///
/// The mutation itself succeeded; `save_error` holds the persistence failure,
/// if any, in which case memory and disk disagree until the next save.
#[derive(Debug)]
pub struct Saved<T> {
    pub value: T,
    pub save_error: Option<TodoError>,
}

impl<T> Saved<T> {
    /// Returns `true` if the change reached the backing file.
    pub fn is_persisted(&self) -> bool {
        self.save_error.is_none()
    }
}

/// Shared handle to a single [`TodoList`].
///
/// Cloning is cheap; all clones see the same list.
#[derive(Debug, Clone)]
pub struct TaskStore {
    inner: Arc<Mutex<TodoList>>,
}

impl TaskStore {
    /// Wraps an already constructed list.
    pub fn new(list: TodoList) -> Self {
        Self {
            inner: Arc::new(Mutex::new(list)),
        }
    }

    /// Creates a store and loads `path` into it.
    ///
    /// # Errors
    ///
    /// Propagates [`TodoList::load`] failures.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut list = TodoList::new(path);
        list.load()?;
        info!(path = %list.path().display(), count = list.len(), "Tasks loaded");
        Ok(Self::new(list))
    }

    /// Like [`load`](Self::load), but a load failure is logged and the store
    /// starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(path.clone()).await {
            Ok(store) => store,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Error loading tasks, starting empty");
                Self::new(TodoList::new(path))
            }
        }
    }

    /// Adds a task and persists the list.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::IdsExhausted`] without saving when no ID is left.
    pub async fn add_task(
        &self,
        description: impl Into<String>,
        due_date: DateTime<Utc>,
        priority: Priority,
    ) -> Result<Saved<Task>> {
        let mut list = self.inner.lock().await;
        let task = list.add_task(description, due_date, priority)?;
        info!(task_id = task.id, priority = %task.priority, "Task added");
        Ok(Self::persist(&list, task))
    }

    /// Marks a task complete and persists the list.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] without saving when the ID is unknown.
    pub async fn mark_complete(&self, id: u32) -> Result<Saved<()>> {
        let mut list = self.inner.lock().await;
        list.mark_complete(id)?;
        info!(task_id = id, "Task marked complete");
        Ok(Self::persist(&list, ()))
    }

    /// Deletes a task and persists the list.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] without saving when the ID is unknown.
    pub async fn delete_task(&self, id: u32) -> Result<Saved<Task>> {
        let mut list = self.inner.lock().await;
        let task = list.delete_task(id)?;
        info!(task_id = id, "Task deleted");
        Ok(Self::persist(&list, task))
    }

    pub async fn list_tasks(&self, sort_by: SortBy) -> Vec<Task> {
        self.inner.lock().await.list_tasks(sort_by)
    }

    pub async fn filter_tasks(&self, filter: TaskFilter) -> Vec<Task> {
        self.inner.lock().await.filter_tasks(&filter)
    }

    /// Copy of the list in insertion order.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.inner.lock().await.tasks().to_vec()
    }

    fn persist<T>(list: &TodoList, value: T) -> Saved<T> {
        let save_error = list.save().err();
        if let Some(err) = &save_error {
            warn!(path = %list.path().display(), error = %err, "Failed to save tasks");
        }
        Saved { value, save_error }
    }
}
