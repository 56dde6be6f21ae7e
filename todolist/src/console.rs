//! Interactive menu-driven prompt.
//!
//! [`Console`] reads one line per answer from any [`AsyncBufRead`] and writes
//! prompts to any [`AsyncWrite`], so the binary can drive it with stdin/stdout
//! and tests can drive it with byte buffers. The menu repeats until the user
//! picks "Exit" or input ends.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::display::{render_tasks, NO_MATCHING_TASKS, NO_TASKS};
use crate::error::TodoError;
use crate::store::{Saved, TaskStore};
use crate::types::{parse_due_date, Priority, SortBy, TaskFilter};

const MENU: &str = "\nTodo List Application
1. Add Task
2. List Tasks
3. Mark Task as Complete
4. Delete Task
5. Filter Tasks
6. Exit
Choose an option: ";

/// Whether the menu loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
    Closed,
}

/// Why [`Console::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuExit {
    /// The user picked "Exit".
    Chosen,
    /// Input ended, possibly in the middle of a command.
    InputClosed,
}

/// Menu loop over a shared [`TaskStore`].
pub struct Console<R, W> {
    store: TaskStore,
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(store: TaskStore, input: R, output: W) -> Self {
        Self {
            store,
            input,
            output,
        }
    }

    /// Gives back the output sink, mostly for inspecting it in tests.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs the menu until "Exit" is chosen or input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error only when reading input or writing output fails.
    /// Task errors are reported to the user and the loop continues.
    pub async fn run(&mut self) -> io::Result<MenuExit> {
        loop {
            let Some(choice) = self.prompt(MENU).await? else {
                debug!("Input closed, leaving menu");
                return Ok(MenuExit::InputClosed);
            };

            let flow = match choice.as_str() {
                "1" => self.add_task().await?,
                "2" => self.list_tasks().await?,
                "3" => self.mark_complete().await?,
                "4" => self.delete_task().await?,
                "5" => self.filter_tasks().await?,
                "6" => {
                    self.say("Goodbye!").await?;
                    Flow::Exit
                }
                _ => {
                    self.say("Invalid option. Please try again.").await?;
                    Flow::Continue
                }
            };

            match flow {
                Flow::Continue => {}
                Flow::Exit => return Ok(MenuExit::Chosen),
                Flow::Closed => {
                    debug!("Input closed mid-command, leaving menu");
                    return Ok(MenuExit::InputClosed);
                }
            }
        }
    }

    async fn add_task(&mut self) -> io::Result<Flow> {
        let Some(description) = self.prompt("Enter task description: ").await? else {
            return Ok(Flow::Closed);
        };
        let Some(date) = self.prompt("Enter due date (YYYY-MM-DD): ").await? else {
            return Ok(Flow::Closed);
        };
        let Some(priority) = self.prompt("Enter priority (low/medium/high): ").await? else {
            return Ok(Flow::Closed);
        };

        let parsed = parse_due_date(&date).and_then(|due_date| {
            priority
                .parse::<Priority>()
                .map(|priority| (due_date, priority))
        });
        let (due_date, priority) = match parsed {
            Ok(values) => values,
            Err(err) => {
                self.say(&format!("Error: {err}")).await?;
                return Ok(Flow::Continue);
            }
        };

        let saved = match self.store.add_task(description, due_date, priority).await {
            Ok(saved) => saved,
            Err(err) => {
                self.say(&format!("Error: {err}")).await?;
                return Ok(Flow::Continue);
            }
        };
        self.report_save(&saved).await?;
        self.say("Task added successfully!").await?;
        Ok(Flow::Continue)
    }

    async fn list_tasks(&mut self) -> io::Result<Flow> {
        let Some(sort) = self.prompt("Sort by (date/priority/none): ").await? else {
            return Ok(Flow::Closed);
        };

        let tasks = self.store.list_tasks(SortBy::from(sort.as_str())).await;
        self.write(&render_tasks("Tasks", &tasks, NO_TASKS)).await?;
        Ok(Flow::Continue)
    }

    async fn mark_complete(&mut self) -> io::Result<Flow> {
        let Some(id) = self.prompt_id("Enter task ID to mark as complete: ").await? else {
            return Ok(Flow::Closed);
        };

        match id {
            Some(id) => match self.store.mark_complete(id).await {
                Ok(saved) => {
                    self.report_save(&saved).await?;
                    self.say("Task marked as complete!").await?;
                }
                Err(err) => self.say(&format!("Error: {err}")).await?,
            },
            None => self.say("Invalid task ID").await?,
        }
        Ok(Flow::Continue)
    }

    async fn delete_task(&mut self) -> io::Result<Flow> {
        let Some(id) = self.prompt_id("Enter task ID to delete: ").await? else {
            return Ok(Flow::Closed);
        };

        match id {
            Some(id) => match self.store.delete_task(id).await {
                Ok(saved) => {
                    self.report_save(&saved).await?;
                    self.say("Task deleted successfully!").await?;
                }
                Err(err) => self.say(&format!("Error: {err}")).await?,
            },
            None => self.say("Invalid task ID").await?,
        }
        Ok(Flow::Continue)
    }

    async fn filter_tasks(&mut self) -> io::Result<Flow> {
        let Some(priority) = self
            .prompt("Filter by priority (low/medium/high/all): ")
            .await?
        else {
            return Ok(Flow::Closed);
        };
        let Some(status) = self
            .prompt("Filter by status (completed/incomplete/all): ")
            .await?
        else {
            return Ok(Flow::Closed);
        };

        let filter = match parse_filter(&priority, &status) {
            Ok(filter) => filter,
            Err(err) => {
                self.say(&format!("Error: {err}")).await?;
                return Ok(Flow::Continue);
            }
        };

        let tasks = self.store.filter_tasks(filter).await;
        self.write(&render_tasks("Filtered Tasks", &tasks, NO_MATCHING_TASKS))
            .await?;
        Ok(Flow::Continue)
    }

    /// Prompts for a task ID. The outer `None` means input ended, the inner
    /// `None` means the answer was not a number.
    async fn prompt_id(&mut self, text: &str) -> io::Result<Option<Option<u32>>> {
        Ok(self
            .prompt(text)
            .await?
            .map(|answer| answer.parse::<u32>().ok()))
    }

    async fn report_save<T>(&mut self, saved: &Saved<T>) -> io::Result<()> {
        if let Some(err) = &saved.save_error {
            self.say(&format!("Warning: could not save tasks: {err}"))
                .await?;
        }
        Ok(())
    }

    /// Writes `text` and reads one trimmed line. `None` at end of input.
    async fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        self.write(text).await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn say(&mut self, line: &str) -> io::Result<()> {
        self.write(line).await?;
        self.write("\n").await
    }

    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await
    }
}

/// Builds a filter from the two filter-menu answers.
///
/// `all` (or an empty answer) leaves a field unset. Status accepts
/// `completed` or `incomplete`.
fn parse_filter(priority: &str, status: &str) -> Result<TaskFilter, TodoError> {
    let mut filter = TaskFilter::new();

    let priority = priority.trim();
    if !priority.is_empty() && !priority.eq_ignore_ascii_case("all") {
        filter = filter.with_priority(priority.parse()?);
    }

    match status.trim().to_ascii_lowercase().as_str() {
        "" | "all" => {}
        "completed" => filter = filter.with_completed(true),
        "incomplete" => filter = filter.with_completed(false),
        other => {
            return Err(TodoError::validation(format!(
                "unknown status '{other}', expected completed, incomplete or all"
            )))
        }
    }

    Ok(filter)
}
