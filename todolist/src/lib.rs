//! Todolist - single-user task list manager.
//!
//! This crate provides a file-backed task list with two front-ends:
//! - An HTTP/JSON API served with axum
//! - An interactive menu on the terminal
//!
//! # Architecture
//!
//! Both front-ends share one [`store::TaskStore`], a mutex-guarded
//! [`store::TodoList`] that rewrites its JSON file after every change.

pub mod config;
pub mod console;
pub mod display;
pub mod error;
pub mod routes;
pub mod store;
pub mod types;
