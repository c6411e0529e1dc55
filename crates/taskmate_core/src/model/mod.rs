//! Domain model for the task list and theme.
//!
//! # Responsibility
//! - Define the persisted task record and the theme mode/palette pair.
//! - Keep validation rules next to the data they protect.
//!
//! # Invariants
//! - Every task is identified by a stable, unique `TaskId`.
//! - Deletion is a hard removal from the ordered collection.

pub mod task;
pub mod theme;
