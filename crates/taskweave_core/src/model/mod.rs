//! Domain model for prioritized tasks.
//!
//! # Responsibility
//! - Define the task record and the draft/patch shapes that mutate it.
//! - Keep validation next to the data it protects.
//!
//! # Invariants
//! - A task is either active or completed, never both.
//! - Validation runs before any storage write.

pub mod task;
