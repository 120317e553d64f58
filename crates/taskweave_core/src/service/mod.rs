//! Use-case services over the persistence adapter.
//!
//! # Responsibility
//! - Orchestrate task lifecycle transitions above the storage layer.
//! - Keep in-memory state in an explicit, caller-owned board.
//!
//! # Invariants
//! - Services stay storage-agnostic and never assume a write is synchronous.

pub mod board;
pub mod task_service;
