//! Domain model for the student store.
//!
//! # Responsibility
//! - Define the record shape shared by repository and service layers.
//! - Keep field-level validation next to the data it guards.
//!
//! # Invariants
//! - A student is identified by a store-assigned `StudentId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod student;
