//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for student records.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Student::validate()` before persistence.
//! - Absence on reads is `Ok(None)`; constraint failures are
//!   `RepoError::Constraint`.

pub mod student_repo;
