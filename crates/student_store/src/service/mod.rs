//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Emit metadata-only log events for store mutations.

pub mod student_service;
