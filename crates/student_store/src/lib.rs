//! Persistence layer for student records.
//!
//! Enforces required fields, length bounds and email uniqueness at the
//! storage boundary, on top of SQLite.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbOptions};
pub use logging::{default_log_level, flush_logs, init_logging, logging_status};
pub use model::student::{
    ConstraintViolation, Student, StudentId, EMAIL_MAX_LEN, FULL_NAME_MAX_LEN,
};
pub use repo::student_repo::{RepoError, RepoResult, SqliteStudentRepository, StudentRepository};
pub use service::student_service::StudentService;
