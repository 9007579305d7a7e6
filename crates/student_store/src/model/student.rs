//! Student domain model.
//!
//! # Responsibility
//! - Define the canonical record persisted by the student store.
//! - Own the field-level constraints (presence and length bounds).
//!
//! # Invariants
//! - `id` is assigned by storage and never reused for another student.
//! - `full_name` and `email` are non-blank and at most 120 characters once
//!   persisted.
//! - `email` is compared exactly; it is never trimmed or case-folded.
//!
//! # See also
//! - repo::student_repo for the uniqueness rule on `email`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use time::Date;

/// Store-assigned identifier of a student record.
pub type StudentId = i64;

/// Maximum number of characters accepted in `full_name`.
pub const FULL_NAME_MAX_LEN: usize = 120;
/// Maximum number of characters accepted in `email`.
pub const EMAIL_MAX_LEN: usize = 120;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Student record as seen by callers and storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// `None` until the first successful save.
    #[serde(default)]
    pub id: Option<StudentId>,
    pub full_name: String,
    /// Unique across the store, case-sensitive.
    pub email: String,
    #[serde(default, with = "iso_date::option")]
    pub birth_date: Option<Date>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Student {
    /// Creates an unsaved, active student with no birth date.
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            full_name: full_name.into(),
            email: email.into(),
            birth_date: None,
            active: true,
        }
    }

    pub fn with_birth_date(mut self, birth_date: Date) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns whether this value has never been saved.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Checks presence and length constraints.
    ///
    /// Fields are checked in declaration order and the first violation wins.
    /// Uniqueness of `email` is not checked here; it needs the store.
    ///
    /// # Errors
    /// - `MissingField` when `full_name` or `email` is empty or blank.
    /// - `LengthExceeded` when a field is longer than its bound.
    /// - `ForbiddenCharacter` when a field contains a NUL character.
    pub fn validate(&self) -> Result<(), ConstraintViolation> {
        check_required("full_name", &self.full_name, FULL_NAME_MAX_LEN)?;
        check_required("email", &self.email, EMAIL_MAX_LEN)?;
        Ok(())
    }
}

fn check_required(field: &'static str, value: &str, max: usize) -> Result<(), ConstraintViolation> {
    if value.trim().is_empty() {
        return Err(ConstraintViolation::MissingField { field });
    }

    // SQLite's length() stops at NUL, so the schema CHECK cannot see past it.
    if value.contains('\0') {
        return Err(ConstraintViolation::ForbiddenCharacter { field });
    }

    let actual = value.chars().count();
    if actual > max {
        return Err(ConstraintViolation::LengthExceeded { field, max, actual });
    }

    Ok(())
}

/// Rejected write, with the rule that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    MissingField {
        field: &'static str,
    },
    LengthExceeded {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    DuplicateEmail {
        email: String,
    },
    ForbiddenCharacter {
        field: &'static str,
    },
}

impl ConstraintViolation {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::LengthExceeded { .. } => "length_exceeded",
            Self::DuplicateEmail { .. } => "duplicate_email",
            Self::ForbiddenCharacter { .. } => "forbidden_character",
        }
    }
}

impl Display for ConstraintViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "{field} is required"),
            Self::LengthExceeded { field, max, actual } => write!(
                f,
                "{field} is too long: {actual} characters (max {max})"
            ),
            Self::DuplicateEmail { email } => write!(f, "email already in use: {email}"),
            Self::ForbiddenCharacter { field } => {
                write!(f, "{field} contains a NUL character")
            }
        }
    }
}

impl Error for ConstraintViolation {}
