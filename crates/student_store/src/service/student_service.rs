//! Student use-case service.
//!
//! # Responsibility
//! - Provide the store entry points callers hold on to.
//! - Delegate persistence to a `StudentRepository` and log the outcome of
//!   every mutation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or uniqueness checks.
//! - Log events carry ids and error codes only, never names or emails.

use crate::model::student::{Student, StudentId};
use crate::repo::student_repo::{RepoError, RepoResult, StudentRepository};
use log::{info, warn};

/// Use-case facade over a student repository.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Inserts or fully updates a student.
    ///
    /// Returns repository constraint and not-found errors unchanged.
    pub fn save(&self, student: &Student) -> RepoResult<Student> {
        let result = self.repo.save(student);
        log_save(student, &result);
        result
    }

    /// Saves and returns the row as read back after commit.
    pub fn save_and_verify(&self, student: &Student) -> RepoResult<Student> {
        let result = self.repo.save_and_verify(student);
        log_save(student, &result);
        result
    }

    pub fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.repo.find_by_id(id)
    }

    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        self.repo.find_by_email(email)
    }

    pub fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        self.repo.exists_by_email(email)
    }

    pub fn find_all(&self) -> RepoResult<Vec<Student>> {
        self.repo.find_all()
    }

    pub fn count(&self) -> RepoResult<u64> {
        self.repo.count()
    }

    /// Deletes a student by id. Deleting an unknown id is not an error.
    pub fn delete_by_id(&self, id: StudentId) -> RepoResult<()> {
        match self.repo.delete_by_id(id) {
            Ok(removed) => {
                info!(
                    "event=student_delete module=service status=ok id={} removed={}",
                    id, removed
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=student_delete module=service status=error id={} error={}",
                    id, err
                );
                Err(err)
            }
        }
    }
}

fn log_save(input: &Student, result: &RepoResult<Student>) {
    let op = if input.is_new() { "insert" } else { "update" };
    match result {
        Ok(saved) => info!(
            "event=student_save module=service status=ok op={} id={}",
            op,
            saved.id.unwrap_or_default()
        ),
        Err(RepoError::Constraint(violation)) => warn!(
            "event=student_save module=service status=error op={} error_code={}",
            op,
            violation.code()
        ),
        Err(RepoError::NotFound(id)) => warn!(
            "event=student_save module=service status=error op={} error_code=not_found id={}",
            op, id
        ),
        Err(err) => warn!(
            "event=student_save module=service status=error op={} error={}",
            op, err
        ),
    }
}
