//! Student repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert-or-update, lookup and delete APIs over `students`.
//! - Enforce presence, length and email-uniqueness rules at the storage
//!   boundary.
//!
//! # Invariants
//! - Write paths call `Student::validate()` before any SQL mutation.
//! - The email uniqueness check and the write it guards run inside one
//!   `BEGIN IMMEDIATE` transaction, so concurrent writers are serialized.
//! - A failed write leaves no visible change.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::student::{ConstraintViolation, Student, StudentId};
use rusqlite::{params, Connection, ErrorCode, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use time::macros::format_description;
use time::Date;

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    full_name,
    email,
    birth_date,
    active
FROM students";

const REQUIRED_COLUMNS: [&str; 5] = ["id", "full_name", "email", "birth_date", "active"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for student persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Constraint(ConstraintViolation),
    Db(DbError),
    /// Update addressed an id that is not stored.
    NotFound(StudentId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns the violated constraint, if this is a constraint error.
    pub fn constraint(&self) -> Option<&ConstraintViolation> {
        match self {
            Self::Constraint(violation) => Some(violation),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constraint(err) => write!(f, "constraint violation: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind required {expected_version}; open it with db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Constraint(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConstraintViolation> for RepoError {
    fn from(value: ConstraintViolation) -> Self {
        Self::Constraint(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for student records.
pub trait StudentRepository {
    /// Inserts a new student (no id) or fully replaces a stored one (id set).
    fn save(&self, student: &Student) -> RepoResult<Student>;
    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>>;
    /// Exact, case-sensitive email lookup.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>>;
    fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
    /// Returns every student in insertion order.
    fn find_all(&self) -> RepoResult<Vec<Student>>;
    fn count(&self) -> RepoResult<u64>;
    /// Removes a student; returns `false` when nothing was stored under `id`.
    fn delete_by_id(&self, id: StudentId) -> RepoResult<bool>;

    /// Saves and reads the committed row back before returning.
    ///
    /// Constraint violations surface from this call, never later.
    fn save_and_verify(&self, student: &Student) -> RepoResult<Student> {
        let saved = self.save(student)?;
        let id = saved
            .id
            .ok_or_else(|| RepoError::InvalidData("saved student has no id".to_string()))?;
        self.find_by_id(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("student {id} is not visible after commit"))
        })
    }
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not match.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_student_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn begin_write(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn save(&self, student: &Student) -> RepoResult<Student> {
        student.validate()?;

        let tx = self.begin_write()?;
        let id = match student.id {
            None => insert_in_tx(&tx, student)?,
            Some(id) => {
                update_in_tx(&tx, id, student)?;
                id
            }
        };
        tx.commit()?;

        Ok(Student {
            id: Some(id),
            ..student.clone()
        })
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_student_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_student_row(row)?)),
            None => Ok(None),
        }
    }

    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        email_taken(self.conn, email, None)
    }

    fn find_all(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn count(&self) -> RepoResult<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))?;
        u64::try_from(total)
            .map_err(|_| RepoError::InvalidData(format!("negative student count {total}")))
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<bool> {
        let tx = self.begin_write()?;
        let changed = tx.execute("DELETE FROM students WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(changed > 0)
    }
}

fn insert_in_tx(tx: &Transaction<'_>, student: &Student) -> RepoResult<StudentId> {
    if email_taken(tx, &student.email, None)? {
        return Err(duplicate_email(&student.email));
    }

    tx.execute(
        "INSERT INTO students (
            full_name,
            email,
            birth_date,
            active
        ) VALUES (?1, ?2, ?3, ?4);",
        params![
            student.full_name.as_str(),
            student.email.as_str(),
            student.birth_date.map(format_date).transpose()?,
            student.active,
        ],
    )
    .map_err(|err| map_write_error(err, &student.email))?;

    Ok(tx.last_insert_rowid())
}

fn update_in_tx(tx: &Transaction<'_>, id: StudentId, student: &Student) -> RepoResult<()> {
    if !student_exists(tx, id)? {
        return Err(RepoError::NotFound(id));
    }
    if email_taken(tx, &student.email, Some(id))? {
        return Err(duplicate_email(&student.email));
    }

    tx.execute(
        "UPDATE students
         SET
            full_name = ?1,
            email = ?2,
            birth_date = ?3,
            active = ?4,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?5;",
        params![
            student.full_name.as_str(),
            student.email.as_str(),
            student.birth_date.map(format_date).transpose()?,
            student.active,
            id,
        ],
    )
    .map_err(|err| map_write_error(err, &student.email))?;

    Ok(())
}

/// Exact-match email probe, optionally ignoring the row being updated.
fn email_taken(conn: &Connection, email: &str, exclude: Option<StudentId>) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM students
            WHERE email = ?1
              AND (?2 IS NULL OR id <> ?2)
        );",
        params![email, exclude],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn student_exists(conn: &Connection, id: StudentId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn duplicate_email(email: &str) -> RepoError {
    RepoError::Constraint(ConstraintViolation::DuplicateEmail {
        email: email.to_string(),
    })
}

// The unique index is the last line of defense if a writer bypassed the
// immediate transaction.
fn map_write_error(err: rusqlite::Error, email: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation
                && message.contains("students.email") =>
        {
            duplicate_email(email)
        }
        _ => err.into(),
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id: StudentId = row.get("id")?;

    let birth_date = match row.get::<_, Option<String>>("birth_date")? {
        Some(value) => Some(parse_date(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid birth date `{value}` in students.birth_date for id {id}"
            ))
        })?),
        None => None,
    };

    let active = match row.get::<_, i64>("active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid active value `{other}` in students.active for id {id}"
            )));
        }
    };

    let student = Student {
        id: Some(id),
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        birth_date,
        active,
    };
    student
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("student {id}: {err}")))?;
    Ok(student)
}

fn format_date(date: Date) -> RepoResult<String> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|err| RepoError::InvalidData(format!("cannot format birth date {date}: {err}")))
}

fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]")).ok()
}

fn ensure_student_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "students")? {
        return Err(RepoError::MissingRequiredTable("students"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "students", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "students",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
