use student_store::db::open_db_in_memory;
use student_store::{
    ConstraintViolation, RepoError, SqliteStudentRepository, Student, StudentRepository,
    StudentService,
};

fn violation(err: RepoError) -> ConstraintViolation {
    match err {
        RepoError::Constraint(violation) => violation,
        other => panic!("expected constraint violation, got: {other}"),
    }
}

#[test]
fn duplicate_email_is_rejected_and_first_record_survives() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.save(&Student::new("First", "dup@mail.com")).unwrap();

    let err = repo
        .save_and_verify(&Student::new("Second", "dup@mail.com"))
        .unwrap_err();
    assert_eq!(
        violation(err),
        ConstraintViolation::DuplicateEmail {
            email: "dup@mail.com".to_string()
        }
    );

    assert_eq!(repo.count().unwrap(), 1);
    let stored = repo.find_by_email("dup@mail.com").unwrap().unwrap();
    assert_eq!(stored.full_name, "First");
}

#[test]
fn update_cannot_take_another_students_email() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.save(&Student::new("Owner", "taken@mail.com")).unwrap();
    let mut other = repo.save(&Student::new("Other", "other@mail.com")).unwrap();

    other.email = "taken@mail.com".to_string();
    other.full_name = "Renamed".to_string();
    let err = repo.save(&other).unwrap_err();
    assert!(matches!(
        violation(err),
        ConstraintViolation::DuplicateEmail { .. }
    ));

    let unchanged = repo.find_by_id(other.id.unwrap()).unwrap().unwrap();
    assert_eq!(unchanged.email, "other@mail.com");
    assert_eq!(unchanged.full_name, "Other");
}

#[test]
fn update_keeping_own_email_is_not_a_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let mut saved = repo.save(&Student::new("Same", "same@mail.com")).unwrap();
    saved.full_name = "Same Again".to_string();

    assert!(repo.save(&saved).is_ok());
}

#[test]
fn email_uniqueness_is_case_sensitive() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.save(&Student::new("Lower", "case@test.com")).unwrap();

    assert!(repo.find_by_email("CASE@test.com").unwrap().is_none());
    assert!(!repo.exists_by_email("CASE@test.com").unwrap());
    assert!(repo.find_by_email(" case@test.com").unwrap().is_none());

    repo.save(&Student::new("Upper", "CASE@test.com")).unwrap();
    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn missing_required_fields_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let err = repo.save(&Student::new("", "noname@mail.com")).unwrap_err();
    assert_eq!(
        violation(err),
        ConstraintViolation::MissingField { field: "full_name" }
    );

    let err = repo.save(&Student::new("No Email", "")).unwrap_err();
    assert_eq!(
        violation(err),
        ConstraintViolation::MissingField { field: "email" }
    );

    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn over_length_fields_are_rejected_without_truncation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let long_email = format!("{}@mail.com", "a".repeat(121));
    assert_eq!(long_email.len(), 130);
    let err = repo.save(&Student::new("Long Email", long_email)).unwrap_err();
    assert_eq!(
        violation(err),
        ConstraintViolation::LengthExceeded {
            field: "email",
            max: 120,
            actual: 130,
        }
    );

    let err = repo
        .save(&Student::new("n".repeat(200), "longname@mail.com"))
        .unwrap_err();
    assert_eq!(
        violation(err),
        ConstraintViolation::LengthExceeded {
            field: "full_name",
            max: 120,
            actual: 200,
        }
    );

    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn invalid_update_leaves_stored_record_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let saved = repo.save(&Student::new("Stable", "stable@mail.com")).unwrap();
    let mut broken = saved.clone();
    broken.full_name = "x".repeat(121);

    assert!(repo.save(&broken).is_err());
    assert_eq!(repo.find_by_id(saved.id.unwrap()).unwrap(), Some(saved));
}

#[test]
fn save_with_unknown_or_deleted_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let mut ghost = Student::new("Ghost", "ghost@mail.com");
    ghost.id = Some(99);
    assert!(matches!(repo.save(&ghost).unwrap_err(), RepoError::NotFound(99)));

    let saved = repo.save(&Student::new("Gone", "gone@mail.com")).unwrap();
    let id = saved.id.unwrap();
    repo.delete_by_id(id).unwrap();

    let err = repo.save(&saved).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
    assert!(repo.find_by_id(id).unwrap().is_none());
}

#[test]
fn deleted_email_can_be_registered_again() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let saved = repo.save(&Student::new("Before", "reuse@mail.com")).unwrap();
    repo.delete_by_id(saved.id.unwrap()).unwrap();

    let again = repo.save(&Student::new("After", "reuse@mail.com")).unwrap();
    assert_ne!(again.id, saved.id);
}

#[test]
fn service_surfaces_violations_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let service = StudentService::new(SqliteStudentRepository::try_new(&conn).unwrap());

    service.save(&Student::new("First", "svc-dup@mail.com")).unwrap();
    let err = service
        .save_and_verify(&Student::new("Second", "svc-dup@mail.com"))
        .unwrap_err();

    assert_eq!(err.constraint().map(|v| v.code()), Some("duplicate_email"));
}

#[test]
fn nul_character_is_a_constraint_violation_not_a_db_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let err = repo.save(&Student::new("Nul", "\0a@mail.com")).unwrap_err();
    assert_eq!(
        violation(err),
        ConstraintViolation::ForbiddenCharacter { field: "email" }
    );

    let err = repo
        .save(&Student::new("Nul\0Name", "nulname@mail.com"))
        .unwrap_err();
    assert_eq!(
        violation(err),
        ConstraintViolation::ForbiddenCharacter { field: "full_name" }
    );

    assert_eq!(repo.count().unwrap(), 0);
}
