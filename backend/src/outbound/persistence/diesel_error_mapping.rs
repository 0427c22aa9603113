//! Diesel error translation shared by the carpark repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{CarparkRepositoryError, InterestRepositoryError};

use super::pool::PoolError;

/// Coarse classification of a Diesel failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    Connection(String),
    CheckViolation(String),
    /// Deadlock or serialization failure; the transaction may be retried.
    LockConflict(String),
    Query(String),
}

/// PostgreSQL reports 40P01 with this message; diesel-async only surfaces
/// 40001 as a dedicated kind.
const DEADLOCK_MESSAGE: &str = "deadlock detected";

/// Whether the failed transaction lost a lock race and can be re-run.
pub(crate) fn is_lock_conflict(error: &DieselError) -> bool {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => true,
        DieselError::DatabaseError(_, info) => info.message().starts_with(DEADLOCK_MESSAGE),
        _ => false,
    }
}

pub(crate) fn classify_diesel_error(error: &DieselError, operation: &str) -> DieselFailure {
    if is_lock_conflict(error) {
        debug!(error = %error, %operation, "diesel transaction lost a lock race");
        return DieselFailure::LockConflict(format!("{operation}: {error}"));
    }
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
            match kind {
                DatabaseErrorKind::ClosedConnection => {
                    DieselFailure::Connection(format!("{operation}: connection closed"))
                }
                DatabaseErrorKind::CheckViolation => DieselFailure::CheckViolation(format!(
                    "{operation}: {}",
                    info.constraint_name().unwrap_or("check constraint")
                )),
                _ => DieselFailure::Query(format!("{operation}: {}", info.message())),
            }
        }
        other => {
            debug!(error = %other, %operation, "diesel operation failed");
            DieselFailure::Query(format!("{operation}: {other}"))
        }
    }
}

pub(crate) fn carpark_pool_error(error: PoolError) -> CarparkRepositoryError {
    CarparkRepositoryError::connection(error.into_message())
}

pub(crate) fn carpark_diesel_error(error: DieselError, operation: &str) -> CarparkRepositoryError {
    match classify_diesel_error(&error, operation) {
        DieselFailure::Connection(message) => CarparkRepositoryError::connection(message),
        DieselFailure::CheckViolation(message)
        | DieselFailure::LockConflict(message)
        | DieselFailure::Query(message) => CarparkRepositoryError::query(message),
    }
}

pub(crate) fn interest_pool_error(error: PoolError) -> InterestRepositoryError {
    InterestRepositoryError::connection(error.into_message())
}

pub(crate) fn interest_diesel_error(error: DieselError, operation: &str) -> InterestRepositoryError {
    match classify_diesel_error(&error, operation) {
        DieselFailure::Connection(message) => InterestRepositoryError::connection(message),
        DieselFailure::CheckViolation(message) => {
            InterestRepositoryError::invariant_violation(message)
        }
        DieselFailure::LockConflict(message) => InterestRepositoryError::contended(message),
        DieselFailure::Query(message) => InterestRepositoryError::query(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn not_found_is_a_query_failure() {
        let failure = classify_diesel_error(&DieselError::NotFound, "load carparks");
        assert!(matches!(failure, DieselFailure::Query(message) if message.starts_with("load carparks")));
    }

    #[rstest]
    #[case::deadlock(DatabaseErrorKind::Unknown, "deadlock detected")]
    #[case::serialization(
        DatabaseErrorKind::SerializationFailure,
        "could not serialize access due to concurrent update"
    )]
    fn lock_races_are_retryable(#[case] kind: DatabaseErrorKind, #[case] message: &str) {
        let error = DieselError::DatabaseError(kind, Box::new(message.to_owned()));

        assert!(is_lock_conflict(&error));
        assert!(matches!(
            interest_diesel_error(error, "toggle interest"),
            InterestRepositoryError::Contended { .. }
        ));
    }

    #[rstest]
    fn other_database_errors_are_not_retried() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::Unknown,
            Box::new("relation \"carparks\" does not exist".to_owned()),
        );

        assert!(!is_lock_conflict(&error));
        assert!(matches!(
            interest_diesel_error(error, "toggle interest"),
            InterestRepositoryError::Query { .. }
        ));
    }

    #[rstest]
    fn pool_errors_map_to_connection_variants() {
        assert_eq!(
            carpark_pool_error(PoolError::checkout("timed out")),
            CarparkRepositoryError::connection("timed out")
        );
        assert_eq!(
            interest_pool_error(PoolError::checkout("timed out")),
            InterestRepositoryError::connection("timed out")
        );
    }
}
