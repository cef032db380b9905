//! Typed queries per entity. Every function is generic over the connection so the
//! same query runs against the pool or inside an open transaction.

pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod users;

use sea_orm::{DbErr, SqlErr};

/// True when the error is a unique-constraint violation.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
