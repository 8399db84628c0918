//! Error types for the Tally domain layer.
//!
//! This module defines a small hierarchy of error types:
//!
//! - [`DomainError`] - Request validation and domain rule violations
//! - [`StorageError`] - Database/repository errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Request validation failures and domain rule violations.
///
/// `InvalidCursor`, `InvalidQuery` and `ValueOutOfRange` are client errors:
/// they are raised before any store access. `Storage` wraps everything that
/// went wrong once the store was involved.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A cursor token is not a canonical hyphenated identifier.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Pagination or filter parameters are missing, malformed or inconsistent.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A monetary amount cannot be represented in minor units.
    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DomainError {
    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and row decoding.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Stored data could not be converted into a domain model.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
