//! # DomainError
//!
//! Centralized error handling for the thread subsystem.
//! Every failure a caller can correct carries a human-readable message; the
//! API layer maps [`ErrorKind`] to a status code.

use thiserror::Error;

use crate::models::{BlogId, ThreadId};

/// The broad class of a failure, used for matching and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidArgument,
    Unauthorized,
    Internal,
}

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Referenced thread, blog or user does not exist
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Requester does not own the thread or the blog
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Blog is already a member of a different thread
    #[error("Blog \"{blog_title}\" is already in thread \"{thread_title}\"")]
    AlreadyInThread {
        blog_id: BlogId,
        blog_title: String,
        thread_id: ThreadId,
        thread_title: String,
    },

    /// Blog is already a member of the thread being modified
    #[error("Blog {0} is already in this thread")]
    AlreadyMember(BlogId),

    /// Uniqueness violation detected by the store itself
    #[error("conflict: {0}")]
    Conflict(String),

    /// Field-length violations, duplicate ids, reorder set mismatch
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or unverifiable credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down, poisoned lock)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::AlreadyInThread { .. }
            | DomainError::AlreadyMember(_)
            | DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            DomainError::Unauthorized(_) => ErrorKind::Unauthorized,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A specialized Result type for domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_the_blocking_thread() {
        let err = DomainError::AlreadyInThread {
            blog_id: BlogId::new(),
            blog_title: "Part one".into(),
            thread_id: ThreadId::new(),
            thread_title: "Rust in anger".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.to_string(),
            "Blog \"Part one\" is already in thread \"Rust in anger\""
        );
    }

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = DomainError::not_found("Thread", "abc");
        assert_eq!(err.to_string(), "Thread not found with ID abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
