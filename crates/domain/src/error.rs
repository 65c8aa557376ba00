//! Unified error type for the domain layer.
//!
//! Keeps validation/invariant failures inside a typed enum instead of `String`
//! or `anyhow`, so engine-level code can match on `kind` and decide whether a
//! failure is a user mistake, a programming bug, or both.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("container full: {current}/{max}")]
    ContainerFull { current: u32, max: u32 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }
}
