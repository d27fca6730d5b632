//! Error types for the shift pipeline

use std::fmt;
use thiserror::Error;

/// Pipeline phase a failure originated from
///
/// Building the revision is pure and cannot fail, so it has no phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Fetch,
    Register,
    Activate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Resolve => "resolve",
            Phase::Fetch => "fetch",
            Phase::Register => "register",
            Phase::Activate => "activate",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ShiftError {
    #[error("service {service} not found in cluster {cluster}")]
    ServiceNotFound { cluster: String, service: String },

    #[error("failed to fetch secrets: {0}")]
    SecretFetch(String),

    #[error("failed to decode secret {arn}: {message}")]
    SecretDecode { arn: String, message: String },

    #[error("{phase} failed: {message}")]
    Gateway { phase: Phase, message: String },

    #[error("new task revision {arn} was registered but the service was not updated: {message}")]
    Activation { arn: String, message: String },
}

impl ShiftError {
    pub fn gateway(phase: Phase, message: impl Into<String>) -> Self {
        Self::Gateway {
            phase,
            message: message.into(),
        }
    }

    /// Phase the error belongs to
    pub fn phase(&self) -> Phase {
        match self {
            ShiftError::ServiceNotFound { .. } => Phase::Fetch,
            ShiftError::SecretFetch(_) | ShiftError::SecretDecode { .. } => Phase::Resolve,
            ShiftError::Gateway { phase, .. } => *phase,
            ShiftError::Activation { .. } => Phase::Activate,
        }
    }

    /// ARN of a revision that was registered before the failure, if any
    pub fn registered_arn(&self) -> Option<&str> {
        match self {
            ShiftError::Activation { arn, .. } => Some(arn),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShiftError>;
