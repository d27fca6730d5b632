//! SDK error conversion

use aws_sdk_ecs::error::DisplayErrorContext;
use image_shift_core::{Phase, ShiftError};

/// Render an SDK error with its full cause chain
pub(crate) fn describe<E: std::error::Error>(err: E) -> String {
    DisplayErrorContext(err).to_string()
}

pub(crate) fn gateway<E: std::error::Error>(phase: Phase, context: &str, err: E) -> ShiftError {
    ShiftError::gateway(phase, format!("{context}: {}", describe(err)))
}
