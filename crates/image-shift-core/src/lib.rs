//! image-shift core
//!
//! Turns an existing ECS-style task definition into a new revision with
//! container images replaced and secret references attached.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐  ┌────────────────┐
//! │ Mapping Parser │  │ Secret Resolver│◀── SecretStore
//! └───────┬────────┘  └───────┬────────┘
//!         │                   │
//! ┌───────▼───────────────────▼────────┐
//! │       Task Revision Builder         │  (pure, no I/O)
//! └───────────────────┬────────────────┘
//!                     │
//! ┌───────────────────▼────────────────┐
//! │   Orchestrator (fetch / register /  │
//! │           activate)                 │
//! └────────────────────────────────────┘
//! ```
//!
//! The cloud back-ends live in `image-shift-aws`; this crate only knows the
//! [`Orchestrator`] and [`SecretStore`] traits.

pub mod error;
pub mod gateway;
pub mod model;
pub mod overrides;
pub mod revision;
pub mod secrets;
pub mod shift;

// Re-exports
pub use error::{Phase, Result, ShiftError};
pub use gateway::Orchestrator;
pub use model::{
    ContainerDefinition, ContainerSpec, KeyValuePair, SecretReference, Tag, TaskDefinition,
};
pub use overrides::{
    ImageOverrides, MalformedOverride, OVERRIDE_FORMAT, ParsedOverrides, RejectReason,
    parse_overrides,
};
pub use revision::{Diagnostic, Revision, build_revision, resolve_image};
pub use secrets::{SecretPayload, SecretRefs, SecretStore, flatten_secret, resolve_secrets};
pub use shift::{ShiftOutcome, ShiftRequest, shift};
