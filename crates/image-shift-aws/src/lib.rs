//! AWS back-ends for image-shift
//!
//! - [`EcsOrchestrator`]: ECS services and task definitions
//! - [`SecretsManagerStore`]: JSON secrets in AWS Secrets Manager
//!
//! # Example
//!
//! ```ignore
//! use image_shift_aws::AwsContext;
//!
//! let aws = AwsContext::load("eu-west-1").await;
//! let orchestrator = aws.ecs();
//! let store = aws.secrets_manager();
//!
//! let outcome = image_shift_core::shift(&orchestrator, &store, &request).await?;
//! ```

pub mod context;
pub mod ecs;
pub mod error;
pub mod secretsmanager;

pub use context::AwsContext;
pub use ecs::{EcsContainer, EcsOrchestrator, EcsTaskAttributes};
pub use secretsmanager::SecretsManagerStore;
