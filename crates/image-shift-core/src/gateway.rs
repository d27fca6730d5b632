//! Orchestrator abstraction
//!
//! The three remote operations the pipeline needs, plus tag listing.
//! Back-ends (ECS, in-memory fakes) implement this trait.

use crate::error::Result;
use crate::model::{ContainerSpec, Tag, TaskDefinition};
use async_trait::async_trait;

#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Container definition type of this back-end
    type Container: ContainerSpec + Send + Sync;

    /// Task-level attribute bag carried through unchanged
    type Attributes: Clone + Send + Sync;

    /// Current task definition of `service` in `cluster`
    ///
    /// Fails with `ServiceNotFound` when the service does not exist.
    async fn fetch_task_definition(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<TaskDefinition<Self::Container, Self::Attributes>>;

    /// Tags currently attached to the task definition `arn`
    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>>;

    /// Register `definition` as a new revision and return its ARN
    async fn register_revision(
        &self,
        definition: &TaskDefinition<Self::Container, Self::Attributes>,
    ) -> Result<String>;

    /// Point `service` at the task definition `arn`
    async fn activate(&self, cluster: &str, service: &str, arn: &str) -> Result<()>;
}
