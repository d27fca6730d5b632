//! ECS orchestrator
//!
//! Reads the task definition a service currently runs, registers new
//! revisions and points services at them.

use crate::error::gateway;
use async_trait::async_trait;
use aws_sdk_ecs::Client;
use aws_sdk_ecs::operation::describe_services::DescribeServicesOutput;
use aws_sdk_ecs::types::{
    Compatibility, ContainerDefinition, EphemeralStorage, InferenceAccelerator, IpcMode,
    NetworkMode, PidMode, ProxyConfiguration, RuntimePlatform, Secret, Tag as SdkTag,
    TaskDefinition as SdkTaskDefinition, TaskDefinitionPlacementConstraint, Volume,
};
use image_shift_core::{
    ContainerSpec, Orchestrator, Phase, Result, SecretReference, ShiftError, Tag, TaskDefinition,
};
use tracing::debug;

/// Failure reason ECS reports for a service that does not exist
const REASON_MISSING: &str = "MISSING";

/// Status of a deleted service that is still visible for a while
const STATUS_INACTIVE: &str = "INACTIVE";

pub type EcsTaskDefinition = TaskDefinition<EcsContainer, EcsTaskAttributes>;

/// ECS container definition
///
/// Wraps the SDK type so every field the builder does not touch (ports,
/// logging, health checks, ...) is sent back exactly as it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct EcsContainer {
    definition: ContainerDefinition,
    /// Replacement secrets, applied when converting back to the SDK type
    secrets: Option<Vec<SecretReference>>,
}

impl EcsContainer {
    pub fn definition(&self) -> &ContainerDefinition {
        &self.definition
    }

    /// SDK container definition including replaced secrets
    pub fn to_sdk(&self) -> Result<ContainerDefinition> {
        let mut definition = self.definition.clone();

        if let Some(secrets) = &self.secrets {
            let converted = secrets
                .iter()
                .map(|s| {
                    Secret::builder()
                        .name(&s.name)
                        .value_from(&s.value_from)
                        .build()
                        .map_err(|e| gateway(Phase::Register, "invalid secret reference", e))
                })
                .collect::<Result<Vec<_>>>()?;
            definition.secrets = Some(converted);
        }

        Ok(definition)
    }
}

impl From<ContainerDefinition> for EcsContainer {
    fn from(definition: ContainerDefinition) -> Self {
        Self {
            definition,
            secrets: None,
        }
    }
}

impl ContainerSpec for EcsContainer {
    fn name(&self) -> &str {
        self.definition.name.as_deref().unwrap_or_default()
    }

    fn image(&self) -> Option<&str> {
        self.definition.image.as_deref()
    }

    fn environment_names(&self) -> Vec<&str> {
        self.definition
            .environment
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|pair| pair.name.as_deref())
            .collect()
    }

    fn with_image(mut self, image: String) -> Self {
        self.definition.image = Some(image);
        self
    }

    fn retain_environment(mut self, mut keep: impl FnMut(&str) -> bool) -> Self {
        if let Some(environment) = self.definition.environment.as_mut() {
            // Unnamed entries cannot be shadowed and are always kept
            environment.retain(|pair| pair.name.as_deref().is_none_or(&mut keep));
        }
        self
    }

    fn with_secrets(mut self, secrets: Vec<SecretReference>) -> Self {
        self.secrets = Some(secrets);
        self
    }
}

/// Task-level attributes copied into every new revision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcsTaskAttributes {
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub task_role_arn: Option<String>,
    pub execution_role_arn: Option<String>,
    pub network_mode: Option<NetworkMode>,
    pub volumes: Option<Vec<Volume>>,
    pub placement_constraints: Option<Vec<TaskDefinitionPlacementConstraint>>,
    pub requires_compatibilities: Option<Vec<Compatibility>>,
    pub pid_mode: Option<PidMode>,
    pub ipc_mode: Option<IpcMode>,
    pub proxy_configuration: Option<ProxyConfiguration>,
    pub inference_accelerators: Option<Vec<InferenceAccelerator>>,
    pub ephemeral_storage: Option<EphemeralStorage>,
    pub runtime_platform: Option<RuntimePlatform>,
    pub enable_fault_injection: Option<bool>,
}

/// Split an SDK task definition into containers and attributes
pub fn from_sdk(definition: SdkTaskDefinition) -> Result<EcsTaskDefinition> {
    let family = definition
        .family
        .ok_or_else(|| ShiftError::gateway(Phase::Fetch, "task definition has no family"))?;

    Ok(TaskDefinition {
        family,
        arn: definition.task_definition_arn,
        containers: definition
            .container_definitions
            .unwrap_or_default()
            .into_iter()
            .map(EcsContainer::from)
            .collect(),
        attributes: EcsTaskAttributes {
            cpu: definition.cpu,
            memory: definition.memory,
            task_role_arn: definition.task_role_arn,
            execution_role_arn: definition.execution_role_arn,
            network_mode: definition.network_mode,
            volumes: definition.volumes,
            placement_constraints: definition.placement_constraints,
            requires_compatibilities: definition.requires_compatibilities,
            pid_mode: definition.pid_mode,
            ipc_mode: definition.ipc_mode,
            proxy_configuration: definition.proxy_configuration,
            inference_accelerators: definition.inference_accelerators,
            ephemeral_storage: definition.ephemeral_storage,
            runtime_platform: definition.runtime_platform,
            enable_fault_injection: definition.enable_fault_injection,
        },
        tags: Vec::new(),
    })
}

pub fn tags_from_sdk(tags: Vec<SdkTag>) -> Vec<Tag> {
    tags.into_iter()
        .filter_map(|tag| {
            let key = tag.key?;
            Some(Tag::new(key, tag.value.unwrap_or_default()))
        })
        .collect()
}

pub fn tags_to_sdk(tags: &[Tag]) -> Option<Vec<SdkTag>> {
    if tags.is_empty() {
        return None;
    }

    Some(
        tags.iter()
            .map(|tag| SdkTag::builder().key(&tag.key).value(&tag.value).build())
            .collect(),
    )
}

/// Task definition ARN the described service currently runs
///
/// A `MISSING` failure, an empty service list or a service that only exists
/// as `INACTIVE` all mean the service is not there.
pub fn service_task_definition<'a>(
    described: &'a DescribeServicesOutput,
    cluster: &str,
    service: &str,
) -> Result<&'a str> {
    let not_found = || ShiftError::ServiceNotFound {
        cluster: cluster.to_string(),
        service: service.to_string(),
    };

    if let Some(failure) = described.failures().first() {
        let reason = failure.reason().unwrap_or_default();
        if reason == REASON_MISSING {
            return Err(not_found());
        }
        return Err(ShiftError::gateway(
            Phase::Fetch,
            format!("failed to describe service: {reason}"),
        ));
    }

    described
        .services()
        .iter()
        .find(|s| s.status() != Some(STATUS_INACTIVE))
        .and_then(|s| s.task_definition())
        .ok_or_else(not_found)
}

/// Task definitions and services through the ECS API
#[derive(Debug, Clone)]
pub struct EcsOrchestrator {
    client: Client,
}

impl EcsOrchestrator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Orchestrator for EcsOrchestrator {
    type Container = EcsContainer;
    type Attributes = EcsTaskAttributes;

    async fn fetch_task_definition(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<EcsTaskDefinition> {
        let described = self
            .client
            .describe_services()
            .cluster(cluster)
            .services(service)
            .send()
            .await
            .map_err(|e| gateway(Phase::Fetch, "failed to describe service", e))?;

        let task_definition_arn = service_task_definition(&described, cluster, service)?;
        debug!(
            cluster = %cluster,
            service = %service,
            task_definition = %task_definition_arn,
            "Service found"
        );

        let output = self
            .client
            .describe_task_definition()
            .task_definition(task_definition_arn)
            .send()
            .await
            .map_err(|e| gateway(Phase::Fetch, "failed to describe task definition", e))?;

        let definition = output.task_definition.ok_or_else(|| {
            ShiftError::gateway(
                Phase::Fetch,
                format!("task definition {task_definition_arn} not returned"),
            )
        })?;

        from_sdk(definition)
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>> {
        let output = self
            .client
            .list_tags_for_resource()
            .resource_arn(arn)
            .send()
            .await
            .map_err(|e| gateway(Phase::Fetch, "failed to list tags for resource", e))?;

        Ok(tags_from_sdk(output.tags.unwrap_or_default()))
    }

    async fn register_revision(&self, definition: &EcsTaskDefinition) -> Result<String> {
        let containers = definition
            .containers
            .iter()
            .map(EcsContainer::to_sdk)
            .collect::<Result<Vec<_>>>()?;
        let attributes = definition.attributes.clone();

        let output = self
            .client
            .register_task_definition()
            .family(&definition.family)
            .set_container_definitions(Some(containers))
            .set_cpu(attributes.cpu)
            .set_memory(attributes.memory)
            .set_task_role_arn(attributes.task_role_arn)
            .set_execution_role_arn(attributes.execution_role_arn)
            .set_network_mode(attributes.network_mode)
            .set_volumes(attributes.volumes)
            .set_placement_constraints(attributes.placement_constraints)
            .set_requires_compatibilities(attributes.requires_compatibilities)
            .set_pid_mode(attributes.pid_mode)
            .set_ipc_mode(attributes.ipc_mode)
            .set_proxy_configuration(attributes.proxy_configuration)
            .set_inference_accelerators(attributes.inference_accelerators)
            .set_ephemeral_storage(attributes.ephemeral_storage)
            .set_runtime_platform(attributes.runtime_platform)
            .set_enable_fault_injection(attributes.enable_fault_injection)
            .set_tags(tags_to_sdk(&definition.tags))
            .send()
            .await
            .map_err(|e| gateway(Phase::Register, "failed to register task definition", e))?;

        output
            .task_definition
            .and_then(|td| td.task_definition_arn)
            .ok_or_else(|| {
                ShiftError::gateway(Phase::Register, "registered task definition has no ARN")
            })
    }

    async fn activate(&self, cluster: &str, service: &str, arn: &str) -> Result<()> {
        self.client
            .update_service()
            .cluster(cluster)
            .service(service)
            .task_definition(arn)
            .send()
            .await
            .map_err(|e| gateway(Phase::Activate, "failed to update service", e))?;

        Ok(())
    }
}
