//! Shared SDK configuration

use crate::ecs::EcsOrchestrator;
use crate::secretsmanager::SecretsManagerStore;
use aws_config::{BehaviorVersion, Region, SdkConfig};

/// AWS configuration for one region
///
/// Credentials come from the default provider chain (environment, profile,
/// IAM role).
#[derive(Debug, Clone)]
pub struct AwsContext {
    config: SdkConfig,
}

impl AwsContext {
    pub async fn load(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        tracing::debug!(region = %region, "Loaded AWS configuration");

        Self { config }
    }

    pub fn from_config(config: SdkConfig) -> Self {
        Self { config }
    }

    pub fn region(&self) -> Option<&str> {
        self.config.region().map(|r| r.as_ref())
    }

    pub fn ecs(&self) -> EcsOrchestrator {
        EcsOrchestrator::new(aws_sdk_ecs::Client::new(&self.config))
    }

    pub fn secrets_manager(&self) -> SecretsManagerStore {
        SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(&self.config))
    }
}
