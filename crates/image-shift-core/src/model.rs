//! Task definition model
//!
//! The revision builder only ever touches a container's image, environment and
//! secrets. Everything else is owned by the implementing type and carried
//! through untouched, which is what lets the same algorithm run over the
//! plain serde model below and over the AWS SDK types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plain environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub name: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Secret injected into a container at runtime
///
/// `value_from` points at one field of a JSON secret: `<secretArn>:<key>::`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,
    pub value_from: String,
}

impl SecretReference {
    pub fn new(name: impl Into<String>, value_from: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_from: value_from.into(),
        }
    }

    /// Reference to `key` inside the JSON payload of the secret `arn`
    pub fn backing_location(arn: &str, key: &str) -> Self {
        Self::new(key, format!("{arn}:{key}::"))
    }
}

/// Resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The mutable surface of a container definition
pub trait ContainerSpec: Clone {
    fn name(&self) -> &str;

    fn image(&self) -> Option<&str>;

    /// Names of the plain environment variables, in definition order
    fn environment_names(&self) -> Vec<&str>;

    fn with_image(self, image: String) -> Self;

    /// Keep only the environment entries whose name passes `keep`
    ///
    /// Kept entries stay exactly as they were, in the same order.
    fn retain_environment(self, keep: impl FnMut(&str) -> bool) -> Self;

    fn with_secrets(self, secrets: Vec<SecretReference>) -> Self;
}

/// Task definition snapshot
///
/// `A` holds the task-level attributes (cpu, memory, roles, network mode,
/// volumes, ...). The builder never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition<C, A> {
    pub family: String,
    /// ARN of the revision this snapshot was read from, `None` once rebuilt
    pub arn: Option<String>,
    pub containers: Vec<C>,
    pub attributes: A,
    pub tags: Vec<Tag>,
}

impl<C: ContainerSpec, A> TaskDefinition<C, A> {
    pub fn container(&self, name: &str) -> Option<&C> {
        self.containers.iter().find(|c| c.name() == name)
    }
}

/// Container definition in ECS JSON form
///
/// Fields other than name, image, environment and secrets are kept verbatim
/// in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<KeyValuePair>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<SecretReference>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerDefinition {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: Some(image.into()),
            ..Default::default()
        }
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.environment.push(KeyValuePair::new(name, value));
        self
    }
}

impl ContainerSpec for ContainerDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    fn environment_names(&self) -> Vec<&str> {
        self.environment.iter().map(|pair| pair.name.as_str()).collect()
    }

    fn with_image(mut self, image: String) -> Self {
        self.image = Some(image);
        self
    }

    fn retain_environment(mut self, mut keep: impl FnMut(&str) -> bool) -> Self {
        self.environment.retain(|pair| keep(&pair.name));
        self
    }

    fn with_secrets(mut self, secrets: Vec<SecretReference>) -> Self {
        self.secrets = secrets;
        self
    }
}
