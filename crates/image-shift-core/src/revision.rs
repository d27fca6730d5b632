//! Task revision builder
//!
//! Pure transformation from the current task definition to the next revision.
//! No I/O happens here; what changed is reported back as [`Diagnostic`]s.

use crate::model::{ContainerSpec, SecretReference, Tag, TaskDefinition};
use crate::overrides::ImageOverrides;
use crate::secrets::SecretRefs;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    ImageChanged {
        container: String,
        old: Option<String>,
        new: String,
    },
    /// A plain environment variable dropped in favour of a secret of the same name
    EnvironmentShadowed { container: String, name: String },
    SecretsAttached { container: String, count: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ImageChanged { container, old, new } => write!(
                f,
                "{container}: {} -> {new}",
                old.as_deref().unwrap_or("<none>")
            ),
            Diagnostic::EnvironmentShadowed { container, name } => {
                write!(f, "{container}: environment variable {name} replaced by secret")
            }
            Diagnostic::SecretsAttached { container, count } => {
                write!(f, "{container}: {count} secret(s) attached")
            }
        }
    }
}

/// Output of [`build_revision`]
#[derive(Debug, Clone, PartialEq)]
pub struct Revision<C, A> {
    pub definition: TaskDefinition<C, A>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<C, A> Revision<C, A> {
    pub fn image_changes(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::ImageChanged { .. }))
            .count()
    }
}

/// Resolve an image override against the current image
///
/// A value starting with `:` keeps the repository (everything before the first
/// `:` of the current image) and replaces the tag.
pub fn resolve_image(current: Option<&str>, image_override: &str) -> String {
    if image_override.starts_with(':') {
        let current = current.unwrap_or_default();
        let repository = current.split(':').next().unwrap_or_default();
        format!("{repository}{image_override}")
    } else {
        image_override.to_string()
    }
}

/// Build the next revision of `current`
///
/// Task-level attributes are cloned as they are; `tags` is replaced by
/// `current_tags`, the tag set freshly listed for the source revision.
pub fn build_revision<C, A>(
    current: &TaskDefinition<C, A>,
    current_tags: &[Tag],
    overrides: &ImageOverrides,
    secret_refs: &SecretRefs,
) -> Revision<C, A>
where
    C: ContainerSpec,
    A: Clone,
{
    let mut diagnostics = Vec::new();
    let secrets: Vec<SecretReference> = secret_refs.values().cloned().collect();

    let containers = current
        .containers
        .iter()
        .map(|container| {
            let name = container.name().to_string();
            let mut next = container.clone();

            if let Some(image_override) = overrides.get(&name) {
                let old = container.image().map(str::to_string);
                let new = resolve_image(old.as_deref(), image_override);
                next = next.with_image(new.clone());
                diagnostics.push(Diagnostic::ImageChanged {
                    container: name.clone(),
                    old,
                    new,
                });
            }

            let shadowed: Vec<String> = container
                .environment_names()
                .into_iter()
                .filter(|env_name| secret_refs.contains_key(*env_name))
                .map(str::to_string)
                .collect();

            if !shadowed.is_empty() {
                next = next.retain_environment(|env_name| !secret_refs.contains_key(env_name));
                diagnostics.extend(shadowed.into_iter().map(|env_name| {
                    Diagnostic::EnvironmentShadowed {
                        container: name.clone(),
                        name: env_name,
                    }
                }));
            }

            if !secrets.is_empty() {
                next = next.with_secrets(secrets.clone());
                diagnostics.push(Diagnostic::SecretsAttached {
                    container: name,
                    count: secrets.len(),
                });
            }

            next
        })
        .collect();

    Revision {
        definition: TaskDefinition {
            family: current.family.clone(),
            arn: None,
            containers,
            attributes: current.attributes.clone(),
            tags: current_tags.to_vec(),
        },
        diagnostics,
    }
}
