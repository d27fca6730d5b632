//! The shift pipeline
//!
//! parse overrides → resolve secrets → fetch → build → register → activate.
//! Every step runs sequentially and the first failure aborts the run.

use crate::error::{Phase, Result, ShiftError};
use crate::gateway::Orchestrator;
use crate::overrides::{OVERRIDE_FORMAT, parse_overrides};
use crate::revision::{Diagnostic, build_revision};
use crate::secrets::{SecretStore, resolve_secrets};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftRequest {
    pub cluster: String,
    pub service: String,
    /// Raw `container=image` entries
    pub overrides: Vec<String>,
    /// Secret ids to attach to every container
    pub secrets: Vec<String>,
    /// Point the service at the new revision once registered
    pub deploy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShiftOutcome {
    /// No usable override was given; nothing was contacted
    NoChanges,
    /// A new revision exists but the service still runs the old one
    Registered {
        arn: String,
        diagnostics: Vec<Diagnostic>,
    },
    Deployed {
        arn: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl ShiftOutcome {
    pub fn arn(&self) -> Option<&str> {
        match self {
            ShiftOutcome::NoChanges => None,
            ShiftOutcome::Registered { arn, .. } | ShiftOutcome::Deployed { arn, .. } => Some(arn),
        }
    }
}

/// Run the whole pipeline against the given back-ends
///
/// When activation fails the already registered ARN is carried in
/// [`ShiftError::Activation`].
pub async fn shift<O, S>(orchestrator: &O, store: &S, request: &ShiftRequest) -> Result<ShiftOutcome>
where
    O: Orchestrator + ?Sized,
    S: SecretStore + ?Sized,
{
    let parsed = parse_overrides(&request.overrides);
    for rejected in &parsed.rejected {
        warn!(
            item = %rejected.entry,
            reason = %rejected.reason,
            "invalid container mapping, should be in format: {}",
            OVERRIDE_FORMAT
        );
    }

    if parsed.is_empty() {
        warn!("no containers to update");
        return Ok(ShiftOutcome::NoChanges);
    }

    let secret_refs = resolve_secrets(store, &request.secrets).await?;

    let current = orchestrator
        .fetch_task_definition(&request.cluster, &request.service)
        .await?;
    info!(
        family = %current.family,
        revision = current.arn.as_deref().unwrap_or("-"),
        containers = current.containers.len(),
        "Fetched current task definition"
    );

    let current_tags = match current.arn.as_deref() {
        Some(arn) => orchestrator.list_tags(arn).await?,
        None => Vec::new(),
    };

    let revision = build_revision(&current, &current_tags, &parsed.images, &secret_refs);
    for diagnostic in &revision.diagnostics {
        match diagnostic {
            Diagnostic::ImageChanged { container, old, new } => info!(
                container = %container,
                old = old.as_deref().unwrap_or("-"),
                new = %new,
                "updating container image"
            ),
            Diagnostic::EnvironmentShadowed { container, name } => info!(
                container = %container,
                name = %name,
                "dropping environment variable shadowed by secret"
            ),
            Diagnostic::SecretsAttached { container, count } => info!(
                container = %container,
                count = count,
                "attaching secrets"
            ),
        }
    }
    if revision.image_changes() == 0 {
        warn!("no container in the task definition matched the given overrides");
    }

    let arn = orchestrator.register_revision(&revision.definition).await?;
    info!(revision = %arn, "new task revision created");

    if !request.deploy {
        info!("task update / deployment skipped");
        return Ok(ShiftOutcome::Registered {
            arn,
            diagnostics: revision.diagnostics,
        });
    }

    if let Err(e) = orchestrator
        .activate(&request.cluster, &request.service, &arn)
        .await
    {
        let message = match e {
            ShiftError::Gateway { message, .. } => message,
            other => other.to_string(),
        };
        return Err(ShiftError::Activation { arn, message });
    }
    info!(service = %request.service, revision = %arn, "service updated");

    Ok(ShiftOutcome::Deployed {
        arn,
        diagnostics: revision.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContainerDefinition, SecretReference, Tag, TaskDefinition};
    use crate::secrets::SecretPayload;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Definition = TaskDefinition<ContainerDefinition, String>;

    const CURRENT_ARN: &str = "arn:aws:ecs:eu-west-1:123456789012:task-definition/api:7";
    const NEW_ARN: &str = "arn:aws:ecs:eu-west-1:123456789012:task-definition/api:8";
    const SECRET_ARN: &str = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:api-AbCdEf";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Fetch(String, String),
        ListTags(String),
        Register(Definition),
        Activate(String, String, String),
    }

    struct FakeOrchestrator {
        definition: Option<Definition>,
        tags: Vec<Tag>,
        fail_register: bool,
        fail_activate: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeOrchestrator {
        fn new() -> Self {
            Self {
                definition: Some(TaskDefinition {
                    family: "api".to_string(),
                    arn: Some(CURRENT_ARN.to_string()),
                    containers: vec![
                        ContainerDefinition::new("app", "myrepo/app:v1")
                            .env("DB_PASSWORD", "plaintext")
                            .env("MODE", "prod"),
                        ContainerDefinition::new("proxy", "myrepo/proxy:v1"),
                    ],
                    attributes: "cpu=512,memory=1024".to_string(),
                    tags: vec![Tag::new("snapshot", "old")],
                }),
                tags: vec![Tag::new("team", "payments")],
                fail_register: false,
                fail_activate: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Orchestrator for FakeOrchestrator {
        type Container = ContainerDefinition;
        type Attributes = String;

        async fn fetch_task_definition(&self, cluster: &str, service: &str) -> Result<Definition> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Fetch(cluster.to_string(), service.to_string()));
            self.definition
                .clone()
                .ok_or_else(|| ShiftError::ServiceNotFound {
                    cluster: cluster.to_string(),
                    service: service.to_string(),
                })
        }

        async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>> {
            self.calls.lock().unwrap().push(Call::ListTags(arn.to_string()));
            Ok(self.tags.clone())
        }

        async fn register_revision(&self, definition: &Definition) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Register(definition.clone()));
            if self.fail_register {
                return Err(ShiftError::gateway(Phase::Register, "ClientException"));
            }
            Ok(NEW_ARN.to_string())
        }

        async fn activate(&self, cluster: &str, service: &str, arn: &str) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Activate(
                cluster.to_string(),
                service.to_string(),
                arn.to_string(),
            ));
            if self.fail_activate {
                return Err(ShiftError::gateway(Phase::Activate, "AccessDeniedException"));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        payloads: Vec<SecretPayload>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl SecretStore for FakeStore {
        async fn batch_get(&self, _secret_ids: &[String]) -> Result<Vec<SecretPayload>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.payloads.clone())
        }
    }

    fn request(overrides: &[&str], deploy: bool) -> ShiftRequest {
        ShiftRequest {
            cluster: "prod".to_string(),
            service: "api".to_string(),
            overrides: overrides.iter().map(|s| s.to_string()).collect(),
            secrets: Vec::new(),
            deploy,
        }
    }

    fn registered(orchestrator: &FakeOrchestrator) -> Definition {
        orchestrator
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Register(definition) => Some(definition),
                _ => None,
            })
            .expect("register was not called")
    }

    #[tokio::test]
    async fn test_no_valid_overrides_is_noop() {
        let orchestrator = FakeOrchestrator::new();
        let store = FakeStore::default();

        let outcome = shift(&orchestrator, &store, &request(&["bad-entry", "=x"], true))
            .await
            .unwrap();

        assert_eq!(outcome, ShiftOutcome::NoChanges);
        assert!(outcome.arn().is_none());
        assert!(orchestrator.calls().is_empty());
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_without_deploy() {
        let orchestrator = FakeOrchestrator::new();
        let store = FakeStore::default();

        let outcome = shift(&orchestrator, &store, &request(&["proxy=:v9"], false))
            .await
            .unwrap();

        assert_eq!(outcome.arn(), Some(NEW_ARN));
        assert!(matches!(outcome, ShiftOutcome::Registered { .. }));
        // No secrets requested, so the store is never contacted
        assert_eq!(*store.calls.lock().unwrap(), 0);

        let calls = orchestrator.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], Call::Fetch("prod".to_string(), "api".to_string()));
        assert_eq!(calls[1], Call::ListTags(CURRENT_ARN.to_string()));

        let definition = registered(&orchestrator);
        assert_eq!(definition.containers[1].image.as_deref(), Some("myrepo/proxy:v9"));
        assert_eq!(definition.containers[0].image.as_deref(), Some("myrepo/app:v1"));
        assert_eq!(definition.tags, vec![Tag::new("team", "payments")]);
        assert_eq!(definition.attributes, "cpu=512,memory=1024");
    }

    #[tokio::test]
    async fn test_deploy_with_secrets() {
        let orchestrator = FakeOrchestrator::new();
        let store = FakeStore {
            payloads: vec![SecretPayload::new(SECRET_ARN, r#"{"DB_PASSWORD":"s3cret"}"#)],
            ..Default::default()
        };
        let mut req = request(&["app=myrepo/app:v2"], true);
        req.secrets = vec!["api".to_string()];

        let outcome = shift(&orchestrator, &store, &req).await.unwrap();

        match &outcome {
            ShiftOutcome::Deployed { arn, diagnostics } => {
                assert_eq!(arn, NEW_ARN);
                assert!(diagnostics.contains(&Diagnostic::EnvironmentShadowed {
                    container: "app".to_string(),
                    name: "DB_PASSWORD".to_string(),
                }));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let definition = registered(&orchestrator);
        let app = &definition.containers[0];
        assert_eq!(app.image.as_deref(), Some("myrepo/app:v2"));
        assert_eq!(app.environment.len(), 1);
        assert_eq!(
            app.secrets,
            vec![SecretReference::new(
                "DB_PASSWORD",
                format!("{SECRET_ARN}:DB_PASSWORD::")
            )]
        );

        assert_eq!(
            orchestrator.calls().last(),
            Some(&Call::Activate(
                "prod".to_string(),
                "api".to_string(),
                NEW_ARN.to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_service_not_found() {
        let mut orchestrator = FakeOrchestrator::new();
        orchestrator.definition = None;

        let err = shift(&orchestrator, &FakeStore::default(), &request(&["app=:v2"], true))
            .await
            .unwrap_err();

        assert!(matches!(err, ShiftError::ServiceNotFound { .. }));
        assert_eq!(err.phase(), Phase::Fetch);
        assert_eq!(orchestrator.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_register_failure_skips_activation() {
        let mut orchestrator = FakeOrchestrator::new();
        orchestrator.fail_register = true;

        let err = shift(&orchestrator, &FakeStore::default(), &request(&["app=:v2"], true))
            .await
            .unwrap_err();

        assert_eq!(err.phase(), Phase::Register);
        assert!(
            !orchestrator
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Activate(..)))
        );
    }

    #[tokio::test]
    async fn test_activation_failure_surfaces_arn() {
        let mut orchestrator = FakeOrchestrator::new();
        orchestrator.fail_activate = true;

        let err = shift(&orchestrator, &FakeStore::default(), &request(&["app=:v2"], true))
            .await
            .unwrap_err();

        assert_eq!(err.registered_arn(), Some(NEW_ARN));
        assert!(err.to_string().contains("AccessDeniedException"));
    }

    #[tokio::test]
    async fn test_secret_failure_happens_before_fetch() {
        let orchestrator = FakeOrchestrator::new();
        let store = FakeStore {
            payloads: vec![SecretPayload::new(SECRET_ARN, "[1, 2, 3]")],
            ..Default::default()
        };
        let mut req = request(&["app=:v2"], true);
        req.secrets = vec!["api".to_string()];

        let err = shift(&orchestrator, &store, &req).await.unwrap_err();

        assert_eq!(err.phase(), Phase::Resolve);
        assert!(orchestrator.calls().is_empty());
    }
}
