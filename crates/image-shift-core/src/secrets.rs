//! Secret resolution
//!
//! Every requested secret holds a flat JSON object. Each field of that object
//! becomes one [`SecretReference`] named after the field.

use crate::error::{Result, ShiftError};
use crate::model::SecretReference;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Exposed key name → reference into the secret store
pub type SecretRefs = BTreeMap<String, SecretReference>;

/// One secret as returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPayload {
    pub arn: String,
    /// `None` for binary secrets
    pub secret_string: Option<String>,
}

impl SecretPayload {
    pub fn new(arn: impl Into<String>, secret_string: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            secret_string: Some(secret_string.into()),
        }
    }
}

/// External secret store
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch all `secret_ids` in one logical batch
    ///
    /// Fails if any id could not be fetched.
    async fn batch_get(&self, secret_ids: &[String]) -> Result<Vec<SecretPayload>>;
}

/// Decode one secret payload into references
pub fn flatten_secret(payload: &SecretPayload) -> Result<Vec<SecretReference>> {
    let text = payload
        .secret_string
        .as_deref()
        .ok_or_else(|| ShiftError::SecretDecode {
            arn: payload.arn.clone(),
            message: "secret has no string payload".to_string(),
        })?;

    let fields: HashMap<String, String> =
        serde_json::from_str(text).map_err(|e| ShiftError::SecretDecode {
            arn: payload.arn.clone(),
            message: e.to_string(),
        })?;

    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();

    Ok(keys
        .into_iter()
        .map(|key| SecretReference::backing_location(&payload.arn, key))
        .collect())
}

/// Resolve secret ids into references keyed by exposed name
///
/// An empty request returns immediately without contacting the store. When
/// two secrets expose the same field name, the one returned later by the store
/// wins.
pub async fn resolve_secrets<S>(store: &S, secret_ids: &[String]) -> Result<SecretRefs>
where
    S: SecretStore + ?Sized,
{
    let mut refs = SecretRefs::new();
    if secret_ids.is_empty() {
        return Ok(refs);
    }

    let payloads = store.batch_get(secret_ids).await?;
    debug!(count = payloads.len(), "Fetched secrets");

    for payload in &payloads {
        for reference in flatten_secret(payload)? {
            if let Some(previous) = refs.insert(reference.name.clone(), reference) {
                debug!(key = %previous.name, arn = %payload.arn, "Secret key overwritten by later secret");
            }
        }
    }

    info!(secrets = payloads.len(), keys = refs.len(), "Resolved secret references");

    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const DB_ARN: &str = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:db-AbCdEf";
    const API_ARN: &str = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:api-GhIjKl";

    #[derive(Default)]
    struct RecordingStore {
        payloads: Vec<SecretPayload>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl SecretStore for RecordingStore {
        async fn batch_get(&self, secret_ids: &[String]) -> Result<Vec<SecretPayload>> {
            self.calls.lock().unwrap().push(secret_ids.to_vec());
            Ok(self.payloads.clone())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl SecretStore for FailingStore {
        async fn batch_get(&self, _secret_ids: &[String]) -> Result<Vec<SecretPayload>> {
            Err(ShiftError::SecretFetch("ResourceNotFoundException".to_string()))
        }
    }

    #[tokio::test]
    async fn test_empty_request_skips_store() {
        let store = RecordingStore::default();
        let refs = resolve_secrets(&store, &[]).await.unwrap();
        assert!(refs.is_empty());
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_flattens_every_field() {
        let store = RecordingStore {
            payloads: vec![
                SecretPayload::new(DB_ARN, r#"{"DB_USER":"app","DB_PASSWORD":"s3cret"}"#),
                SecretPayload::new(API_ARN, r#"{"API_TOKEN":"t0ken"}"#),
            ],
            ..Default::default()
        };

        let ids = vec!["db".to_string(), "api".to_string()];
        let refs = resolve_secrets(&store, &ids).await.unwrap();

        assert_eq!(store.calls.lock().unwrap().as_slice(), &[ids]);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs["DB_PASSWORD"].value_from, format!("{DB_ARN}:DB_PASSWORD::"));
        assert_eq!(refs["API_TOKEN"].value_from, format!("{API_ARN}:API_TOKEN::"));
        assert_eq!(refs["DB_USER"].name, "DB_USER");
    }

    #[tokio::test]
    async fn test_later_secret_wins_on_collision() {
        let store = RecordingStore {
            payloads: vec![
                SecretPayload::new(DB_ARN, r#"{"TOKEN":"a"}"#),
                SecretPayload::new(API_ARN, r#"{"TOKEN":"b"}"#),
            ],
            ..Default::default()
        };

        let refs = resolve_secrets(&store, &["db".to_string(), "api".to_string()])
            .await
            .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs["TOKEN"].value_from, format!("{API_ARN}:TOKEN::"));
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let err = resolve_secrets(&FailingStore, &["db".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ShiftError::SecretFetch(_)));
    }

    #[tokio::test]
    async fn test_non_object_payload_fails() {
        let store = RecordingStore {
            payloads: vec![SecretPayload::new(DB_ARN, "plain-text-password")],
            ..Default::default()
        };
        let err = resolve_secrets(&store, &["db".to_string()]).await.unwrap_err();
        match err {
            ShiftError::SecretDecode { arn, .. } => assert_eq!(arn, DB_ARN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_string_values_fail() {
        let payload = SecretPayload::new(DB_ARN, r#"{"PORT":5432}"#);
        assert!(matches!(
            flatten_secret(&payload),
            Err(ShiftError::SecretDecode { .. })
        ));
    }

    #[test]
    fn test_binary_secret_fails() {
        let payload = SecretPayload {
            arn: DB_ARN.to_string(),
            secret_string: None,
        };
        let err = flatten_secret(&payload).unwrap_err();
        assert!(err.to_string().contains("no string payload"));
    }

    #[test]
    fn test_flatten_is_sorted() {
        let payload = SecretPayload::new(DB_ARN, r#"{"B":"2","A":"1","C":"3"}"#);
        let names: Vec<String> = flatten_secret(&payload)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
