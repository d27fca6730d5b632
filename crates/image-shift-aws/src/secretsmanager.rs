//! Secrets Manager store

use crate::error::describe;
use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::types::SecretValueEntry;
use image_shift_core::{Result, SecretPayload, SecretStore, ShiftError};
use tracing::debug;

/// `BatchGetSecretValue` accepts at most this many ids per request
const MAX_IDS_PER_REQUEST: usize = 20;

/// JSON secrets stored in AWS Secrets Manager
#[derive(Debug, Clone)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_chunk(&self, ids: &[String]) -> Result<Vec<SecretPayload>> {
        let mut payloads = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .batch_get_secret_value()
                .set_secret_id_list(Some(ids.to_vec()))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    ShiftError::SecretFetch(format!("failed to list secrets: {}", describe(e)))
                })?;

            if let Some(error) = output.errors().first() {
                return Err(ShiftError::SecretFetch(format!(
                    "{}: {} {}",
                    error.secret_id().unwrap_or("<unknown>"),
                    error.error_code().unwrap_or_default(),
                    error.message().unwrap_or_default()
                )));
            }

            for entry in output.secret_values() {
                payloads.push(to_payload(entry)?);
            }

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(payloads)
    }
}

fn to_payload(entry: &SecretValueEntry) -> Result<SecretPayload> {
    let arn = entry.arn().ok_or_else(|| {
        ShiftError::SecretFetch(format!(
            "secret {} returned without ARN",
            entry.name().unwrap_or("<unknown>")
        ))
    })?;

    Ok(SecretPayload {
        arn: arn.to_string(),
        secret_string: entry.secret_string().map(str::to_string),
    })
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn batch_get(&self, secret_ids: &[String]) -> Result<Vec<SecretPayload>> {
        let mut payloads = Vec::with_capacity(secret_ids.len());

        for chunk in secret_ids.chunks(MAX_IDS_PER_REQUEST) {
            payloads.extend(self.fetch_chunk(chunk).await?);
        }

        debug!(
            requested = secret_ids.len(),
            fetched = payloads.len(),
            "Fetched secret values"
        );
        Ok(payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_payload() {
        let entry = SecretValueEntry::builder()
            .arn("arn:aws:secretsmanager:eu-west-1:123456789012:secret:db-AbCdEf")
            .name("db")
            .secret_string(r#"{"DB_PASSWORD":"s3cret"}"#)
            .build();

        let payload = to_payload(&entry).unwrap();
        assert_eq!(
            payload.arn,
            "arn:aws:secretsmanager:eu-west-1:123456789012:secret:db-AbCdEf"
        );
        assert_eq!(
            payload.secret_string.as_deref(),
            Some(r#"{"DB_PASSWORD":"s3cret"}"#)
        );
    }

    #[test]
    fn test_to_payload_binary_secret() {
        let entry = SecretValueEntry::builder()
            .arn("arn:aws:secretsmanager:eu-west-1:123456789012:secret:cert-AbCdEf")
            .build();
        assert!(to_payload(&entry).unwrap().secret_string.is_none());
    }

    #[test]
    fn test_to_payload_requires_arn() {
        let entry = SecretValueEntry::builder().name("db").build();
        let err = to_payload(&entry).unwrap_err();
        assert!(err.to_string().contains("secret db returned without ARN"));
    }

    #[test]
    fn test_chunking_limit() {
        let ids: Vec<String> = (0..45).map(|i| format!("secret-{i}")).collect();
        let sizes: Vec<usize> = ids.chunks(MAX_IDS_PER_REQUEST).map(<[String]>::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);
    }
}
