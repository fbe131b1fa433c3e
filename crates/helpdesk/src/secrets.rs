use async_trait::async_trait;
use base64::Engine;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const SECRET_MANAGER_BASE_URL: &str = "https://secretmanager.googleapis.com/v1";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret `{name}` was not found")]
    NotFound { name: String },
    #[error("access to secret `{name}` was denied")]
    Denied { name: String },
    #[error("secret store transport failure: {0}")]
    Transport(String),
    #[error("secret payload could not be decoded: {0}")]
    Decode(String),
}

/// Retrieves a named secret's current value from a managed secret store.
#[async_trait]
pub trait SecretAccessor: Send + Sync {
    /// `version` defaults to the accessor's configured version (`latest`)
    /// when `None`.
    async fn access(
        &self,
        secret_id: &str,
        version: Option<&str>,
    ) -> Result<SecretString, SecretError>;
}

/// Google Secret Manager over REST, authenticating with a bearer token from
/// the GCE metadata server (default service-account credentials).
pub struct GoogleSecretManagerAccessor {
    http: reqwest::Client,
    project_id: String,
    default_version: String,
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    data: String,
}

impl GoogleSecretManagerAccessor {
    pub fn new(
        project_id: impl Into<String>,
        default_version: impl Into<String>,
    ) -> Result<Self, SecretError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|err| SecretError::Transport(err.to_string()))?;

        Ok(Self { http, project_id: project_id.into(), default_version: default_version.into() })
    }

    async fn metadata_token(&self) -> Result<String, SecretError> {
        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|err| SecretError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(SecretError::Transport(format!(
                "metadata server returned status {}",
                response.status()
            )));
        }

        let token: MetadataToken =
            response.json().await.map_err(|err| SecretError::Transport(err.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl SecretAccessor for GoogleSecretManagerAccessor {
    async fn access(
        &self,
        secret_id: &str,
        version: Option<&str>,
    ) -> Result<SecretString, SecretError> {
        let token = self.metadata_token().await?;
        let version = version.unwrap_or(&self.default_version);
        let url = format!(
            "{SECRET_MANAGER_BASE_URL}/projects/{}/secrets/{secret_id}/versions/{version}:access",
            self.project_id
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|err| SecretError::Transport(err.to_string()))?;

        match response.status().as_u16() {
            404 => return Err(SecretError::NotFound { name: secret_id.to_owned() }),
            401 | 403 => return Err(SecretError::Denied { name: secret_id.to_owned() }),
            status if status >= 400 => {
                return Err(SecretError::Transport(format!(
                    "secret store returned status {status}"
                )))
            }
            _ => {}
        }

        let body: AccessSecretVersionResponse =
            response.json().await.map_err(|err| SecretError::Transport(err.to_string()))?;
        decode_secret_payload(&body.payload.data)
    }
}

fn decode_secret_payload(data: &str) -> Result<SecretString, SecretError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|err| SecretError::Decode(err.to_string()))?;
    let value = String::from_utf8(bytes).map_err(|err| SecretError::Decode(err.to_string()))?;
    Ok(value.into())
}

/// Reads secrets from process environment variables. Local development and
/// test substitute for the managed store; the secret id maps to an uppercased
/// variable name with hyphens replaced by underscores.
#[derive(Default)]
pub struct EnvSecretAccessor;

impl EnvSecretAccessor {
    pub fn variable_name(secret_id: &str) -> String {
        secret_id.to_ascii_uppercase().replace('-', "_")
    }
}

#[async_trait]
impl SecretAccessor for EnvSecretAccessor {
    async fn access(
        &self,
        secret_id: &str,
        _version: Option<&str>,
    ) -> Result<SecretString, SecretError> {
        let variable = Self::variable_name(secret_id);
        match std::env::var(&variable) {
            Ok(value) if !value.is_empty() => Ok(value.into()),
            _ => Err(SecretError::NotFound { name: secret_id.to_owned() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::{decode_secret_payload, EnvSecretAccessor, SecretAccessor, SecretError};

    #[test]
    fn secret_id_maps_to_env_variable_name() {
        assert_eq!(EnvSecretAccessor::variable_name("helpdesk-api-token"), "HELPDESK_API_TOKEN");
    }

    #[tokio::test]
    async fn env_accessor_reads_configured_variable() {
        std::env::set_var("DESKBOT_TEST_SECRET", "s3cret");

        let value = EnvSecretAccessor
            .access("deskbot-test-secret", None)
            .await
            .expect("secret should resolve from env");
        assert_eq!(value.expose_secret(), "s3cret");

        std::env::remove_var("DESKBOT_TEST_SECRET");
    }

    #[tokio::test]
    async fn env_accessor_reports_missing_secret_as_not_found() {
        let error = EnvSecretAccessor
            .access("deskbot-absent-secret", None)
            .await
            .expect_err("missing variable must fail");
        assert!(matches!(error, SecretError::NotFound { ref name } if name == "deskbot-absent-secret"));
    }

    #[test]
    fn secret_payload_decodes_base64_utf8() {
        let decoded = decode_secret_payload("dG9rZW4tdmFsdWU=").expect("valid payload");
        assert_eq!(decoded.expose_secret(), "token-value");
    }

    #[test]
    fn secret_payload_rejects_invalid_base64() {
        assert!(matches!(decode_secret_payload("%%%"), Err(SecretError::Decode(_))));
    }
}
