use std::sync::Arc;

use deskbot_chat::ConversationRouter;
use deskbot_core::config::{AppConfig, ConfigError, SecretProvider};
use deskbot_core::{EmptyKnownIssueIndex, InMemorySessionStore};
use deskbot_helpdesk::{
    EnvSecretAccessor, GoogleSecretManagerAccessor, HelpdeskError, SecretAccessor, SecretError,
    ZendeskClient,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub router: Arc<ConversationRouter>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("secret accessor setup failed: {0}")]
    Secrets(#[source] SecretError),
    #[error("helpdesk client setup failed: {0}")]
    Helpdesk(#[source] HelpdeskError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let secrets = secret_accessor(&config)?;
    let tickets = Arc::new(
        ZendeskClient::from_config(&config.helpdesk, secrets).map_err(BootstrapError::Helpdesk)?,
    );
    info!(
        event_name = "system.bootstrap.helpdesk_ready",
        correlation_id = "bootstrap",
        subdomain = %config.helpdesk.subdomain,
        "helpdesk client constructed"
    );

    let router = Arc::new(ConversationRouter::new(
        Arc::new(InMemorySessionStore::new()),
        tickets,
        Arc::new(EmptyKnownIssueIndex),
    ));

    Ok(Application { config, router })
}

fn secret_accessor(config: &AppConfig) -> Result<Arc<dyn SecretAccessor>, BootstrapError> {
    match config.secrets.provider {
        SecretProvider::Google => {
            // validate() guarantees a project id when the provider is google
            let project_id = config.secrets.project_id.clone().unwrap_or_default();
            let accessor = GoogleSecretManagerAccessor::new(project_id, &config.secrets.version)
                .map_err(BootstrapError::Secrets)?;
            Ok(Arc::new(accessor))
        }
        SecretProvider::Env => Ok(Arc::new(EnvSecretAccessor)),
    }
}
