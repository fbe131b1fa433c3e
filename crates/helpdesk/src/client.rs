use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deskbot_core::config::HelpdeskConfig;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::secrets::{SecretAccessor, SecretError};

/// Ticket fields needed for display. Never cached; always fetched fresh.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Ticket {
    pub id: u64,
    pub subject: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    #[serde(default = "default_public")]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<u64>,
}

fn default_public() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTicket {
    pub subject: String,
    pub body: String,
    pub requester_name: String,
    pub requester_email: String,
    pub custom_fields: Option<Vec<CustomField>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CustomField {
    pub id: u64,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum HelpdeskError {
    #[error("ticket not found")]
    NotFound,
    #[error("helpdesk request timed out; please try again")]
    Timeout,
    #[error("helpdesk request failed with status {status}: {detail}")]
    Upstream { status: u16, detail: String },
    #[error("helpdesk transport failure: {0}")]
    Transport(String),
    #[error(transparent)]
    Secret(#[from] SecretError),
}

/// The four helpdesk operations the bot performs. No retries anywhere: a
/// failed call surfaces to the user, who re-issues the request.
#[async_trait]
pub trait TicketService: Send + Sync {
    async fn fetch_ticket(&self, ticket_id: &str) -> Result<Ticket, HelpdeskError>;
    async fn create_ticket(&self, request: NewTicket) -> Result<Ticket, HelpdeskError>;
    async fn add_note(
        &self,
        ticket_id: &str,
        body: &str,
        public: bool,
    ) -> Result<Ticket, HelpdeskError>;
    async fn list_comments(&self, ticket_id: &str) -> Result<Vec<Comment>, HelpdeskError>;
}

pub struct ZendeskClient {
    http: reqwest::Client,
    base_url: String,
    auth_email: String,
    token_secret_id: String,
    secrets: Arc<dyn SecretAccessor>,
    token: OnceCell<SecretString>,
}

impl ZendeskClient {
    pub fn from_config(
        config: &HelpdeskConfig,
        secrets: Arc<dyn SecretAccessor>,
    ) -> Result<Self, HelpdeskError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| HelpdeskError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base_url: format!("https://{}.zendesk.com/api/v2", config.subdomain),
            auth_email: config.auth_email.clone(),
            token_secret_id: config.token_secret_id.clone(),
            secrets,
            token: OnceCell::new(),
        })
    }

    async fn api_token(&self) -> Result<&SecretString, HelpdeskError> {
        self.token
            .get_or_try_init(|| async {
                debug!(
                    event_name = "helpdesk.token.fetch",
                    secret_id = %self.token_secret_id,
                    "fetching helpdesk API token from secret store"
                );
                self.secrets.access(&self.token_secret_id, None).await
            })
            .await
            .map_err(HelpdeskError::from)
    }

    fn ticket_url(&self, ticket_id: &str) -> String {
        format!("{}/tickets/{ticket_id}.json", self.base_url)
    }

    fn tickets_url(&self) -> String {
        format!("{}/tickets.json", self.base_url)
    }

    fn comments_url(&self, ticket_id: &str) -> String {
        format!("{}/tickets/{ticket_id}/comments.json", self.base_url)
    }

    fn token_username(&self) -> String {
        format!("{}/token", self.auth_email)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, HelpdeskError> {
        let token = self.api_token().await?;
        let response = request
            .basic_auth(self.token_username(), Some(token.expose_secret()))
            .send()
            .await
            .map_err(map_request_error)?;

        if let Some(error) = classify_status(response.status()) {
            let detail = response.text().await.unwrap_or_default();
            return Err(match error {
                HelpdeskError::Upstream { status, .. } => {
                    HelpdeskError::Upstream { status, detail: truncate_detail(&detail) }
                }
                other => other,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl TicketService for ZendeskClient {
    async fn fetch_ticket(&self, ticket_id: &str) -> Result<Ticket, HelpdeskError> {
        let response = self.send(self.http.get(self.ticket_url(ticket_id))).await?;
        let envelope: TicketEnvelope =
            response.json().await.map_err(map_request_error)?;
        Ok(envelope.ticket)
    }

    async fn create_ticket(&self, request: NewTicket) -> Result<Ticket, HelpdeskError> {
        let body = CreateTicketBody::from(&request);
        let response = self.send(self.http.post(self.tickets_url()).json(&body)).await?;
        let envelope: TicketEnvelope =
            response.json().await.map_err(map_request_error)?;
        Ok(envelope.ticket)
    }

    async fn add_note(
        &self,
        ticket_id: &str,
        body: &str,
        public: bool,
    ) -> Result<Ticket, HelpdeskError> {
        let payload = NoteBody::new(body, public);
        let response =
            self.send(self.http.put(self.ticket_url(ticket_id)).json(&payload)).await?;
        let envelope: TicketEnvelope =
            response.json().await.map_err(map_request_error)?;
        Ok(envelope.ticket)
    }

    async fn list_comments(&self, ticket_id: &str) -> Result<Vec<Comment>, HelpdeskError> {
        let response = self.send(self.http.get(self.comments_url(ticket_id))).await?;
        let envelope: CommentsEnvelope =
            response.json().await.map_err(map_request_error)?;
        Ok(envelope.comments)
    }
}

fn map_request_error(err: reqwest::Error) -> HelpdeskError {
    if err.is_timeout() {
        HelpdeskError::Timeout
    } else {
        HelpdeskError::Transport(err.to_string())
    }
}

fn classify_status(status: StatusCode) -> Option<HelpdeskError> {
    if status == StatusCode::NOT_FOUND {
        return Some(HelpdeskError::NotFound);
    }
    if !status.is_success() {
        return Some(HelpdeskError::Upstream { status: status.as_u16(), detail: String::new() });
    }
    None
}

fn truncate_detail(detail: &str) -> String {
    const MAX_DETAIL_CHARS: usize = 500;
    if detail.chars().count() <= MAX_DETAIL_CHARS {
        detail.to_owned()
    } else {
        detail.chars().take(MAX_DETAIL_CHARS).collect()
    }
}

#[derive(Debug, Deserialize)]
struct TicketEnvelope {
    ticket: Ticket,
}

#[derive(Debug, Deserialize)]
struct CommentsEnvelope {
    comments: Vec<Comment>,
}

#[derive(Debug, Serialize)]
struct CreateTicketBody {
    ticket: CreateTicketPayload,
}

#[derive(Debug, Serialize)]
struct CreateTicketPayload {
    subject: String,
    comment: CommentBody,
    requester: RequesterPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_fields: Option<Vec<CustomField>>,
}

#[derive(Debug, Serialize)]
struct CommentBody {
    body: String,
}

#[derive(Debug, Serialize)]
struct RequesterPayload {
    name: String,
    email: String,
}

impl From<&NewTicket> for CreateTicketBody {
    fn from(request: &NewTicket) -> Self {
        Self {
            ticket: CreateTicketPayload {
                subject: request.subject.clone(),
                comment: CommentBody { body: request.body.clone() },
                requester: RequesterPayload {
                    name: request.requester_name.clone(),
                    email: request.requester_email.clone(),
                },
                custom_fields: request.custom_fields.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct NoteBody {
    ticket: NotePayload,
}

#[derive(Debug, Serialize)]
struct NotePayload {
    comment: NoteComment,
}

#[derive(Debug, Serialize)]
struct NoteComment {
    body: String,
    public: bool,
}

impl NoteBody {
    fn new(body: &str, public: bool) -> Self {
        Self { ticket: NotePayload { comment: NoteComment { body: body.to_owned(), public } } }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use deskbot_core::config::HelpdeskConfig;
    use reqwest::StatusCode;
    use secrecy::SecretString;
    use serde_json::json;

    use super::{
        classify_status, truncate_detail, CreateTicketBody, CustomField, HelpdeskError, NewTicket,
        NoteBody, ZendeskClient,
    };
    use crate::secrets::{SecretAccessor, SecretError};

    struct FixedSecretAccessor;

    #[async_trait]
    impl SecretAccessor for FixedSecretAccessor {
        async fn access(
            &self,
            _secret_id: &str,
            _version: Option<&str>,
        ) -> Result<SecretString, SecretError> {
            Ok("api-token".to_string().into())
        }
    }

    fn test_client() -> ZendeskClient {
        let config = HelpdeskConfig {
            subdomain: "harborpoint".to_string(),
            auth_email: "servicedesk@harborpoint.health".to_string(),
            token_secret_id: "helpdesk-api-token".to_string(),
            timeout_secs: 20,
        };
        ZendeskClient::from_config(&config, Arc::new(FixedSecretAccessor))
            .expect("client should build")
    }

    #[test]
    fn urls_follow_the_ticket_api_shape() {
        let client = test_client();
        assert_eq!(
            client.ticket_url("42"),
            "https://harborpoint.zendesk.com/api/v2/tickets/42.json"
        );
        assert_eq!(client.tickets_url(), "https://harborpoint.zendesk.com/api/v2/tickets.json");
        assert_eq!(
            client.comments_url("42"),
            "https://harborpoint.zendesk.com/api/v2/tickets/42/comments.json"
        );
    }

    #[test]
    fn token_auth_uses_email_token_username() {
        assert_eq!(test_client().token_username(), "servicedesk@harborpoint.health/token");
    }

    #[test]
    fn create_body_matches_wire_shape_and_omits_absent_custom_fields() {
        let body = CreateTicketBody::from(&NewTicket {
            subject: "New ticket from Jo".to_string(),
            body: "User provided details: portal stuck".to_string(),
            requester_name: "Jo".to_string(),
            requester_email: "jo@harborpoint.health".to_string(),
            custom_fields: None,
        });

        let value = serde_json::to_value(&body).expect("serializable");
        assert_eq!(
            value,
            json!({
                "ticket": {
                    "subject": "New ticket from Jo",
                    "comment": { "body": "User provided details: portal stuck" },
                    "requester": { "name": "Jo", "email": "jo@harborpoint.health" }
                }
            })
        );
    }

    #[test]
    fn create_body_carries_custom_fields_when_present() {
        let body = CreateTicketBody::from(&NewTicket {
            subject: "s".to_string(),
            body: "b".to_string(),
            requester_name: "n".to_string(),
            requester_email: "e@x.com".to_string(),
            custom_fields: Some(vec![CustomField { id: 360001, value: "portal".to_string() }]),
        });

        let value = serde_json::to_value(&body).expect("serializable");
        assert_eq!(
            value["ticket"]["custom_fields"],
            json!([{ "id": 360001, "value": "portal" }])
        );
    }

    #[test]
    fn note_body_matches_wire_shape() {
        let value = serde_json::to_value(NoteBody::new("internal note", false))
            .expect("serializable");
        assert_eq!(
            value,
            json!({ "ticket": { "comment": { "body": "internal note", "public": false } } })
        );
    }

    #[test]
    fn missing_ticket_maps_to_not_found() {
        assert!(matches!(classify_status(StatusCode::NOT_FOUND), Some(HelpdeskError::NotFound)));
    }

    #[test]
    fn other_failures_map_to_upstream_with_status() {
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(HelpdeskError::Upstream { status: 500, .. })
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            Some(HelpdeskError::Upstream { status: 422, .. })
        ));
    }

    #[test]
    fn success_statuses_pass_through() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(classify_status(StatusCode::CREATED).is_none());
    }

    #[test]
    fn upstream_detail_is_bounded() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_detail(&long).chars().count(), 500);
        assert_eq!(truncate_detail("short"), "short");
    }

    #[test]
    fn timeout_error_tells_the_user_to_retry() {
        assert!(HelpdeskError::Timeout.to_string().contains("try again"));
    }
}
