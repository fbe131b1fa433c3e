use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use deskbot_chat::{cards, ChatEvent, ChatResponse, ConversationRouter};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookState {
    pub router: Arc<ConversationRouter>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/", post(webhook)).with_state(state)
}

/// Single webhook entry point. Always answers 200 with a renderable payload,
/// so the body is taken as raw bytes and parsed here rather than through the
/// `Json` extractor, which would reject malformed bodies with a plain 400
/// before this handler runs. A body the event model cannot parse gets an
/// error card carrying a correlation id instead of a platform-visible
/// failure.
pub async fn webhook(State(state): State<WebhookState>, body: Bytes) -> Json<ChatResponse> {
    let correlation_id = Uuid::new_v4().to_string();

    let event: ChatEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(error) => {
            warn!(
                event_name = "system.webhook.malformed_event",
                correlation_id = %correlation_id,
                error = %error,
                "event payload did not match the chat event model"
            );
            return Json(cards::error_card("could not read the chat event", &correlation_id));
        }
    };

    let response = state.router.handle(&event).await;
    info!(
        event_name = "system.webhook.handled",
        correlation_id = %correlation_id,
        event_type = ?event.event_type,
        response = %response.summary(),
        "webhook event handled"
    );
    Json(response)
}
