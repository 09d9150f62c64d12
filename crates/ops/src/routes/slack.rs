//! Slack webhook handlers.
//!
//! Every request is verified against the signing secret, acknowledged right
//! away and handled on a spawned task; Slack retries deliveries that take
//! longer than three seconds.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{debug, info, instrument, warn};

use crate::approval::{APPROVAL_BLOCK_ID, RESUME_ACTION_ID};
use crate::error::AppError;
use crate::slack::{Event, EventEnvelope, InteractionPayload};
use crate::state::AppState;

const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
const SIGNATURE_HEADER: &str = "X-Slack-Signature";
const RETRY_HEADER: &str = "X-Slack-Retry-Num";

/// Create Slack webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slack/events", post(handle_event))
        .route("/slack/interactions", post(handle_interaction))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn verify(state: &AppState, headers: &HeaderMap, body: &str) -> Result<(), AppError> {
    let timestamp = header(headers, TIMESTAMP_HEADER)
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;
    let signature = header(headers, SIGNATURE_HEADER)
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    state
        .slack()
        .verify_signature(timestamp, body, signature)
        .map_err(|e| AppError::Unauthorized(e.to_string()))
}

/// Handle an Events API delivery.
#[instrument(skip(state, headers, body))]
async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, AppError> {
    verify(&state, &headers, &body)?;

    if let Some(retry) = header(&headers, RETRY_HEADER) {
        debug!(retry, "Ignoring Slack retry");
        return Ok(StatusCode::OK.into_response());
    }

    let envelope: EventEnvelope = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse event: {e}")))?;

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("Answering URL verification");
            return Ok(challenge.into_response());
        }
        EventEnvelope::EventCallback { event_id, event } => {
            debug!(event_id = event_id.as_deref().unwrap_or_default(), "Event received");
            let assistant = state.assistant().clone();
            match event {
                Event::AssistantThreadStarted { assistant_thread } => {
                    tokio::spawn(async move {
                        assistant.thread_started(&assistant_thread).await;
                    });
                }
                Event::Message(message) => {
                    tokio::spawn(async move {
                        assistant.user_message(&message).await;
                    });
                }
                Event::Other => {}
            }
        }
        EventEnvelope::Other => {}
    }

    Ok(StatusCode::OK.into_response())
}

/// Handle an interactivity delivery (button clicks).
///
/// Only the approval button is handled. Returns 200 for anything that
/// passes verification so Slack does not show an error to the user.
#[instrument(skip(state, headers, body))]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    verify(&state, &headers, &body)?;

    let payload = url::form_urlencoded::parse(body.as_bytes())
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| AppError::BadRequest("Missing payload".into()))?;

    let payload: InteractionPayload = serde_json::from_str(&payload)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse payload: {e}")))?;

    let approval = payload.actions.into_iter().find(|action| {
        action.action_id == RESUME_ACTION_ID
            && action.block_id.as_deref() == Some(APPROVAL_BLOCK_ID)
    });
    let Some(action) = approval else {
        debug!(kind = %payload.interaction_type, "Ignoring interaction");
        return Ok(StatusCode::OK);
    };
    let Some(response_url) = payload.response_url else {
        warn!(user = %payload.user.id, "Approval click without response_url");
        return Ok(StatusCode::OK);
    };

    info!(user = %payload.user.id, "Approval clicked");
    let assistant = state.assistant().clone();
    tokio::spawn(async move {
        assistant
            .approval_clicked(action.value.as_deref(), &response_url)
            .await;
    });

    Ok(StatusCode::OK)
}
