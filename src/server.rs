use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Router,
};
use futures::{stream::Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::ai::flows::{DatePreferences, FilterInput, Generators};
use crate::bus::EventBus;
use crate::calendar::NewDateNight;
use crate::error::AppError;
use crate::feed::{Feed, FeedEvent};
use crate::identity;
use crate::outbox::Outbox;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub bus: Arc<EventBus>,
    pub outbox: Outbox,
    pub generators: Generators,
}

pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(store: Store, bus: Arc<EventBus>, outbox: Outbox, generators: Generators) -> Self {
        Self {
            state: Arc::new(AppState {
                store,
                bus,
                outbox,
                generators,
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/login", post(login_handler))
            .route("/chat/messages", post(send_message_handler))
            .route("/chat/feed", get(feed_handler))
            .route(
                "/calendar/events",
                get(list_date_nights_handler).post(add_date_night_handler),
            )
            .route("/ai/date-night-idea", post(date_night_idea_handler))
            .route("/ai/romantic-message", post(romantic_message_handler))
            .route("/ai/filter-message", post(filter_message_handler))
            .with_state(self.state.clone())
            .layer(CorsLayer::permissive())
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    secret: String,
}

/// The pet-name gate. On success the client persists the returned
/// participant as its identity marker; the server keeps no session.
async fn login_handler(
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let participant = identity::authenticate(&request.secret)?;
    info!("{} entered", participant.name);
    Ok(Json(json!({
        "success": true,
        "participant": participant,
        "partner": participant.other(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    text: String,
    sender_id: String,
}

/// Optimistic send: validate, enqueue, return 202 before the write
/// lands. The feed carries the acknowledged copy (or the failure).
async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let sender = identity::by_id(&request.sender_id)
        .ok_or_else(|| AppError::Auth("You need to whisper the secret name first.".into()))?;

    state.outbox.enqueue(&request.text, &sender)?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "success": true }))))
}

async fn feed_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::BoxError>>> {
    info!("New feed subscription established");

    let feed = Feed::new(state.store.clone(), state.bus.clone());
    let mut updates = Box::pin(feed.subscribe());

    let stream = async_stream::stream! {
        while let Some(item) = updates.next().await {
            match item {
                Ok(FeedEvent::Snapshot(snapshot)) => {
                    if let Ok(data) = serde_json::to_string(&snapshot) {
                        yield Ok(Event::default().event("snapshot").data(data));
                    }
                }
                Ok(FeedEvent::SendFailed { text, sender_id, reason }) => {
                    let data = json!({
                        "text": text,
                        "senderId": sender_id,
                        "reason": reason,
                    });
                    yield Ok(Event::default().event("send_failed").data(data.to_string()));
                }
                Err(e) => {
                    // Terminal: the subscription could not be (re)read.
                    yield Ok(Event::default().event("error").data(e.to_string()));
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn add_date_night_handler(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewDateNight>,
) -> Result<impl IntoResponse, AppError> {
    new.validate()?;

    let event = state
        .store
        .add_date_night(&new)
        .await
        .map_err(|e| AppError::RemoteWrite(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(event)))
}

async fn list_date_nights_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let events = state
        .store
        .date_nights()
        .await
        .map_err(|e| AppError::RemoteRead(e.to_string()))?;

    Ok(Json(events))
}

async fn date_night_idea_handler(
    State(state): State<Arc<AppState>>,
    Json(prefs): Json<DatePreferences>,
) -> Result<impl IntoResponse, AppError> {
    let data = state.generators.date_night_idea(&prefs).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn romantic_message_handler(
    State(state): State<Arc<AppState>>,
    Json(prefs): Json<DatePreferences>,
) -> Result<impl IntoResponse, AppError> {
    let data = state.generators.romantic_message(&prefs).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn filter_message_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<FilterInput>,
) -> Result<impl IntoResponse, AppError> {
    let data = state.generators.filter_chat_message(&input).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}
