use std::collections::HashMap;
use std::convert::Infallible;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chat_core::ChatMessage;
use orchestrator::{ChatTurn, Notifier, Orchestration, Orchestrator, OrchestratorError};
use parley_database::{conversation, uploaded_file, Database, NewUploadedFile, UploadedFile};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

/// Buffered events per session channel before slow clients drop messages.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default bound on one whole chat request, in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

type AppOrchestrator = Orchestrator<HubNotifier>;

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<AppOrchestrator>,
    db: Database,
    hub: EventHub,
    upload_dir: PathBuf,
    request_timeout: std::time::Duration,
}

/// One inbound chat request after normalization from JSON or multipart.
#[derive(Debug, Default)]
struct ChatRequestData {
    system_prompt: Option<String>,
    message: String,
    model: Option<String>,
    temperature: Option<f32>,
    file: Option<UploadPart>,
    session_id: String,
}

#[derive(Debug)]
struct UploadPart {
    bytes: Vec<u8>,
    original_filename: String,
    content_type: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    user_message: String,
    assistant_reply: String,
    conversation_history: Vec<ChatMessage>,
    orchestration: Orchestration,
    #[serde(rename = "fileUrl")]
    file_url: Option<String>,
    #[serde(rename = "fileName")]
    file_name: Option<String>,
    #[serde(rename = "fileType")]
    file_type: Option<String>,
    #[serde(rename = "fileId")]
    file_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ConversationPayload {
    id: i64,
    session_id: String,
    title: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: String,
}

// ---------------------------------------------------------------------------
// Push events
// ---------------------------------------------------------------------------

/// Server-to-client push event, delivered over the session's SSE stream.
#[derive(Debug, Clone)]
enum PushEvent {
    Connected { session_id: String },
    StatusUpdate { message: String },
    TaskComplete { answer: String },
}

impl PushEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::StatusUpdate { .. } => "status_update",
            Self::TaskComplete { .. } => "task_complete",
        }
    }

    fn payload(&self) -> serde_json::Value {
        match self {
            Self::Connected { session_id } => serde_json::json!({ "session_id": session_id }),
            Self::StatusUpdate { message } => serde_json::json!({ "message": message }),
            Self::TaskComplete { answer } => serde_json::json!({ "answer": answer }),
        }
    }
}

/// Per-session broadcast channels backing the SSE event streams.
///
/// Publishing to a session with no subscribers is a silent no-op; delivery
/// is best-effort by design.
#[derive(Clone, Default)]
struct EventHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<PushEvent>>>>,
}

impl EventHub {
    async fn subscribe(&self, session_id: &str) -> broadcast::Receiver<PushEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    async fn publish(&self, session_id: &str, event: PushEvent) {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(session_id) {
            // Send fails only when every subscriber is gone
            let _ = sender.send(event);
        }
    }
}

/// Notifier implementation that feeds the event hub.
#[derive(Clone)]
struct HubNotifier {
    hub: EventHub,
}

#[async_trait::async_trait]
impl Notifier for HubNotifier {
    async fn status_update(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<(), OrchestratorError> {
        self.hub
            .publish(
                session_id,
                PushEvent::StatusUpdate {
                    message: message.to_string(),
                },
            )
            .await;
        Ok(())
    }

    async fn task_complete(
        &self,
        session_id: &str,
        answer: &str,
    ) -> Result<(), OrchestratorError> {
        self.hub
            .publish(
                session_id,
                PushEvent::TaskComplete {
                    answer: answer.to_string(),
                },
            )
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let addr = env::var("PARLEY_API_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let db_url =
        env::var("PARLEY_DB_URL").unwrap_or_else(|_| "sqlite:parley.db?mode=rwc".to_string());

    let db = Database::connect(&db_url).await.expect("database connection");
    db.migrate().await.expect("database migrations");

    let hub = EventHub::default();
    let orchestrator = Orchestrator::from_env(db.clone(), HubNotifier { hub: hub.clone() })
        .expect("pipeline configuration");

    let upload_dir = orchestrator.config().upload_dir.clone();
    std::fs::create_dir_all(&upload_dir).expect("upload directory");
    info!("Uploads directory at: {}", upload_dir.display());

    let request_timeout = std::time::Duration::from_secs(
        env::var("PARLEY_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        db,
        hub,
        upload_dir,
        request_timeout,
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/conversations/new", post(create_conversation))
        .route("/conversations/:session_id", get(get_conversation))
        .route("/uploads/:filename", get(serve_upload))
        .route("/events/:session_id", get(events))
        .route("/orchestrate", post(orchestrate))
        .with_state(state);

    let addr: SocketAddr = addr.parse().expect("Invalid PARLEY_API_ADDR");
    info!(%addr, "Parley API listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

async fn chat(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let payload = extract_request_data(&state, request).await?;

    if payload.message.is_empty() && payload.file.is_none() {
        return Err(ApiError::BadRequest("No valid request data".to_string()));
    }

    let session_id = payload.session_id.clone();
    info!("[/chat] session_id: {}", session_id);

    // Store the upload, if any, before classification so the file is
    // already listed for this session.
    let uploaded = match payload.file {
        Some(part) => Some(store_upload(&state, &session_id, part).await?),
        None => None,
    };

    // A bare upload still makes a turn: synthesize the user message
    let message = if payload.message.is_empty() {
        let name = uploaded
            .as_ref()
            .map(|f| f.original_filename.as_str())
            .unwrap_or("a file");
        format!(
            "User uploaded a file named '{}'. Acknowledge and respond with relevant instructions.",
            name
        )
    } else {
        payload.message
    };

    let turn = ChatTurn {
        session_id,
        message,
        model: payload.model,
        temperature: payload.temperature,
        system_prompt: payload.system_prompt,
    };

    // Every external call inside the pipeline carries its own timeout;
    // this bounds the request as a whole.
    let outcome = tokio::time::timeout(state.request_timeout, state.orchestrator.process(turn))
        .await
        .map_err(|_| ApiError::Internal("chat request timed out".to_string()))??;

    let response = ChatResponse {
        user_message: outcome.user_message,
        assistant_reply: outcome.assistant_reply,
        conversation_history: outcome.history,
        orchestration: outcome.orchestration,
        file_url: uploaded.as_ref().map(|f| f.file_url.clone()),
        file_name: uploaded.as_ref().map(|f| f.original_filename.clone()),
        file_type: uploaded.as_ref().map(|f| f.content_type.clone()),
        file_id: uploaded.as_ref().map(|f| f.id),
    };

    Ok(Json(response).into_response())
}

/// Normalize a JSON or multipart chat request into [`ChatRequestData`].
async fn extract_request_data(
    state: &AppState,
    request: Request,
) -> Result<ChatRequestData, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart form: {}", e)))?;
        payload_from_multipart(multipart).await
    } else {
        let Json(body) = Json::<serde_json::Value>::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
        Ok(payload_from_json(&body))
    }
}

fn payload_from_json(body: &serde_json::Value) -> ChatRequestData {
    ChatRequestData {
        system_prompt: body
            .get("system_prompt")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        message: body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        model: body
            .get("model")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        temperature: parse_temperature(body.get("temperature")),
        file: None,
        session_id: session_from_json(body),
    }
}

fn session_from_json(body: &serde_json::Value) -> String {
    body.get("room")
        .or_else(|| body.get("session_id"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Parse a temperature value; anything unusable silently falls back to the
/// configured default.
fn parse_temperature(value: Option<&serde_json::Value>) -> Option<f32> {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f as f32),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

async fn payload_from_multipart(mut multipart: Multipart) -> Result<ChatRequestData, ApiError> {
    let mut data = ChatRequestData {
        session_id: Uuid::new_v4().to_string(),
        ..ChatRequestData::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart form: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "system_prompt" => {
                data.system_prompt = field.text().await.ok().filter(|s| !s.is_empty());
            }
            "message" => {
                data.message = field.text().await.unwrap_or_default();
            }
            "model" => {
                data.model = field.text().await.ok().filter(|s| !s.is_empty());
            }
            "temperature" => {
                data.temperature = field.text().await.ok().and_then(|t| t.parse().ok());
            }
            "room" | "session_id" => {
                if let Ok(text) = field.text().await {
                    if !text.is_empty() {
                        data.session_id = text;
                    }
                }
            }
            "file" => {
                let original_filename = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
                    .to_vec();
                if !bytes.is_empty() {
                    data.file = Some(UploadPart {
                        bytes,
                        original_filename,
                        content_type,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(data)
}

/// Write the upload to disk under a fresh UUID-prefixed key and register it.
async fn store_upload(
    state: &AppState,
    session_id: &str,
    part: UploadPart,
) -> Result<UploadedFile, ApiError> {
    let safe_name = sanitize_filename(&part.original_filename);
    let storage_key = format!("{}_{}", Uuid::new_v4(), safe_name);
    let path = state.upload_dir.join(&storage_key);

    tokio::fs::write(&path, &part.bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store upload: {}", e)))?;

    let record = uploaded_file::register(
        state.db.pool(),
        &NewUploadedFile {
            session_id: session_id.to_string(),
            filename: storage_key.clone(),
            original_filename: safe_name,
            file_url: format!("/uploads/{}", storage_key),
            content_type: part.content_type,
        },
    )
    .await?;

    info!("Stored upload {} for session {}", storage_key, session_id);
    Ok(record)
}

/// Reduce a client-supplied filename to a safe single path component.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = safe.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

async fn get_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conversation = conversation::get_by_session(state.db.pool(), &session_id).await?;

    let payload = conversation.map(|c| ConversationPayload {
        id: c.id,
        session_id: c.session_id,
        title: c.title,
        timestamp: c.created_at,
    });

    Ok(Json(serde_json::json!({ "conversation": payload })))
}

async fn create_conversation(
    State(state): State<AppState>,
    body: Option<Json<serde_json::Value>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let title = body
        .as_ref()
        .and_then(|Json(v)| v.get("title"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(conversation::DEFAULT_TITLE)
        .to_string();

    let session_id = Uuid::new_v4().to_string();
    let created = conversation::create(state.db.pool(), &session_id, &title).await?;

    Ok(Json(serde_json::json!({
        "id": created.id,
        "session_id": created.session_id,
        "title": created.title,
    })))
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Response, ApiError> {
    let Some(session_id) = query.session_id else {
        return Err(ApiError::NotFound("File not found".to_string()));
    };

    let safe_name = sanitize_filename(&filename);
    let record = uploaded_file::get_for_session(state.db.pool(), &safe_name, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let path = state.upload_dir.join(&record.filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("File not found".to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, record.content_type)],
        bytes,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Push channel
// ---------------------------------------------------------------------------

async fn events(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.hub.subscribe(&session_id).await;
    info!("[events] client joined room: {}", session_id);

    let connected = PushEvent::Connected { session_id };
    let initial = tokio_stream::once(Ok(to_sse_event(&connected)));

    let live = BroadcastStream::new(receiver).filter_map(|result| match result {
        Ok(event) => Some(Ok(to_sse_event(&event))),
        // Slow subscribers skip missed events rather than erroring out
        Err(_) => None,
    });

    Sse::new(initial.chain(live)).keep_alive(KeepAlive::default())
}

fn to_sse_event(event: &PushEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.payload().to_string())
}

#[derive(Debug, Deserialize)]
struct OrchestrateRequest {
    room: Option<String>,
    action: Option<String>,
}

async fn orchestrate(
    State(state): State<AppState>,
    Json(request): Json<OrchestrateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (Some(room), Some(action)) = (request.room, request.action) else {
        return Err(ApiError::BadRequest(
            "Missing session_id or action".to_string(),
        ));
    };

    info!("[orchestrate] event received: {}", action);
    state
        .hub
        .publish(
            &room,
            PushEvent::StatusUpdate {
                message: format!("Processing action: {}", action),
            },
        )
        .await;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

// ---------------------------------------------------------------------------
// Error boundary
// ---------------------------------------------------------------------------

/// Outermost error boundary: every failure becomes an `{error}` JSON body
/// and the process keeps serving.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<parley_database::DatabaseError> for ApiError {
    fn from(err: parley_database::DatabaseError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(detail) => {
                warn!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
