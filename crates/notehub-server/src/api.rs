use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::JsonRejection, DefaultBodyLimit, FromRequest, Multipart, Path, Request, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use notehub_shared::constants::MULTIPART_OVERHEAD;
use notehub_shared::invite::generate_channel_code;
use notehub_store::{Database, NewUser};

use crate::accounts::{self, NewAccount, UserProfile, UserSummary};
use crate::blob_store::{BlobError, BlobStore};
use crate::channels::{self, ChannelDetails, ChannelSummary};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::notes::{self, NoteSummary};
use crate::quota::QuotaGate;
use crate::uploads::{self, UploadOutcome, UploadRequest};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub blob_store: Arc<dyn BlobStore>,
    pub quota: QuotaGate,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let body_limit = state.config.max_upload_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health_check))
        .route("/test-storage", get(test_storage))
        .route("/check-email", post(check_email))
        .route("/signup", post(signup))
        .route("/verify-security-pass", post(verify_security_pass))
        .route("/login", post(login))
        .route("/user/:email", get(user_profile))
        .route("/update-password", post(update_password))
        .route("/create-channel", post(create_channel))
        .route("/join-channel", post(join_channel))
        .route("/user-channels/:email", get(user_channels))
        .route("/channel/:channel_id", get(channel_details))
        .route("/remove-user-from-channel", post(remove_user_from_channel))
        .route("/upload-note", post(upload_note))
        .route("/get-notes", get(get_notes))
        .route("/files/*path", get(serve_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request / response bodies ───

/// `Json` whose rejection is answered like every other client error, with a
/// 400 and a `{"message": ...}` body.
struct ApiJson<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ServerError {
    ServerError::BadRequest(rejection.body_text())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct MessageWith<T> {
    message: &'static str,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct UserEnvelope<T> {
    user: T,
}

#[derive(Serialize)]
struct ChannelEnvelope {
    channel: ChannelSummary,
}

#[derive(Serialize)]
struct EmailExistsResponse {
    exists: bool,
}

#[derive(Deserialize)]
struct EmailRequest {
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    username: String,
    email: String,
    password: String,
    security_pass: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecurityPassRequest {
    email: String,
    security_pass: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordRequest {
    email: String,
    new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChannelRequest {
    name: String,
    created_by: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinChannelRequest {
    code: String,
    user_email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveMemberRequest {
    channel_id: String,
    user_id: String,
    current_user_email: String,
}

// ─── Health ───

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn test_storage(State(state): State<AppState>) -> Response {
    match state.blob_store.probe().await {
        Ok(repository) => {
            info!(%repository, "Blob store connection successful");
            Json(serde_json::json!({
                "success": true,
                "message": "Storage connection successful",
                "repository": repository,
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Blob store connection failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Storage connection failed",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

// ─── Accounts ───

async fn check_email(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Json<EmailExistsResponse>, ServerError> {
    let db = state.db.lock().await;
    let exists = accounts::check_email_exists(&db, &req.email)?;
    Ok(Json(EmailExistsResponse { exists }))
}

async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<Json<MessageWith<UserEnvelope<NewAccount>>>, ServerError> {
    let new_user = NewUser {
        username: req.username,
        email: req.email,
        password: req.password,
        security_pass: req.security_pass,
    };
    let db = state.db.lock().await;
    let account = accounts::signup(&db, &new_user)?;
    Ok(Json(MessageWith {
        message: "Account created successfully! Remember your security password for account recovery.",
        body: UserEnvelope { user: account },
    }))
}

async fn verify_security_pass(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SecurityPassRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    let db = state.db.lock().await;
    accounts::verify_security_pass(&db, &req.email, &req.security_pass)?;
    Ok(Json(MessageResponse {
        message: "Security password verified successfully",
    }))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<MessageWith<UserEnvelope<UserSummary>>>, ServerError> {
    let db = state.db.lock().await;
    let summary = accounts::login(&db, &req.email, &req.password)?;
    Ok(Json(MessageWith {
        message: "Login successful!",
        body: UserEnvelope { user: summary },
    }))
}

async fn user_profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UserProfile>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(accounts::user_profile(&db, &email)?))
}

async fn update_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    let db = state.db.lock().await;
    accounts::update_password(&db, &req.email, &req.new_password)?;
    Ok(Json(MessageResponse {
        message: "Password updated successfully!",
    }))
}

// ─── Channels ───

async fn create_channel(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateChannelRequest>,
) -> Result<Json<MessageWith<ChannelEnvelope>>, ServerError> {
    let db = state.db.lock().await;
    let channel = channels::create_channel(&db, &req.name, &req.created_by, || {
        generate_channel_code(&mut rand::thread_rng())
    })?;
    Ok(Json(MessageWith {
        message: "Channel created successfully!",
        body: ChannelEnvelope { channel },
    }))
}

async fn join_channel(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<JoinChannelRequest>,
) -> Result<Json<MessageWith<ChannelEnvelope>>, ServerError> {
    let db = state.db.lock().await;
    let channel = channels::join_channel(&db, &req.code, &req.user_email)?;
    Ok(Json(MessageWith {
        message: "Successfully joined channel!",
        body: ChannelEnvelope { channel },
    }))
}

async fn user_channels(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<ChannelSummary>>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(channels::list_user_channels(&db, &email)?))
}

async fn channel_details(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelDetails>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(channels::channel_details(&db, &channel_id)?))
}

async fn remove_user_from_channel(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RemoveMemberRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    let db = state.db.lock().await;
    channels::remove_member(&db, &req.channel_id, &req.user_id, &req.current_user_email)?;
    Ok(Json(MessageResponse {
        message: "User removed from channel successfully",
    }))
}

// ─── Notes ───

async fn upload_note(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MessageWith<UploadOutcome>>, ServerError> {
    let request = UploadRequest::from_multipart(multipart, state.config.max_upload_size).await?;
    let outcome = uploads::upload_note(&state, request).await?;
    Ok(Json(MessageWith {
        message: "File uploaded successfully!",
        body: outcome,
    }))
}

async fn get_notes(State(state): State<AppState>) -> Result<Json<Vec<NoteSummary>>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(notes::list_notes(&db)?))
}

fn content_type_for(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    match lower.rsplit_once('.').map(|(_, ext)| ext) {
        Some("pdf") => "application/pdf",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Serve a blob kept by a store that is not publicly hosted.
async fn serve_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ServerError> {
    let data = match state.blob_store.read(&path).await {
        Ok(data) => data,
        Err(BlobError::NotFound(_) | BlobError::InvalidPath | BlobError::Unsupported) => {
            return Err(ServerError::BlobNotFound(path));
        }
        Err(e) => return Err(ServerError::Storage(e.to_string())),
    };
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], data).into_response())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn test_state(blob_store: Arc<dyn BlobStore>) -> AppState {
    let db = Database::open_in_memory().expect("in-memory database");
    AppState {
        db: Arc::new(Mutex::new(db)),
        blob_store,
        quota: QuotaGate::new(),
        config: Arc::new(ServerConfig::default()),
    }
}
