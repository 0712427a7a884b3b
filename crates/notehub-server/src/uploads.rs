//! Upload workflow: multipart intake, blob storage, note persistence and
//! uploader credit.
//!
//! The steps after the blob write are independent record updates. A failure
//! part way leaves the earlier writes in place; nothing is rolled back.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use notehub_shared::files::{note_blob_path, FileType};
use notehub_shared::types::{ChannelId, ChannelTarget, NoteId};
use notehub_store::{now_utc, Note, StoreError};

use crate::accounts::find_user;
use crate::api::AppState;
use crate::blob_store::BlobError;
use crate::error::ServerError;

pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Descriptive fields sent alongside the file.
#[derive(Debug, Default, Clone)]
pub struct NoteFields {
    pub regulation: String,
    pub year: String,
    pub topic: String,
    pub subject: String,
    pub subject_code: String,
    pub description: String,
}

pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub fields: NoteFields,
    pub channel: ChannelTarget,
    pub uploaded_by: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderTotals {
    pub credits: i64,
    pub upload_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub file_url: String,
    pub credits_earned: i64,
    pub user: UploaderTotals,
}

fn multipart_error(e: MultipartError, max_upload_size: usize) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::FileTooLarge {
            max: max_upload_size,
        }
    } else {
        ServerError::BadRequest(format!("Multipart error: {}", e.body_text()))
    }
}

impl UploadRequest {
    /// Collect the form. Unknown fields are ignored; a second `file` part
    /// replaces the first.
    pub async fn from_multipart(
        mut multipart: Multipart,
        max_upload_size: usize,
    ) -> Result<Self, ServerError> {
        let mut file = None;
        let mut fields = NoteFields::default();
        let mut channel = None;
        let mut uploaded_by = String::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max_upload_size))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_upload_size))?;
                file = Some(UploadedFile { file_name, data });
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_upload_size))?;
            match name.as_str() {
                "regulation" => fields.regulation = value,
                "year" => fields.year = value,
                "topic" => fields.topic = value,
                "subject" => fields.subject = value,
                "subjectCode" => fields.subject_code = value,
                "description" => fields.description = value,
                "channel" => channel = Some(value),
                "uploadedBy" => uploaded_by = value,
                other => debug!(field = other, "Ignoring unknown upload field"),
            }
        }

        Ok(Self {
            file,
            fields,
            channel: ChannelTarget::from_form(channel.as_deref()),
            uploaded_by,
        })
    }
}

pub async fn upload_note(state: &AppState, req: UploadRequest) -> Result<UploadOutcome, ServerError> {
    let max = state.config.max_upload_size;
    let file = req.file.ok_or(ServerError::MissingFile)?;
    if file.data.len() > max {
        return Err(ServerError::FileTooLarge { max });
    }

    if let Err(wait) = state.quota.check().await {
        return Err(ServerError::QuotaExceeded {
            retry_after: Some(wait),
        });
    }

    let uploader = {
        let db = state.db.lock().await;
        find_user(&db, &req.uploaded_by)?
    };

    let uploaded_at = now_utc();
    let file_path = note_blob_path(uploaded_at.timestamp_millis(), &file.file_name);
    let title = if req.fields.topic.trim().is_empty() {
        file.file_name.as_str()
    } else {
        req.fields.topic.as_str()
    };
    let message = format!("Upload note: {title}");

    let file_url = match state.blob_store.put(&file_path, &file.data, &message).await {
        Ok(url) => url,
        Err(BlobError::QuotaExhausted) => {
            state.quota.trip(state.config.quota_cooldown).await;
            return Err(ServerError::QuotaExceeded { retry_after: None });
        }
        Err(e) => return Err(ServerError::Storage(e.to_string())),
    };

    let file_type = FileType::from_file_name(&file.file_name);
    let credits_earned = file_type.credits();

    let note = Note {
        id: NoteId::new(),
        file_name: file.file_name,
        file_url: file_url.clone(),
        file_path,
        regulation: req.fields.regulation,
        year: req.fields.year,
        topic: req.fields.topic,
        subject: req.fields.subject,
        subject_code: req.fields.subject_code,
        description: req.fields.description,
        channel: req.channel.as_stored().to_string(),
        uploaded_by: uploader.email.clone(),
        uploaded_at,
    };

    let db = state.db.lock().await;
    db.insert_note(&note)?;

    match db.record_upload(uploader.id, note.id, credits_earned) {
        Ok(()) => {}
        Err(StoreError::NotFound) => return Err(ServerError::UserNotFound),
        Err(e) => return Err(e.into()),
    }

    if let ChannelTarget::Channel(raw) = &req.channel {
        match ChannelId::parse(raw) {
            Some(channel_id) => match db.channel_by_id(channel_id) {
                Ok(channel) => {
                    db.append_channel_note(channel.id, note.id)?;
                    debug!(channel_id = %channel.id, note_id = %note.id, "Note added to channel");
                }
                Err(StoreError::NotFound) => {
                    warn!(channel = %raw, "Upload targeted an unknown channel")
                }
                Err(e) => return Err(e.into()),
            },
            None => warn!(channel = %raw, "Upload targeted a malformed channel id"),
        }
    }

    let user = db.user_by_id(uploader.id)?;

    info!(
        note_id = %note.id,
        uploader = %user.email,
        file_type = file_type.as_str(),
        credits_earned,
        "Note uploaded"
    );

    Ok(UploadOutcome {
        file_url,
        credits_earned,
        user: UploaderTotals {
            credits: user.credits,
            upload_count: user.upload_count,
        },
    })
}
