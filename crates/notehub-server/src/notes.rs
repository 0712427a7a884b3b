//! Note library views.

use chrono::{DateTime, Utc};
use serde::Serialize;

use notehub_shared::files::FileType;
use notehub_shared::types::NoteId;
use notehub_store::{Database, Note};

use crate::error::ServerError;

/// Entry of the global library listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    #[serde(rename = "_id")]
    pub id: NoteId,
    pub file_name: String,
    pub file_url: String,
    pub regulation: String,
    pub year: String,
    pub topic: String,
    pub subject: String,
    pub subject_code: String,
    pub description: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_type: FileType,
}

impl From<Note> for NoteSummary {
    fn from(note: Note) -> Self {
        let file_type = FileType::from_file_name(&note.file_name);
        Self {
            id: note.id,
            file_name: note.file_name,
            file_url: note.file_url,
            regulation: note.regulation,
            year: note.year,
            topic: note.topic,
            subject: note.subject,
            subject_code: note.subject_code,
            description: note.description,
            uploaded_by: note.uploaded_by,
            uploaded_at: note.uploaded_at,
            file_type,
        }
    }
}

/// A note as shown inside a channel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelNoteView {
    pub id: NoteId,
    /// Topic, or the file name when no topic was given.
    pub title: String,
    pub subject: String,
    pub subject_code: String,
    pub regulation: String,
    pub year: String,
    pub description: String,
    pub file_type: FileType,
    pub uploaded_by: String,
    /// `M/D/YYYY`
    pub upload_date: String,
    pub file_url: String,
}

impl From<Note> for ChannelNoteView {
    fn from(note: Note) -> Self {
        let file_type = FileType::from_file_name(&note.file_name);
        let title = if note.topic.trim().is_empty() {
            note.file_name
        } else {
            note.topic
        };
        Self {
            id: note.id,
            title,
            subject: note.subject,
            subject_code: note.subject_code,
            regulation: note.regulation,
            year: note.year,
            description: note.description,
            file_type,
            uploaded_by: note.uploaded_by,
            upload_date: note.uploaded_at.format("%-m/%-d/%Y").to_string(),
            file_url: note.file_url,
        }
    }
}

/// Every note, newest first.
pub fn list_notes(db: &Database) -> Result<Vec<NoteSummary>, ServerError> {
    Ok(db.list_notes()?.into_iter().map(NoteSummary::from).collect())
}
