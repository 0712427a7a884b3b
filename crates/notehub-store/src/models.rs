//! Domain model structs persisted in the record store.
//!
//! The ordered reference lists (a user's uploaded notes and joined channels,
//! a channel's notes) are not carried on these structs; they are read through
//! the list helpers on [`Database`](crate::Database).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use notehub_shared::types::{ChannelId, NoteId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Identity key. Unique by an existence check at signup.
    pub email: String,
    /// Stored and compared in plain text.
    pub password: String,
    /// Recovery secret set at signup, plain text.
    pub security_pass: String,
    /// Always `true`; there is no verification flow.
    pub verified: bool,
    pub credits: i64,
    pub upload_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied at signup.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub security_pass: String,
}

// ---------------------------------------------------------------------------
// Note
// ---------------------------------------------------------------------------

/// Metadata of an uploaded document. The bytes live in the blob store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    /// Original file name as uploaded.
    pub file_name: String,
    /// Public URL, derived from `file_path`.
    pub file_url: String,
    /// Blob store key.
    pub file_path: String,
    pub regulation: String,
    pub year: String,
    pub topic: String,
    pub subject: String,
    pub subject_code: String,
    pub description: String,
    /// Target channel id as sent by the client, or `"none"`.
    pub channel: String,
    /// Uploader email.
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A private sharing group joined by code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    /// Join code, unique among channels.
    pub code: String,
    /// Creator email.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Membership entry. `username` and `email` are copies taken at join time
/// and are not refreshed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelMember {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

impl ChannelMember {
    /// Snapshot `user` as a member entry joining now.
    pub fn from_user(user: &User, is_admin: bool) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin,
            joined_at: crate::database::now_utc(),
        }
    }
}
