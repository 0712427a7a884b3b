//! CRUD operations for [`User`] records and their reference lists.

use rusqlite::{params, OptionalExtension};

use notehub_shared::types::{ChannelId, NoteId, UserId};

use crate::database::{decode_ts, decode_uuid, encode_ts, now_utc, Database};
use crate::error::{Result, StoreError};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, password, security_pass, verified, credits, \
                            upload_count, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user after checking that the email is free.
    ///
    /// The check and the insert are separate statements; email uniqueness is
    /// not a schema constraint.
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        if self.email_exists(&new_user.email)? {
            return Err(StoreError::Conflict {
                resource: "user",
                field: "email",
                value: new_user.email.clone(),
            });
        }

        let user = User {
            id: UserId::new(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password: new_user.password.clone(),
            security_pass: new_user.security_pass.clone(),
            verified: true,
            credits: 0,
            upload_count: 0,
            created_at: now_utc(),
        };

        self.conn().execute(
            "INSERT INTO users (id, username, email, password, security_pass, verified,
                                credits, upload_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password,
                user.security_pass,
                user.verified as i32,
                user.credits,
                user.upload_count,
                encode_ts(&user.created_at),
            ],
        )?;

        Ok(user)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE email = ?1 LIMIT 1",
                params![email],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 LIMIT 1"),
                params![email],
                row_to_user,
            )
            .map_err(StoreError::from_lookup)
    }

    pub fn user_by_id(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(StoreError::from_lookup)
    }

    /// Channel ids the user has joined, oldest first.
    pub fn joined_channels(&self, id: UserId) -> Result<Vec<ChannelId>> {
        let mut stmt = self.conn().prepare(
            "SELECT channel_id FROM user_joined_channels WHERE user_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            let raw: String = row.get(0)?;
            decode_uuid(0, &raw).map(ChannelId)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Note ids the user has uploaded, oldest first.
    pub fn uploaded_notes(&self, id: UserId) -> Result<Vec<NoteId>> {
        let mut stmt = self.conn().prepare(
            "SELECT note_id FROM user_uploaded_notes WHERE user_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            let raw: String = row.get(0)?;
            decode_uuid(0, &raw).map(NoteId)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the stored password. Returns `false` if no such user.
    pub fn update_password(&self, id: UserId, new_password: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET password = ?1 WHERE id = ?2",
            params![new_password, id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Credit an upload: bump `credits` and `upload_count`, then append the
    /// note to the uploaded list. Two independent writes.
    pub fn record_upload(&self, id: UserId, note_id: NoteId, credits: i64) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET credits = credits + ?1, upload_count = upload_count + 1
             WHERE id = ?2",
            params![credits, id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.conn().execute(
            "INSERT INTO user_uploaded_notes (user_id, note_id) VALUES (?1, ?2)",
            params![id.to_string(), note_id.to_string()],
        )?;
        Ok(())
    }

    pub fn add_joined_channel(&self, id: UserId, channel_id: ChannelId) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_joined_channels (user_id, channel_id) VALUES (?1, ?2)",
            params![id.to_string(), channel_id.to_string()],
        )?;
        Ok(())
    }

    /// Drop every occurrence of `channel_id` from the user's joined list.
    /// Returns `true` if anything was removed.
    pub fn remove_joined_channel(&self, id: UserId, channel_id: ChannelId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM user_joined_channels WHERE user_id = ?1 AND channel_id = ?2",
            params![id.to_string(), channel_id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let verified: i32 = row.get(5)?;
    let created_str: String = row.get(8)?;

    Ok(User {
        id: UserId(decode_uuid(0, &id_str)?),
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        security_pass: row.get(4)?,
        verified: verified != 0,
        credits: row.get(6)?,
        upload_count: row.get(7)?,
        created_at: decode_ts(8, &created_str)?,
    })
}
