//! CRUD operations for [`Channel`] records, their member snapshots and their
//! note lists.

use rusqlite::{params, OptionalExtension};

use notehub_shared::types::{ChannelId, NoteId, UserId};

use crate::database::{decode_ts, decode_uuid, encode_ts, Database};
use crate::error::{Result, StoreError};
use crate::models::{Channel, ChannelMember};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new channel and its first member.
    ///
    /// A code already taken by another channel is reported as
    /// [`StoreError::Conflict`] by the UNIQUE constraint, even if the caller's
    /// own availability check raced.
    pub fn create_channel(&self, channel: &Channel, creator: &ChannelMember) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO channels (id, name, code, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    channel.id.to_string(),
                    channel.name,
                    channel.code,
                    channel.created_by,
                    encode_ts(&channel.created_at),
                ],
            )
            .map_err(|e| StoreError::from_insert(e, "channel", "code", &channel.code))?;

        self.add_channel_member(channel.id, creator)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn channel_by_id(&self, id: ChannelId) -> Result<Channel> {
        self.conn()
            .query_row(
                "SELECT id, name, code, created_by, created_at FROM channels WHERE id = ?1",
                params![id.to_string()],
                row_to_channel,
            )
            .map_err(StoreError::from_lookup)
    }

    pub fn channel_by_code(&self, code: &str) -> Result<Channel> {
        self.conn()
            .query_row(
                "SELECT id, name, code, created_by, created_at FROM channels WHERE code = ?1",
                params![code],
                row_to_channel,
            )
            .map_err(StoreError::from_lookup)
    }

    pub fn channel_code_exists(&self, code: &str) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM channels WHERE code = ?1",
                params![code],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Member snapshots in join order.
    pub fn channel_members(&self, id: ChannelId) -> Result<Vec<ChannelMember>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, username, email, is_admin, joined_at
             FROM channel_members
             WHERE channel_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![id.to_string()], row_to_member)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Note ids attached to the channel, in attachment order.
    pub fn channel_note_ids(&self, id: ChannelId) -> Result<Vec<NoteId>> {
        let mut stmt = self.conn().prepare(
            "SELECT note_id FROM channel_notes WHERE channel_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            let raw: String = row.get(0)?;
            decode_uuid(0, &raw).map(NoteId)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Current `(member_count, note_count)`, counted on every call.
    pub fn channel_counts(&self, id: ChannelId) -> Result<(usize, usize)> {
        let key = id.to_string();
        let members: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM channel_members WHERE channel_id = ?1",
            params![key],
            |row| row.get(0),
        )?;
        let notes: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM channel_notes WHERE channel_id = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok((members as usize, notes as usize))
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    pub fn add_channel_member(&self, id: ChannelId, member: &ChannelMember) -> Result<()> {
        self.conn().execute(
            "INSERT INTO channel_members (channel_id, user_id, username, email, is_admin, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                member.user_id.to_string(),
                member.username,
                member.email,
                member.is_admin as i32,
                encode_ts(&member.joined_at),
            ],
        )?;
        Ok(())
    }

    /// Remove every member entry for `user_id`. Returns `true` if one existed.
    pub fn remove_channel_member(&self, id: ChannelId, user_id: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM channel_members WHERE channel_id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn append_channel_note(&self, id: ChannelId, note_id: NoteId) -> Result<()> {
        self.conn().execute(
            "INSERT INTO channel_notes (channel_id, note_id) VALUES (?1, ?2)",
            params![id.to_string(), note_id.to_string()],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    let id_str: String = row.get(0)?;
    let created_str: String = row.get(4)?;

    Ok(Channel {
        id: ChannelId(decode_uuid(0, &id_str)?),
        name: row.get(1)?,
        code: row.get(2)?,
        created_by: row.get(3)?,
        created_at: decode_ts(4, &created_str)?,
    })
}

fn row_to_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelMember> {
    let user_str: String = row.get(0)?;
    let is_admin: i32 = row.get(3)?;
    let joined_str: String = row.get(4)?;

    Ok(ChannelMember {
        user_id: UserId(decode_uuid(0, &user_str)?),
        username: row.get(1)?,
        email: row.get(2)?,
        is_admin: is_admin != 0,
        joined_at: decode_ts(4, &joined_str)?,
    })
}
