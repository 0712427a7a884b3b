//! v001 -- Initial schema creation.
//!
//! Creates the three collections (`users`, `notes`, `channels`) and the
//! ordered reference lists hanging off them. List order is insertion order
//! (`rowid`).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    username      TEXT NOT NULL,
    email         TEXT NOT NULL,              -- unique by existence check, not by constraint
    password      TEXT NOT NULL,              -- plaintext
    security_pass TEXT NOT NULL,              -- plaintext recovery secret
    verified      INTEGER NOT NULL DEFAULT 1,
    credits       INTEGER NOT NULL DEFAULT 0,
    upload_count  INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL               -- RFC-3339, UTC, microseconds
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

CREATE TABLE IF NOT EXISTS user_uploaded_notes (
    user_id TEXT NOT NULL,
    note_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_uploaded_notes ON user_uploaded_notes(user_id);

CREATE TABLE IF NOT EXISTS user_joined_channels (
    user_id    TEXT NOT NULL,
    channel_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_joined_channels ON user_joined_channels(user_id);

-- ----------------------------------------------------------------
-- Notes
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notes (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    file_name    TEXT NOT NULL,
    file_url     TEXT NOT NULL,
    file_path    TEXT NOT NULL,
    regulation   TEXT NOT NULL DEFAULT '',
    year         TEXT NOT NULL DEFAULT '',
    topic        TEXT NOT NULL DEFAULT '',
    subject      TEXT NOT NULL DEFAULT '',
    subject_code TEXT NOT NULL DEFAULT '',
    description  TEXT NOT NULL DEFAULT '',
    channel      TEXT NOT NULL DEFAULT 'none',
    uploaded_by  TEXT NOT NULL,               -- uploader email
    uploaded_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_uploaded_at ON notes(uploaded_at DESC);

-- ----------------------------------------------------------------
-- Channels
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS channels (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    name       TEXT NOT NULL,
    code       TEXT NOT NULL UNIQUE,          -- join code
    created_by TEXT NOT NULL,                 -- creator email
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS channel_members (
    channel_id TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    username   TEXT NOT NULL,                 -- snapshot at join time
    email      TEXT NOT NULL,                 -- snapshot at join time
    is_admin   INTEGER NOT NULL DEFAULT 0,
    joined_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_channel_members ON channel_members(channel_id);

CREATE TABLE IF NOT EXISTS channel_notes (
    channel_id TEXT NOT NULL,
    note_id    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_channel_notes ON channel_notes(channel_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
