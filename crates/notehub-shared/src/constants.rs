/// Application name
pub const APP_NAME: &str = "notehub";

/// Maximum size of an uploaded note in bytes (10 MiB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Slack allowed on top of the file for the other multipart fields
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Length of a channel join code
pub const CHANNEL_CODE_LEN: usize = 10;

/// Characters a channel join code is drawn from
pub const CHANNEL_CODE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// How many codes are drawn before giving up on finding a free one
pub const CHANNEL_CODE_MAX_ATTEMPTS: usize = 20;

/// Channel value meaning "not attached to any channel"
pub const NO_CHANNEL: &str = "none";

/// Directory inside the blob store that holds uploaded notes
pub const NOTES_PREFIX: &str = "notes";

/// How long uploads are refused after the blob store reports quota exhaustion
pub const QUOTA_COOLDOWN_SECS: u64 = 3600;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 5000;
