//! # notehub-store
//!
//! Record store for notehub, backed by SQLite.
//!
//! Three collections live here: users, notes and channels. References
//! between them are plain ids kept in ordered list tables; nothing is
//! enforced by foreign keys, so a dangling id is possible and readers skip
//! it. The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every model.

pub mod channels;
pub mod database;
pub mod migrations;
pub mod models;
pub mod notes;
pub mod users;

mod error;

pub use database::{now_utc, Database};
pub use error::{Result, StoreError};
pub use models::*;
