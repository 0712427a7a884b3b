//! # notehub-shared
//!
//! Types and rules shared by the notehub store and server: identifier
//! newtypes, upload limits, file classification and the credit table, blob
//! path derivation, and channel join-code generation.

pub mod constants;
pub mod files;
pub mod invite;
pub mod types;
