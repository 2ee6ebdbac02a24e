//! Taskify core: task lifecycle, notification dispatch and assignment mail.
//!
//! Storage, identity and mail delivery sit behind traits so the same
//! controller runs against the in-memory store in tests and in the
//! bundled server.

pub mod auth;
pub mod directory;
pub mod mail;
pub mod notify;
pub mod store;
pub mod tasks;
