//! Shared data model and wire formats for Taskify.

pub mod codec;
pub mod feed;
pub mod mail;
pub mod notification;
pub mod task;
pub mod time;
pub mod user;
