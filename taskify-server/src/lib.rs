//! Taskify server library.
//!
//! Exposes the HTTP API and live feeds for use in tests and embedding.
//! Requests are authenticated by uid, routed to the task controller and
//! notification dispatcher, and live changes are pushed over WebSockets.

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
