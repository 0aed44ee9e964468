//! Palaver — client-side real-time messaging core.

pub mod api;
pub mod auth;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod presence;
pub mod receipts;
pub mod session;
pub mod store;
pub mod transport;
pub mod unread;
