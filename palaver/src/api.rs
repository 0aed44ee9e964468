//! REST collaborator boundary.
//!
//! The core exercises only [`RestApi::get_history`]; the remaining
//! operations exist so the app shell can drive the login flow through the
//! same handle. HTTP plumbing lives behind this trait and stays out of
//! scope here.

use palaver_proto::domain::{ChatId, User};
use palaver_proto::event::HistoryMessage;

use crate::auth::Credential;

/// Errors surfaced by the REST collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// The server answered with a non-success status.
    #[error("server error: status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided detail, possibly empty.
        message: String,
    },

    /// The request never completed.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// HTTP API of the chat server, as seen by the client core.
pub trait RestApi: Send + Sync {
    /// Exchange username and password for a credential.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Credential, ApiError>> + Send;

    /// Create an account and return the new user.
    fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<User, ApiError>> + Send;

    /// The account the current credential belongs to.
    fn get_me(&self) -> impl std::future::Future<Output = Result<User, ApiError>> + Send;

    /// One page of a conversation's history, oldest first.
    ///
    /// `offset` counts from the newest message backwards; page items carry
    /// the `text` body field (see [`HistoryMessage`]).
    fn get_history(
        &self,
        chat_id: &ChatId,
        limit: u32,
        offset: u32,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryMessage>, ApiError>> + Send;
}
