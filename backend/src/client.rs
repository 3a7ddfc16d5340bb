use crate::services::{SquadId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{status, Request, Wallet};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub const WRONG_REQUEST_FORMAT: &str = "wrong request format";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Error reading request: {0}")]
    Read(String),
    #[error("Error writing response: {0}")]
    Write(String),
    #[error("Connection closed")]
    Closed,
}

/// Request/response channel to exactly one user.
///
/// One task may read while another writes, but two concurrent readers (or two
/// concurrent writers) on the same connection are not supported.
#[async_trait]
pub trait Connection: Send + Sync + Debug {
    /// Waits for the next request. A payload that does not decode is answered
    /// with a bad request response and reported as [`ConnectionError::Read`].
    async fn read_request(&self) -> Result<Request, ConnectionError>;

    async fn write_response(&self, status: u16, message: Value) -> Result<(), ConnectionError>;

    async fn close(&self);
}

#[derive(Debug, Clone)]
pub struct Client {
    pub user_id: UserId,
    pub connection: Arc<dyn Connection>,
    pub squad_id: SquadId,
    pub is_playing: bool,
    pub created_at: DateTime<Utc>,
    pub wallet: Option<Wallet>,
}

impl Client {
    pub fn new(
        user_id: UserId,
        connection: Arc<dyn Connection>,
        squad_id: SquadId,
        wallet: Option<Wallet>,
    ) -> Self {
        Client {
            user_id,
            connection,
            squad_id,
            is_playing: false,
            created_at: Utc::now(),
            wallet,
        }
    }

    // Two clients are the same queue place only if they share a connection
    pub fn same_connection(&self, other: &Client) -> bool {
        Arc::as_ptr(&self.connection) as *const () == Arc::as_ptr(&other.connection) as *const ()
    }

    pub async fn notify(&self, status: u16, message: impl Into<Value>) {
        if let Err(err) = self.connection.write_response(status, message.into()).await {
            warn!(user_id = %self.user_id, "could not notify client: {}", err);
        }
    }
}

pub(crate) async fn decode_request<C>(connection: &C, text: &str) -> Result<Request, ConnectionError>
where
    C: Connection + ?Sized,
{
    match serde_json::from_str(text) {
        Ok(request) => Ok(request),
        Err(err) => {
            warn!("Failed to deserialize request: {}", err);
            // The read already failed, a failed write adds nothing.
            let _ = connection
                .write_response(status::BAD_REQUEST, Value::from(WRONG_REQUEST_FORMAT))
                .await;
            Err(ConnectionError::Read(err.to_string()))
        }
    }
}
