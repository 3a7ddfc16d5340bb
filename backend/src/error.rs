use crate::client::ConnectionError;
use crate::queue::QueueError;
use crate::services::ServiceError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchmakingError {
    #[error(transparent)]
    NotFound(#[from] QueueError),
    #[error(transparent)]
    Transport(#[from] ConnectionError),
    #[error("Protocol violation: {0}")]
    Protocol(String),
    #[error(transparent)]
    Downstream(#[from] ServiceError),
}

impl MatchmakingError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MatchmakingError::NotFound(QueueError::NoClient(_)))
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            MatchmakingError::Transport(ConnectionError::Closed | ConnectionError::Write(_))
        )
    }
}
