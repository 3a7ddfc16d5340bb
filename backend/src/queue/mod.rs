mod service;
mod store;

pub use service::QueueService;
pub use store::QueueStore;

use crate::services::UserId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Client {0} is not in the queue")]
    NoClient(UserId),
    #[error("Client {0} is already playing")]
    AlreadyPlaying(UserId),
    #[error("Client {0} started a new search")]
    Replaced(UserId),
}
