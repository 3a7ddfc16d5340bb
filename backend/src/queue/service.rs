use super::{QueueError, QueueStore};
use crate::client::Client;
use crate::error::MatchmakingError;
use crate::services::{UserId, UserService};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct QueueService {
    store: Arc<QueueStore>,
    users: Arc<dyn UserService>,
}

impl QueueService {
    pub fn new(store: Arc<QueueStore>, users: Arc<dyn UserService>) -> Self {
        QueueService { store, users }
    }

    /// Puts the client in the queue if its user exists. A user already in the
    /// queue has their place replaced and the old connection closed.
    pub async fn create(&self, client: Client) -> Result<(), MatchmakingError> {
        self.users.get(client.user_id).await?;
        info!(user_id = %client.user_id, squad_id = %client.squad_id, "client started search");
        let fresh = client.clone();
        if let Some(previous) = self.store.create(client).await {
            if !previous.same_connection(&fresh) {
                debug!(user_id = %previous.user_id, "replaced previous search");
                previous.connection.close().await;
            }
        }
        Ok(())
    }

    pub async fn get(&self, user_id: UserId) -> Result<Client, MatchmakingError> {
        Ok(self.store.get(user_id).await?)
    }

    pub async fn list(&self) -> Vec<Client> {
        self.store.list().await
    }

    pub async fn list_not_playing_users(&self) -> Vec<Client> {
        self.store.list_not_playing().await
    }

    pub async fn update_is_playing(&self, user_id: UserId, is_playing: bool) -> Result<(), MatchmakingError> {
        debug!(%user_id, is_playing, "updating playing flag");
        Ok(self.store.update_is_playing(user_id, is_playing).await?)
    }

    pub(crate) async fn claim_pair(&self, first: UserId, second: UserId) -> Result<(), QueueError> {
        self.store.claim_pair(first, second).await
    }

    /// Removes the user from the queue and returns the client they had. Fails
    /// with a not found error when the user is not searching.
    pub async fn finish(&self, user_id: UserId) -> Result<Client, MatchmakingError> {
        let client = self.store.delete(user_id).await?;
        info!(%user_id, "client finished search");
        Ok(client)
    }

    // Ends the search a handshake or match claimed and closes its connection.
    // A newer search of the same user is left in place.
    pub(crate) async fn leave(&self, client: &Client) {
        let user_id = client.user_id;
        match self.store.delete_claimed(client).await {
            Ok(_) => info!(%user_id, "client finished search"),
            Err(QueueError::Replaced(_)) => debug!(%user_id, "client searched again, keeping the new place"),
            Err(err) => debug!(%user_id, "client already left the queue: {}", err),
        }
        client.connection.close().await;
    }
}
