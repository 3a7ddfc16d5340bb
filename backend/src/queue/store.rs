use super::QueueError;
use crate::client::Client;
use crate::services::UserId;
use hashbrown::HashMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Place {
    // Position in join order, lists are sorted by it
    seq: u64,
    client: Client,
}

#[derive(Debug, Default)]
struct Places {
    next_seq: u64,
    by_user: HashMap<UserId, Place>,
}

impl Places {
    fn sorted(&self, filter: impl Fn(&Client) -> bool) -> Vec<Client> {
        let mut places: Vec<&Place> = self
            .by_user
            .values()
            .filter(|place| filter(&place.client))
            .collect();
        places.sort_by_key(|place| place.seq);
        places.into_iter().map(|place| place.client.clone()).collect()
    }

    fn get_mut(&mut self, user_id: UserId) -> Result<&mut Client, QueueError> {
        self.by_user
            .get_mut(&user_id)
            .map(|place| &mut place.client)
            .ok_or(QueueError::NoClient(user_id))
    }
}

#[derive(Debug, Default)]
pub struct QueueStore {
    places: RwLock<Places>,
}

impl QueueStore {
    pub fn new() -> Self {
        QueueStore::default()
    }

    /// Inserts the client, replacing any place the user already had, and
    /// returns the replaced client. A replaced user moves to the back of the
    /// queue. If the old place was claimed by a handshake the new one stays
    /// claimed until that handshake lets go of it.
    pub async fn create(&self, mut client: Client) -> Option<Client> {
        let mut places = self.places.write().await;
        let seq = places.next_seq;
        places.next_seq += 1;
        if let Some(previous) = places.by_user.get(&client.user_id) {
            client.is_playing |= previous.client.is_playing;
        }
        places
            .by_user
            .insert(client.user_id, Place { seq, client })
            .map(|place| place.client)
    }

    pub async fn get(&self, user_id: UserId) -> Result<Client, QueueError> {
        self.places
            .read()
            .await
            .by_user
            .get(&user_id)
            .map(|place| place.client.clone())
            .ok_or(QueueError::NoClient(user_id))
    }

    pub async fn list(&self) -> Vec<Client> {
        self.places.read().await.sorted(|_| true)
    }

    pub async fn list_not_playing(&self) -> Vec<Client> {
        self.places.read().await.sorted(|client| !client.is_playing)
    }

    pub async fn update_is_playing(&self, user_id: UserId, is_playing: bool) -> Result<(), QueueError> {
        let mut places = self.places.write().await;
        places.get_mut(user_id)?.is_playing = is_playing;
        Ok(())
    }

    /// Marks both users as playing, or neither of them if either one is
    /// missing or already playing.
    pub async fn claim_pair(&self, first: UserId, second: UserId) -> Result<(), QueueError> {
        let mut places = self.places.write().await;
        for user_id in [first, second] {
            if places.get_mut(user_id)?.is_playing {
                return Err(QueueError::AlreadyPlaying(user_id));
            }
        }
        places.get_mut(first)?.is_playing = true;
        places.get_mut(second)?.is_playing = true;
        Ok(())
    }

    pub async fn delete(&self, user_id: UserId) -> Result<Client, QueueError> {
        self.places
            .write()
            .await
            .by_user
            .remove(&user_id)
            .map(|place| place.client)
            .ok_or(QueueError::NoClient(user_id))
    }

    /// Removes the place `claimed` was taken from. When the user has started
    /// a new search since, the new place is kept and only released for
    /// pairing.
    pub async fn delete_claimed(&self, claimed: &Client) -> Result<Client, QueueError> {
        let user_id = claimed.user_id;
        let mut places = self.places.write().await;
        let current = places.get_mut(user_id)?;
        if !current.same_connection(claimed) {
            current.is_playing = false;
            return Err(QueueError::Replaced(user_id));
        }
        places
            .by_user
            .remove(&user_id)
            .map(|place| place.client)
            .ok_or(QueueError::NoClient(user_id))
    }
}
