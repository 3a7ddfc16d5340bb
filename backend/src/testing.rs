//! Fixtures shared by the matchmaking tests.

use crate::client::mock::{self, Remote};
use crate::client::Client;
use crate::game::{Game, GameConfig};
use crate::memory::Memory;
use crate::queue::{QueueService, QueueStore};
use crate::services::{Services, UserId};
use crate::simulation::{GoalProbability, SimulationConfig};
use common::Wallet;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

pub struct Harness {
    pub memory: Memory,
    pub services: Services,
    pub queue: QueueService,
    pub game: Game,
    pub config: GameConfig,
}

impl Harness {
    pub async fn new(simulation: SimulationConfig) -> Self {
        let memory = Memory::with_rng(simulation, StdRng::seed_from_u64(11)).await;
        let services = memory.services();
        let queue = QueueService::new(Arc::new(QueueStore::new()), services.users.clone());
        let config = GameConfig {
            squad_size: 11,
            winning_award: 100,
            delivery_retries: 1,
        };
        let game = Game::new(queue.clone(), services.clone(), config.clone());
        Harness {
            memory,
            services,
            queue,
            game,
            config,
        }
    }

    /// Seeds a user whose squad has `cards` cards and puts them in the queue.
    pub async fn enqueue(&self, nick_name: &str, cards: usize) -> (UserId, Remote) {
        self.enqueue_with_wallet(nick_name, cards, None).await
    }

    pub async fn enqueue_with_wallet(
        &self,
        nick_name: &str,
        cards: usize,
        wallet: Option<Wallet>,
    ) -> (UserId, Remote) {
        let (user, squad) = self.memory.seed_user(nick_name, cards).await;
        let (connection, remote) = mock::connection();
        self.queue
            .create(Client::new(user.id, connection, squad.id, wallet))
            .await
            .unwrap();
        (user.id, remote)
    }

    pub async fn claimed(&self, users: [UserId; 2]) -> [Client; 2] {
        self.queue.claim_pair(users[0], users[1]).await.unwrap();
        [
            self.queue.get(users[0]).await.unwrap(),
            self.queue.get(users[1]).await.unwrap(),
        ]
    }
}

fn every_position(percent: f64) -> GoalProbability {
    GoalProbability {
        goalkeeper: percent,
        defender: percent,
        midfielder: percent,
        forward: percent,
    }
}

pub fn goalless() -> SimulationConfig {
    SimulationConfig {
        goal_probability: every_position(0.0),
        ..SimulationConfig::default()
    }
}

// Every chance is a goal, so a side with an empty squad always loses.
pub fn one_sided() -> SimulationConfig {
    SimulationConfig {
        chances: 5,
        goal_probability: every_position(100.0),
        ..SimulationConfig::default()
    }
}
