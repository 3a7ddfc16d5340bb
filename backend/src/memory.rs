//! In-memory collaborators. They stand in for the persistent card, club and
//! wallet services, which live outside this server.

use crate::services::{
    CardId, Club, ClubId, ClubService, CurrencyService, DivisionId, MatchGoal, MatchId,
    MatchService, NewMatch, Position, Season, SeasonService, ServiceError, Services, Squad,
    SquadCard, SquadId, User, UserId, UserService,
};
use crate::simulation::{self, Side, SimulationConfig, Simulator};
use async_trait::async_trait;
use chrono::Utc;
use common::{GameResult, Transaction, Wallet};
use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

// Positions of a full eleven, cycled for other squad sizes
const LINEUP: [Position; 11] = [
    Position::Goalkeeper,
    Position::Defender,
    Position::Defender,
    Position::Defender,
    Position::Defender,
    Position::Midfielder,
    Position::Midfielder,
    Position::Midfielder,
    Position::Midfielder,
    Position::Forward,
    Position::Forward,
];

#[derive(Debug, Default)]
pub struct MemoryUsers {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUsers {
    pub fn new() -> Self {
        MemoryUsers::default()
    }

    pub async fn insert(&self, nick_name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            nick_name: nick_name.to_string(),
            created_at: Utc::now(),
        };
        self.users.write().await.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserService for MemoryUsers {
    async fn get(&self, user_id: UserId) -> Result<User, ServiceError> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(ServiceError::not_found("user", user_id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryClubs {
    clubs: RwLock<HashMap<ClubId, Club>>,
    squads: RwLock<HashMap<SquadId, Squad>>,
    cards: RwLock<HashMap<SquadId, Vec<SquadCard>>>,
}

impl MemoryClubs {
    pub fn new() -> Self {
        MemoryClubs::default()
    }

    pub async fn create_club(&self, owner_id: UserId, name: &str, division_id: DivisionId) -> Club {
        let club = Club {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            division_id,
        };
        self.clubs.write().await.insert(club.id, club.clone());
        club
    }

    pub async fn create_squad(&self, club_id: ClubId) -> Squad {
        let squad = Squad {
            id: Uuid::new_v4(),
            club_id,
        };
        self.squads.write().await.insert(squad.id, squad.clone());
        self.cards.write().await.insert(squad.id, Vec::new());
        squad
    }

    pub async fn add_card(&self, squad_id: SquadId, position: Position, effectiveness: f64) -> CardId {
        let card = SquadCard {
            squad_id,
            card_id: Uuid::new_v4(),
            position,
            effectiveness,
        };
        let card_id = card.card_id;
        self.cards
            .write()
            .await
            .entry(squad_id)
            .or_default()
            .push(card);
        card_id
    }
}

#[async_trait]
impl ClubService for MemoryClubs {
    async fn list_squad_cards(&self, squad_id: SquadId) -> Result<Vec<SquadCard>, ServiceError> {
        self.cards
            .read()
            .await
            .get(&squad_id)
            .cloned()
            .ok_or(ServiceError::not_found("squad", squad_id))
    }

    async fn get_squad(&self, squad_id: SquadId) -> Result<Squad, ServiceError> {
        self.squads
            .read()
            .await
            .get(&squad_id)
            .cloned()
            .ok_or(ServiceError::not_found("squad", squad_id))
    }

    async fn get(&self, club_id: ClubId) -> Result<Club, ServiceError> {
        self.clubs
            .read()
            .await
            .get(&club_id)
            .cloned()
            .ok_or(ServiceError::not_found("club", club_id))
    }
}

#[derive(Debug, Default)]
pub struct MemorySeasons {
    // Current season of each division
    seasons: RwLock<HashMap<DivisionId, Season>>,
}

impl MemorySeasons {
    pub fn new() -> Self {
        MemorySeasons::default()
    }

    pub async fn start_season(&self, division_id: DivisionId) -> Season {
        let season = Season {
            id: Uuid::new_v4(),
            division_id,
            started_at: Utc::now(),
        };
        self.seasons.write().await.insert(division_id, season.clone());
        season
    }
}

#[async_trait]
impl SeasonService for MemorySeasons {
    async fn get_season_by_division_id(&self, division_id: DivisionId) -> Result<Season, ServiceError> {
        self.seasons
            .read()
            .await
            .get(&division_id)
            .cloned()
            .ok_or(ServiceError::not_found("season of division", division_id))
    }
}

#[derive(Debug)]
struct PlayedMatch {
    new_match: NewMatch,
    goals: Vec<MatchGoal>,
}

pub struct MemoryMatches {
    clubs: Arc<dyn ClubService>,
    simulator: Mutex<Simulator<StdRng>>,
    matches: RwLock<HashMap<MatchId, PlayedMatch>>,
}

impl MemoryMatches {
    pub fn new(clubs: Arc<dyn ClubService>, config: SimulationConfig) -> Self {
        Self::with_rng(clubs, config, StdRng::from_entropy())
    }

    pub fn with_rng(clubs: Arc<dyn ClubService>, config: SimulationConfig, rng: StdRng) -> Self {
        MemoryMatches {
            clubs,
            simulator: Mutex::new(Simulator::new(config, rng)),
            matches: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub async fn get(&self, match_id: MatchId) -> Option<NewMatch> {
        self.matches
            .read()
            .await
            .get(&match_id)
            .map(|played| played.new_match.clone())
    }

    pub async fn count(&self) -> usize {
        self.matches.read().await.len()
    }
}

#[async_trait]
impl MatchService for MemoryMatches {
    async fn create(&self, new_match: NewMatch) -> Result<MatchId, ServiceError> {
        let home_cards = self.clubs.list_squad_cards(new_match.squad1_id).await?;
        let away_cards = self.clubs.list_squad_cards(new_match.squad2_id).await?;
        let goals = {
            let mut simulator = self
                .simulator
                .lock()
                .map_err(|_| ServiceError::Internal("simulator lock poisoned".to_string()))?;
            simulator.play(
                Side {
                    user_id: new_match.user1_id,
                    cards: &home_cards,
                },
                Side {
                    user_id: new_match.user2_id,
                    cards: &away_cards,
                },
            )
        };

        let match_id = Uuid::new_v4();
        info!(%match_id, goals = goals.len(), "match played");
        self.matches
            .write()
            .await
            .insert(match_id, PlayedMatch { new_match, goals });
        Ok(match_id)
    }

    async fn get_game_result(&self, match_id: MatchId) -> Result<GameResult, ServiceError> {
        let matches = self.matches.read().await;
        let played = matches
            .get(&match_id)
            .ok_or(ServiceError::not_found("match", match_id))?;
        let users = [played.new_match.user1_id, played.new_match.user2_id];
        Ok(simulation::game_result(match_id, users, &played.goals))
    }
}

#[derive(Debug, Default)]
pub struct MemoryCurrency {
    transactions: RwLock<Vec<Transaction>>,
}

impl MemoryCurrency {
    pub fn new() -> Self {
        MemoryCurrency::default()
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }
}

#[async_trait]
impl CurrencyService for MemoryCurrency {
    async fn create(
        &self,
        user_id: UserId,
        value: u64,
        wallet: Option<&Wallet>,
    ) -> Result<Transaction, ServiceError> {
        let transaction = Transaction {
            id: Uuid::new_v4(),
            user_id,
            value,
            wallet_address: wallet.map(|w| w.address.clone()),
            nonce: wallet.map(|w| w.nonce),
        };
        debug!(%user_id, value, "currency transaction created");
        self.transactions.write().await.push(transaction.clone());
        Ok(transaction)
    }
}

pub struct Memory {
    pub users: Arc<MemoryUsers>,
    pub clubs: Arc<MemoryClubs>,
    pub seasons: Arc<MemorySeasons>,
    pub matches: Arc<MemoryMatches>,
    pub currency: Arc<MemoryCurrency>,
    division_id: DivisionId,
}

impl Memory {
    pub async fn new(config: SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy()).await
    }

    pub async fn with_rng(config: SimulationConfig, rng: StdRng) -> Self {
        let clubs = Arc::new(MemoryClubs::new());
        let seasons = Arc::new(MemorySeasons::new());
        let division_id = Uuid::new_v4();
        seasons.start_season(division_id).await;
        Memory {
            users: Arc::new(MemoryUsers::new()),
            matches: Arc::new(MemoryMatches::with_rng(clubs.clone(), config, rng)),
            clubs,
            seasons,
            currency: Arc::new(MemoryCurrency::new()),
            division_id,
        }
    }

    pub fn services(&self) -> Services {
        Services {
            users: self.users.clone(),
            clubs: self.clubs.clone(),
            seasons: self.seasons.clone(),
            matches: self.matches.clone(),
            currency: self.currency.clone(),
        }
    }

    // A user owning a club in the default division and a squad of
    // `squad_size` cards.
    pub async fn seed_user(&self, nick_name: &str, squad_size: usize) -> (User, Squad) {
        let user = self.users.insert(nick_name).await;
        let club = self
            .clubs
            .create_club(user.id, &format!("{} FC", nick_name), self.division_id)
            .await;
        let squad = self.clubs.create_squad(club.id).await;
        let lineup: Vec<(Position, f64)> = {
            let mut rng = rand::thread_rng();
            LINEUP
                .iter()
                .cycle()
                .take(squad_size)
                .map(|position| (*position, rng.gen_range(40.0..90.0)))
                .collect()
        };
        for (position, effectiveness) in lineup {
            self.clubs.add_card(squad.id, position, effectiveness).await;
        }
        (user, squad)
    }

    pub async fn seed_demo_users(&self, count: usize, squad_size: usize) -> Vec<(User, Squad)> {
        let mut seeded = Vec::with_capacity(count);
        for n in 0..count {
            let (user, squad) = self.seed_user(&format!("demo{}", n + 1), squad_size).await;
            info!(user_id = %user.id, squad_id = %squad.id, "seeded demo user");
            seeded.push((user, squad));
        }
        seeded
    }
}
