use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{GameResult, Transaction, Wallet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub type UserId = Uuid;
pub type SquadId = Uuid;
pub type CardId = Uuid;
pub type ClubId = Uuid;
pub type DivisionId = Uuid;
pub type SeasonId = Uuid;
pub type MatchId = Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        ServiceError::NotFound { entity, id }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub nick_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Position::Goalkeeper => "goalkeeper",
            Position::Defender => "defender",
            Position::Midfielder => "midfielder",
            Position::Forward => "forward",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SquadCard {
    pub squad_id: SquadId,
    pub card_id: CardId,
    pub position: Position,
    // 0.0 - 100.0, how much the card contributes to its squad's play
    pub effectiveness: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Squad {
    pub id: SquadId,
    pub club_id: ClubId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Club {
    pub id: ClubId,
    pub owner_id: UserId,
    pub name: String,
    pub division_id: DivisionId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Season {
    pub id: SeasonId,
    pub division_id: DivisionId,
    pub started_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMatch {
    pub user1_id: UserId,
    pub squad1_id: SquadId,
    pub user2_id: UserId,
    pub squad2_id: SquadId,
    pub season_id: SeasonId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchGoal {
    pub user_id: UserId,
    pub card_id: CardId,
    pub minute: u32,
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<User, ServiceError>;
}

#[async_trait]
pub trait ClubService: Send + Sync {
    async fn list_squad_cards(&self, squad_id: SquadId) -> Result<Vec<SquadCard>, ServiceError>;
    async fn get_squad(&self, squad_id: SquadId) -> Result<Squad, ServiceError>;
    async fn get(&self, club_id: ClubId) -> Result<Club, ServiceError>;
}

#[async_trait]
pub trait SeasonService: Send + Sync {
    async fn get_season_by_division_id(
        &self,
        division_id: DivisionId,
    ) -> Result<Season, ServiceError>;
}

#[async_trait]
pub trait MatchService: Send + Sync {
    async fn create(&self, new_match: NewMatch) -> Result<MatchId, ServiceError>;
    async fn get_game_result(&self, match_id: MatchId) -> Result<GameResult, ServiceError>;
}

#[async_trait]
pub trait CurrencyService: Send + Sync {
    async fn create(
        &self,
        user_id: UserId,
        value: u64,
        wallet: Option<&Wallet>,
    ) -> Result<Transaction, ServiceError>;
}

#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn UserService>,
    pub clubs: Arc<dyn ClubService>,
    pub seasons: Arc<dyn SeasonService>,
    pub matches: Arc<dyn MatchService>,
    pub currency: Arc<dyn CurrencyService>,
}
