use crate::client::Client;
use crate::error::MatchmakingError;
use crate::queue::QueueService;
use crate::services::{MatchId, NewMatch, SeasonId, ServiceError, Services};
use crate::util;
use common::{status, GameResult};
use tracing::{debug, error, info, warn};

pub const SQUAD_NOT_FULL: &str = "squad is not full";

#[derive(Clone, Debug)]
pub struct GameConfig {
    // Number of cards a full squad has
    pub squad_size: usize,
    pub winning_award: u64,
    pub delivery_retries: u32,
}

#[derive(Clone)]
pub struct Game {
    queue: QueueService,
    services: Services,
    config: GameConfig,
}

impl Game {
    pub fn new(queue: QueueService, services: Services, config: GameConfig) -> Self {
        Game {
            queue,
            services,
            config,
        }
    }

    /// Fails without touching the queue if the match could not be created.
    /// Once it is created both clients leave the queue and their connections
    /// are closed, whatever happens afterwards.
    pub async fn play(&self, clients: [Client; 2]) -> Result<MatchId, MatchmakingError> {
        self.check_squads(&clients).await?;
        let new_match = self.prepare(&clients).await?;
        let match_id = self.services.matches.create(new_match).await?;
        info!(
            %match_id,
            user1 = %clients[0].user_id,
            user2 = %clients[1].user_id,
            "match created"
        );

        // Run on its own task so that a panic still reaches the release below.
        let game = self.clone();
        let players = clients.clone();
        let delivered = tokio::spawn(async move { game.deliver(match_id, &players).await }).await;
        self.release(&clients).await;

        match delivered {
            Ok(result) => result.map(|()| match_id),
            Err(err) => Err(ServiceError::Internal(format!("match {} aborted: {}", match_id, err)).into()),
        }
    }

    // Incomplete squads are reported to their owner but still play.
    async fn check_squads(&self, clients: &[Client; 2]) -> Result<(), MatchmakingError> {
        for client in clients {
            let cards = self.services.clubs.list_squad_cards(client.squad_id).await?;
            if cards.len() < self.config.squad_size {
                warn!(
                    user_id = %client.user_id,
                    squad_id = %client.squad_id,
                    cards = cards.len(),
                    required = self.config.squad_size,
                    "squad is not full"
                );
                client.notify(status::BAD_REQUEST, SQUAD_NOT_FULL).await;
            }
        }
        Ok(())
    }

    async fn prepare(&self, clients: &[Client; 2]) -> Result<NewMatch, MatchmakingError> {
        let [first, second] = clients;
        let season_id = self.season_of(first).await?;
        let second_season_id = self.season_of(second).await?;
        if season_id != second_season_id {
            debug!(%season_id, %second_season_id, "players from different seasons, using the first one");
        }
        Ok(NewMatch {
            user1_id: first.user_id,
            squad1_id: first.squad_id,
            user2_id: second.user_id,
            squad2_id: second.squad_id,
            season_id,
        })
    }

    async fn season_of(&self, client: &Client) -> Result<SeasonId, MatchmakingError> {
        let squad = self.services.clubs.get_squad(client.squad_id).await?;
        let club = self.services.clubs.get(squad.club_id).await?;
        let season = self
            .services
            .seasons
            .get_season_by_division_id(club.division_id)
            .await?;
        Ok(season.id)
    }

    async fn deliver(&self, match_id: MatchId, clients: &[Client; 2]) -> Result<(), MatchmakingError> {
        let result = self.services.matches.get_game_result(match_id).await?;
        let mut views = [
            result.personalized_for(clients[0].user_id),
            result.personalized_for(clients[1].user_id),
        ];

        let award = self.award(&result, clients, &mut views).await;

        for (client, view) in clients.iter().zip(views.iter()) {
            let message = match serde_json::to_value(view) {
                Ok(message) => message,
                Err(err) => {
                    error!(user_id = %client.user_id, "could not serialize game result: {}", err);
                    continue;
                }
            };
            let sent = util::retry(self.config.delivery_retries, move || {
                client.connection.write_response(status::OK, message.clone())
            })
            .await;
            if sent.is_err() {
                warn!(user_id = %client.user_id, %match_id, "game result was not delivered");
            }
        }

        award
    }

    // The transaction goes only into the winner's view. A failed award is
    // returned after the results have been sent; the match stands.
    async fn award(
        &self,
        result: &GameResult,
        clients: &[Client; 2],
        views: &mut [GameResult; 2],
    ) -> Result<(), MatchmakingError> {
        let Some(winner) = result.winner() else {
            debug!(match_id = %result.match_id, "draw, nothing to award");
            return Ok(());
        };
        let Some(index) = clients.iter().position(|client| client.user_id == winner) else {
            return Ok(());
        };
        match self
            .services
            .currency
            .create(winner, self.config.winning_award, clients[index].wallet.as_ref())
            .await
        {
            Ok(transaction) => {
                info!(
                    user_id = %winner,
                    goals = result.goals_of(winner),
                    value = transaction.value,
                    "winner awarded"
                );
                views[index].transaction = Some(transaction);
                Ok(())
            }
            Err(err) => {
                error!(user_id = %winner, match_id = %result.match_id, "could not award winner: {}", err);
                Err(err.into())
            }
        }
    }

    async fn release(&self, clients: &[Client; 2]) {
        for client in clients {
            self.queue.leave(client).await;
        }
    }
}
