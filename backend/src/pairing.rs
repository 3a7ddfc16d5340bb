use crate::client::Client;
use crate::error::MatchmakingError;
use crate::game::Game;
use crate::queue::QueueService;
use common::{status, Action};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const CONFIRM_PLAY: &str = "you confirm play?";
pub const STILL_IN_SEARCH: &str = "you are still in search!";
pub const WRONG_ACTION: &str = "wrong action";
pub const NO_CONFIRMATION: &str = "you did not confirm in time";
pub const MATCH_FAILED: &str = "could not play game";

#[derive(Clone, Debug)]
pub struct PairingConfig {
    pub renewal_interval: Duration,
    pub confirmation_timeout: Duration,
}

#[derive(Debug)]
enum Answer {
    Confirm,
    Reject,
    Invalid(Action),
    Failed(MatchmakingError),
}

impl Answer {
    fn from_action(action: Action) -> Self {
        match action {
            Action::Confirm => Answer::Confirm,
            Action::Reject => Answer::Reject,
            other => Answer::Invalid(other),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    Play,
    // Both leave the queue and have to start a new search
    Reject,
    // Both go back to waiting for the next tick
    Revert,
}

fn judge(answers: &[Answer; 2]) -> Verdict {
    use Answer::*;
    match answers {
        [Failed(_) | Invalid(_), _] | [_, Failed(_) | Invalid(_)] => Verdict::Revert,
        [Reject, _] | [_, Reject] => Verdict::Reject,
        [Confirm, Confirm] => Verdict::Play,
    }
}

/// Splits a snapshot into adjacent pairs: `(0, 1), (2, 3), ...`. An odd one
/// out is left for the next tick.
pub fn form_pairs<T>(items: Vec<T>) -> Vec<[T; 2]> {
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut items = items.into_iter();
    while let (Some(first), Some(second)) = (items.next(), items.next()) {
        pairs.push([first, second]);
    }
    pairs
}

pub struct Matchmaker {
    queue: QueueService,
    game: Game,
    config: PairingConfig,
}

impl Matchmaker {
    pub fn new(queue: QueueService, game: Game, config: PairingConfig) -> Self {
        Matchmaker {
            queue,
            game,
            config,
        }
    }

    // Ticks until `shutdown` is cancelled, then waits for the handshakes it
    // started.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(interval = ?self.config.renewal_interval, "starting matchmaking loop");
        let mut interval = tokio::time::interval(self.config.renewal_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut handshakes = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Matchmaking loop received shutdown signal");
                    break;
                }
                Some(joined) = handshakes.join_next(), if !handshakes.is_empty() => {
                    log_joined(joined);
                }
                _ = interval.tick() => {
                    self.tick(&mut handshakes, &shutdown).await;
                }
            }
        }

        while let Some(joined) = handshakes.join_next().await {
            log_joined(joined);
        }
        info!("matchmaking loop stopped");
    }

    pub async fn tick(
        self: &Arc<Self>,
        handshakes: &mut JoinSet<()>,
        shutdown: &CancellationToken,
    ) -> usize {
        let clients = self.queue.list_not_playing_users().await;
        let mut started = 0;

        for pair in form_pairs(clients) {
            let (first, second) = (pair[0].user_id, pair[1].user_id);
            // Claimed here, not in the handshake, so the next snapshot can
            // never see either of them as waiting.
            if let Err(err) = self.queue.claim_pair(first, second).await {
                debug!(%first, %second, "pair skipped: {}", err);
                continue;
            }
            info!(%first, %second, "pair formed");

            let matchmaker = Arc::clone(self);
            let shutdown = shutdown.clone();
            handshakes.spawn(async move { matchmaker.handshake(pair, shutdown).await });
            started += 1;
        }

        started
    }

    async fn handshake(&self, pair: [Client; 2], shutdown: CancellationToken) {
        let answers = tokio::select! {
            _ = shutdown.cancelled() => {
                self.abandon(&pair).await;
                return;
            }
            answers = self.ask(&pair) => answers,
        };

        let verdict = judge(&answers);
        info!(
            first = %pair[0].user_id,
            second = %pair[1].user_id,
            ?verdict,
            "handshake finished"
        );

        match verdict {
            Verdict::Play => {
                if let Err(err) = self.game.play(pair.clone()).await {
                    error!(
                        first = %pair[0].user_id,
                        second = %pair[1].user_id,
                        "could not play match: {}",
                        err
                    );
                    for client in &pair {
                        client.notify(status::INTERNAL_SERVER_ERROR, MATCH_FAILED).await;
                    }
                    self.revert(&pair, &answers).await;
                }
            }
            Verdict::Reject => {
                for client in &pair {
                    client.notify(status::OK, STILL_IN_SEARCH).await;
                }
                for client in &pair {
                    self.queue.leave(client).await;
                }
            }
            Verdict::Revert => {
                for (client, answer) in pair.iter().zip(answers.iter()) {
                    match answer {
                        Answer::Invalid(action) => {
                            warn!(user_id = %client.user_id, ?action, "unexpected answer");
                            client.notify(status::BAD_REQUEST, WRONG_ACTION).await;
                        }
                        Answer::Failed(MatchmakingError::Protocol(reason)) => {
                            warn!(user_id = %client.user_id, "{}", reason);
                            client.notify(status::BAD_REQUEST, NO_CONFIRMATION).await;
                        }
                        // The connection answered a malformed request itself,
                        // and a broken one cannot be written to.
                        Answer::Failed(err) => {
                            warn!(user_id = %client.user_id, "could not read answer: {}", err);
                        }
                        Answer::Confirm | Answer::Reject => {
                            client.notify(status::OK, STILL_IN_SEARCH).await;
                        }
                    }
                }
                self.revert(&pair, &answers).await;
            }
        }
    }

    // Prompts both sides and waits for both answers, each bounded by the
    // confirmation timeout.
    async fn ask(&self, pair: &[Client; 2]) -> [Answer; 2] {
        let (first, second) = tokio::join!(self.ask_one(&pair[0]), self.ask_one(&pair[1]));
        [first, second]
    }

    async fn ask_one(&self, client: &Client) -> Answer {
        let connection = &client.connection;
        if let Err(err) = connection.write_response(status::OK, CONFIRM_PLAY.into()).await {
            return Answer::Failed(err.into());
        }
        let timeout = self.config.confirmation_timeout;
        match tokio::time::timeout(timeout, connection.read_request()).await {
            Ok(Ok(request)) => Answer::from_action(request.action),
            Ok(Err(err)) => Answer::Failed(err.into()),
            Err(_) => Answer::Failed(MatchmakingError::Protocol(format!(
                "no answer within {:?}",
                timeout
            ))),
        }
    }

    // Puts both sides back to waiting. A side whose connection is gone for
    // good leaves the queue instead.
    async fn revert(&self, pair: &[Client; 2], answers: &[Answer; 2]) {
        for (client, answer) in pair.iter().zip(answers.iter()) {
            if matches!(answer, Answer::Failed(err) if err.is_disconnect()) {
                self.queue.leave(client).await;
                continue;
            }
            match self.queue.update_is_playing(client.user_id, false).await {
                Ok(()) => debug!(user_id = %client.user_id, "client is back in search"),
                Err(err) if err.is_not_found() => {
                    debug!(user_id = %client.user_id, "client already left the queue");
                }
                Err(err) => warn!(user_id = %client.user_id, "could not revert client: {}", err),
            }
        }
    }

    async fn abandon(&self, pair: &[Client; 2]) {
        info!(
            first = %pair[0].user_id,
            second = %pair[1].user_id,
            "abandoning handshake on shutdown"
        );
        for client in pair {
            self.queue.leave(client).await;
        }
    }
}

fn log_joined(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        error!("handshake task failed: {}", err);
    }
}
