use crate::services::{MatchGoal, MatchId, Position, SquadCard, UserId};
use common::{GameResult, Goalscorer, MatchResult};
use rand::seq::SliceRandom;
use rand::Rng;

/// Chance, in percent, that an attack finished by a card in the given
/// position ends up in the net.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GoalProbability {
    pub goalkeeper: f64,
    pub defender: f64,
    pub midfielder: f64,
    pub forward: f64,
}

impl GoalProbability {
    pub fn for_position(&self, position: Position) -> f64 {
        match position {
            Position::Goalkeeper => self.goalkeeper,
            Position::Defender => self.defender,
            Position::Midfielder => self.midfielder,
            Position::Forward => self.forward,
        }
    }
}

impl Default for GoalProbability {
    fn default() -> Self {
        GoalProbability {
            goalkeeper: 1.0,
            defender: 10.0,
            midfielder: 25.0,
            forward: 40.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    pub match_minutes: u32,
    // Attacks played out per match, spread over random minutes
    pub chances: u32,
    pub goal_probability: GoalProbability,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            match_minutes: 90,
            chances: 12,
            goal_probability: GoalProbability::default(),
        }
    }
}

pub fn effectiveness(cards: &[SquadCard]) -> f64 {
    if cards.is_empty() {
        return 0.0;
    }
    cards.iter().map(|card| card.effectiveness).sum::<f64>() / cards.len() as f64
}

pub struct Side<'a> {
    pub user_id: UserId,
    pub cards: &'a [SquadCard],
}

#[derive(Debug)]
pub struct Simulator<R: Rng> {
    config: SimulationConfig,
    rng: R,
}

impl<R: Rng> Simulator<R> {
    pub fn new(config: SimulationConfig, rng: R) -> Self {
        Simulator { config, rng }
    }

    pub fn play(&mut self, home: Side<'_>, away: Side<'_>) -> Vec<MatchGoal> {
        let home_effectiveness = effectiveness(home.cards);
        let total = home_effectiveness + effectiveness(away.cards);
        let mut goals = Vec::new();

        for _ in 0..self.config.chances {
            let minute = self.rng.gen_range(1..=self.config.match_minutes.max(1));
            let home_attacks = if total > 0.0 {
                self.rng.gen::<f64>() * total < home_effectiveness
            } else {
                self.rng.gen_bool(0.5)
            };
            let attacker = if home_attacks { &home } else { &away };
            let Some(card) = attacker.cards.choose(&mut self.rng) else {
                continue;
            };
            let probability = self.config.goal_probability.for_position(card.position);
            if self.rng.gen::<f64>() * 100.0 < probability {
                goals.push(MatchGoal {
                    user_id: attacker.user_id,
                    card_id: card.card_id,
                    minute,
                });
            }
        }

        goals.sort_by_key(|goal| goal.minute);
        goals
    }
}

/// Aggregates goals per user. Sides are listed in the order of `users`.
pub fn game_result(match_id: MatchId, users: [UserId; 2], goals: &[MatchGoal]) -> GameResult {
    let match_results = users
        .iter()
        .map(|user_id| {
            let goalscorers: Vec<Goalscorer> = goals
                .iter()
                .filter(|goal| goal.user_id == *user_id)
                .map(|goal| Goalscorer {
                    card_id: goal.card_id,
                    minute: goal.minute,
                })
                .collect();
            MatchResult {
                user_id: *user_id,
                quantity_goals: goalscorers.len() as u32,
                goalscorers,
            }
        })
        .collect();
    GameResult {
        match_id,
        match_results,
        transaction: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn cards(position: Position, effectiveness: f64, count: usize) -> Vec<SquadCard> {
        let squad_id = Uuid::new_v4();
        (0..count)
            .map(|_| SquadCard {
                squad_id,
                card_id: Uuid::new_v4(),
                position,
                effectiveness,
            })
            .collect()
    }

    fn config(chances: u32, goal_probability: GoalProbability) -> SimulationConfig {
        SimulationConfig {
            match_minutes: 90,
            chances,
            goal_probability,
        }
    }

    #[test]
    fn test_effectiveness_is_mean() {
        let mut squad = cards(Position::Forward, 80.0, 2);
        squad.extend(cards(Position::Defender, 40.0, 2));
        assert_eq!(effectiveness(&squad), 60.0);
        assert_eq!(effectiveness(&[]), 0.0);
    }

    #[test]
    fn test_empty_side_never_scores() {
        let (home, away) = (Uuid::new_v4(), Uuid::new_v4());
        let probability = GoalProbability {
            goalkeeper: 100.0,
            defender: 100.0,
            midfielder: 100.0,
            forward: 100.0,
        };
        let mut simulator = Simulator::new(config(20, probability), StdRng::seed_from_u64(7));
        let home_cards = cards(Position::Forward, 70.0, 11);
        let goals = simulator.play(
            Side {
                user_id: home,
                cards: &home_cards,
            },
            Side {
                user_id: away,
                cards: &[],
            },
        );
        assert_eq!(goals.len(), 20);
        assert!(goals.iter().all(|goal| goal.user_id == home));
        assert!(goals.windows(2).all(|pair| pair[0].minute <= pair[1].minute));
        assert!(goals.iter().all(|goal| (1..=90).contains(&goal.minute)));
    }

    #[test]
    fn test_zero_probability_means_no_goals() {
        let probability = GoalProbability {
            goalkeeper: 0.0,
            defender: 0.0,
            midfielder: 0.0,
            forward: 0.0,
        };
        let mut simulator = Simulator::new(config(50, probability), StdRng::seed_from_u64(1));
        let home_cards = cards(Position::Forward, 90.0, 11);
        let away_cards = cards(Position::Forward, 90.0, 11);
        let goals = simulator.play(
            Side {
                user_id: Uuid::new_v4(),
                cards: &home_cards,
            },
            Side {
                user_id: Uuid::new_v4(),
                cards: &away_cards,
            },
        );
        assert!(goals.is_empty());
    }

    #[test]
    fn test_same_seed_same_match() {
        let (home, away) = (Uuid::new_v4(), Uuid::new_v4());
        let home_cards = cards(Position::Forward, 60.0, 11);
        let away_cards = cards(Position::Midfielder, 50.0, 11);
        let play = |seed| {
            let mut simulator =
                Simulator::new(SimulationConfig::default(), StdRng::seed_from_u64(seed));
            simulator.play(
                Side {
                    user_id: home,
                    cards: &home_cards,
                },
                Side {
                    user_id: away,
                    cards: &away_cards,
                },
            )
        };
        assert_eq!(play(42), play(42));
    }

    #[test]
    fn test_game_result_aggregates_goals() {
        let (user1, user2) = (Uuid::new_v4(), Uuid::new_v4());
        let (card1, card2) = (Uuid::new_v4(), Uuid::new_v4());
        let goals = vec![
            MatchGoal { user_id: user2, card_id: card2, minute: 3 },
            MatchGoal { user_id: user1, card_id: card1, minute: 17 },
            MatchGoal { user_id: user2, card_id: card2, minute: 88 },
        ];
        let match_id = Uuid::new_v4();
        let result = game_result(match_id, [user1, user2], &goals);
        assert_eq!(result.match_id, match_id);
        assert_eq!(result.match_results[0].user_id, user1);
        assert_eq!(result.match_results[0].quantity_goals, 1);
        assert_eq!(result.match_results[1].quantity_goals, 2);
        assert_eq!(
            result.match_results[1].goalscorers[1],
            Goalscorer { card_id: card2, minute: 88 }
        );
        assert_eq!(result.winner(), Some(user2));
    }
}
