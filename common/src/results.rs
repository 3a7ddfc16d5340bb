use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Goalscorer {
    pub card_id: Uuid,
    pub minute: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub user_id: Uuid,
    pub quantity_goals: u32,
    pub goalscorers: Vec<Goalscorer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub match_id: Uuid,
    pub match_results: Vec<MatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
}

impl GameResult {
    pub fn goals_of(&self, user_id: Uuid) -> u32 {
        self.match_results
            .iter()
            .find(|result| result.user_id == user_id)
            .map(|result| result.quantity_goals)
            .unwrap_or(0)
    }

    /// The user who strictly out-scored everyone else, `None` on a draw.
    pub fn winner(&self) -> Option<Uuid> {
        let best = self.match_results.iter().max_by_key(|r| r.quantity_goals)?;
        let tied = self
            .match_results
            .iter()
            .filter(|r| r.quantity_goals == best.quantity_goals)
            .count();
        (tied == 1).then_some(best.user_id)
    }

    /// The same result with `user_id`'s side listed first. The relative order
    /// of the other sides is kept. The transaction is dropped: callers attach
    /// it only to the view of the user it belongs to.
    pub fn personalized_for(&self, user_id: Uuid) -> GameResult {
        let (mut own, others): (Vec<_>, Vec<_>) = self
            .match_results
            .iter()
            .cloned()
            .partition(|result| result.user_id == user_id);
        own.extend(others);
        GameResult {
            match_id: self.match_id,
            match_results: own,
            transaction: None,
        }
    }
}
