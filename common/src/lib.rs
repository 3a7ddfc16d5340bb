pub mod messages;
pub mod results;

pub use messages::{status, Action, Request, Response, Wallet};
pub use results::{GameResult, Goalscorer, MatchResult, Transaction};
