use crate::game::GameConfig;
use crate::pairing::PairingConfig;
use crate::simulation::{GoalProbability, SimulationConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

const DELIVERY_RETRIES: u32 = 3;

#[derive(Parser, Debug, Clone)]
#[command(name = "ultimatedivision")]
#[command(about = "Matchmaking server for Ultimate Division", long_about = None)]
pub struct Config {
    /// Address the HTTP and WebSocket server listens on
    #[arg(long, env = "UD_ADDRESS", default_value = "127.0.0.1:8000")]
    pub address: SocketAddr,

    /// How often waiting clients are paired, in milliseconds
    #[arg(
        long,
        env = "UD_PLACE_RENEWAL_INTERVAL_MS",
        default_value_t = 2000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub place_renewal_interval_ms: u64,

    /// How long a paired client has to confirm, in milliseconds
    #[arg(long, env = "UD_CONFIRMATION_TIMEOUT_MS", default_value_t = 30_000)]
    pub confirmation_timeout_ms: u64,

    #[arg(long, env = "UD_WINNING_AWARD", default_value_t = 100)]
    pub winning_award: u64,

    #[arg(long, env = "UD_SQUAD_SIZE", default_value_t = 11)]
    pub squad_size: usize,

    #[arg(long, env = "UD_LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,

    #[arg(long, env = "UD_LOG_LEVEL", default_value = "info")]
    pub log_level: Level,

    /// Users with full squads seeded into memory at startup
    #[arg(long, env = "UD_DEMO_USERS", default_value_t = 0)]
    pub demo_users: usize,

    /// Attacks played out per simulated match
    #[arg(long, env = "UD_MATCH_CHANCES", default_value_t = 12)]
    pub match_chances: u32,

    // Percent chance that an attack finished by a card in each position scores
    #[arg(long, env = "UD_GOAL_CHANCE_GOALKEEPER", default_value_t = 1.0, value_parser = percent)]
    pub goal_chance_goalkeeper: f64,

    #[arg(long, env = "UD_GOAL_CHANCE_DEFENDER", default_value_t = 10.0, value_parser = percent)]
    pub goal_chance_defender: f64,

    #[arg(long, env = "UD_GOAL_CHANCE_MIDFIELDER", default_value_t = 25.0, value_parser = percent)]
    pub goal_chance_midfielder: f64,

    #[arg(long, env = "UD_GOAL_CHANCE_FORWARD", default_value_t = 40.0, value_parser = percent)]
    pub goal_chance_forward: f64,
}

fn percent(value: &str) -> Result<f64, String> {
    let percent: f64 = value.parse().map_err(|_| format!("`{}` is not a number", value))?;
    if (0.0..=100.0).contains(&percent) {
        Ok(percent)
    } else {
        Err(format!("{} is not between 0 and 100", percent))
    }
}

impl Config {
    pub fn pairing(&self) -> PairingConfig {
        PairingConfig {
            renewal_interval: Duration::from_millis(self.place_renewal_interval_ms),
            confirmation_timeout: Duration::from_millis(self.confirmation_timeout_ms),
        }
    }

    pub fn game(&self) -> GameConfig {
        GameConfig {
            squad_size: self.squad_size,
            winning_award: self.winning_award,
            delivery_retries: DELIVERY_RETRIES,
        }
    }

    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            chances: self.match_chances,
            goal_probability: GoalProbability {
                goalkeeper: self.goal_chance_goalkeeper,
                defender: self.goal_chance_defender,
                midfielder: self.goal_chance_midfielder,
                forward: self.goal_chance_forward,
            },
            ..SimulationConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["ultimatedivision"]).unwrap();
        assert_eq!(config.address, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.demo_users, 0);

        let pairing = config.pairing();
        assert_eq!(pairing.renewal_interval, Duration::from_secs(2));
        assert_eq!(pairing.confirmation_timeout, Duration::from_secs(30));

        let game = config.game();
        assert_eq!(game.squad_size, 11);
        assert_eq!(game.winning_award, 100);

        assert_eq!(config.simulation(), SimulationConfig::default());
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "ultimatedivision",
            "--address",
            "0.0.0.0:9000",
            "--place-renewal-interval-ms",
            "500",
            "--squad-size",
            "5",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(config.address.port(), 9000);
        assert_eq!(config.pairing().renewal_interval, Duration::from_millis(500));
        assert_eq!(config.game().squad_size, 5);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_goal_chances() {
        let config = Config::try_parse_from([
            "ultimatedivision",
            "--match-chances",
            "20",
            "--goal-chance-forward",
            "75.5",
            "--goal-chance-goalkeeper",
            "0",
        ])
        .unwrap();
        let simulation = config.simulation();
        assert_eq!(simulation.chances, 20);
        assert_eq!(simulation.goal_probability.forward, 75.5);
        assert_eq!(simulation.goal_probability.goalkeeper, 0.0);
        assert_eq!(simulation.goal_probability.defender, 10.0);
        assert_eq!(simulation.match_minutes, 90);

        for chance in ["101", "-1", "often"] {
            assert!(Config::try_parse_from(["ultimatedivision", "--goal-chance-defender", chance]).is_err());
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::try_parse_from(["ultimatedivision", "--address", "nowhere"]).is_err());
        assert!(
            Config::try_parse_from(["ultimatedivision", "--place-renewal-interval-ms", "0"]).is_err()
        );
    }
}
