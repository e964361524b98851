use dotenv::dotenv;
use std::env;
use uuid::Uuid;

const INSTRUMENT_ID: &str = "INSTRUMENT_ID";
const DEPTH_LEVELS: &str = "DEPTH_LEVELS";
const EVENT_CAPACITY: &str = "EVENT_CAPACITY";

/// Runtime configuration for the demo binary, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Instrument the engine will manage. Random when unset.
    pub instrument_id: Uuid,
    /// Price levels per side in published depth views.
    pub depth_levels: usize,
    /// Event bus channel capacity.
    pub event_capacity: usize,
}

impl Config {
    pub fn from_env() -> Config {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<Config, String> {
        // Load .env file
        dotenv().ok();

        let instrument_id = match env::var(INSTRUMENT_ID) {
            Ok(raw) => Uuid::parse_str(raw.trim())
                .map_err(|_| format!("failed to parse {}: {}", INSTRUMENT_ID, raw))?,
            Err(_) => Uuid::new_v4(),
        };

        let depth_levels = match env::var(DEPTH_LEVELS) {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("failed to parse {}: {}", DEPTH_LEVELS, raw))?,
            Err(_) => 10,
        };

        let event_capacity = match env::var(EVENT_CAPACITY) {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("failed to parse {}: {}", EVENT_CAPACITY, raw))?,
            Err(_) => 1024,
        };

        Ok(Config {
            instrument_id,
            depth_levels,
            event_capacity,
        })
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            instrument_id: Uuid::new_v4(),
            depth_levels: 10,
            event_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.depth_levels, 10);
        assert_eq!(config.event_capacity, 1024);
    }
}
