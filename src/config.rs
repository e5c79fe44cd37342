use crate::domain::Decimal;
use crate::engine::AmountRules;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Base URL of the auth service. When unset, `static_sessions` is used.
    pub auth_service_url: Option<String>,
    /// `token:user_id[:admin]` list for local runs.
    pub static_sessions: String,
    pub default_commission_rate: Decimal,
    pub min_withdrawal: Decimal,
    pub currency_scale: u32,
    /// Upper bound for any single price, bid, sale or withdrawal.
    pub max_amount: Decimal,
    pub conflict_retries: u32,
    /// Auction finalizer sweep period; 0 disables the sweeper.
    pub finalize_interval_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", "8080", "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let auth_service_url = env_map
            .get("AUTH_SERVICE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let static_sessions = env_map.get("STATIC_SESSIONS").cloned().unwrap_or_default();

        let default_commission_rate: Decimal = parse_or(
            &env_map,
            "DEFAULT_COMMISSION_RATE",
            "0.1",
            "must be a decimal",
        )?;
        if !default_commission_rate.is_positive() || default_commission_rate > Decimal::one() {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_COMMISSION_RATE".to_string(),
                format!("must be in (0, 1], got {}", default_commission_rate),
            ));
        }

        let min_withdrawal: Decimal =
            parse_or(&env_map, "MIN_WITHDRAWAL", "500", "must be a decimal")?;
        if min_withdrawal.is_negative() {
            return Err(ConfigError::InvalidValue(
                "MIN_WITHDRAWAL".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let currency_scale: u32 = parse_or(&env_map, "CURRENCY_SCALE", "2", "must be a valid u32")?;
        if currency_scale > 8 {
            return Err(ConfigError::InvalidValue(
                "CURRENCY_SCALE".to_string(),
                "must be at most 8".to_string(),
            ));
        }

        let max_amount: Decimal =
            parse_or(&env_map, "MAX_AMOUNT", "1000000000000", "must be a decimal")?;
        if !max_amount.is_positive() {
            return Err(ConfigError::InvalidValue(
                "MAX_AMOUNT".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let conflict_retries: u32 =
            parse_or(&env_map, "CONFLICT_RETRIES", "5", "must be a valid u32")?;
        if conflict_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "CONFLICT_RETRIES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let finalize_interval_ms = parse_or(
            &env_map,
            "FINALIZE_INTERVAL_MS",
            "5000",
            "must be a valid u64",
        )?;

        Ok(Config {
            port,
            database_path,
            auth_service_url,
            static_sessions,
            default_commission_rate,
            min_withdrawal,
            currency_scale,
            max_amount,
            conflict_retries,
            finalize_interval_ms,
        })
    }

    pub fn amount_rules(&self) -> AmountRules {
        AmountRules {
            currency_scale: self.currency_scale,
            maximum: self.max_amount,
        }
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    reason: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.auth_service_url.is_none());
        assert_eq!(config.default_commission_rate.to_canonical_string(), "0.1");
        assert_eq!(config.min_withdrawal, Decimal::from(500));
        assert_eq!(config.currency_scale, 2);
        assert_eq!(config.amount_rules(), AmountRules::default());
        assert_eq!(config.conflict_retries, 5);
        assert_eq!(config.finalize_interval_ms, 5000);
    }

    #[test]
    fn test_missing_database_path() {
        let result = Config::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_commission_rate_out_of_range() {
        for bad in ["0", "1.5", "-0.2", "ten"] {
            let mut env_map = setup_required_env();
            env_map.insert("DEFAULT_COMMISSION_RATE".to_string(), bad.to_string());
            match Config::from_env_map(env_map) {
                Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DEFAULT_COMMISSION_RATE"),
                _ => panic!("Expected InvalidValue error for {}", bad),
            }
        }
    }

    #[test]
    fn test_zero_conflict_retries_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("CONFLICT_RETRIES".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CONFLICT_RETRIES"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_max_amount_must_be_positive() {
        for bad in ["0", "-1", "lots"] {
            let mut env_map = setup_required_env();
            env_map.insert("MAX_AMOUNT".to_string(), bad.to_string());
            match Config::from_env_map(env_map) {
                Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "MAX_AMOUNT"),
                _ => panic!("Expected InvalidValue error for {}", bad),
            }
        }
    }

    #[test]
    fn test_blank_auth_url_means_static_sessions() {
        let mut env_map = setup_required_env();
        env_map.insert("AUTH_SERVICE_URL".to_string(), "  ".to_string());
        env_map.insert("STATIC_SESSIONS".to_string(), "t1:u1".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert!(config.auth_service_url.is_none());
        assert_eq!(config.static_sessions, "t1:u1");
    }
}
