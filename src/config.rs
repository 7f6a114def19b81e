use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_MAX_ACCOUNTS: usize = 20;
pub const DEFAULT_INITIAL_BALANCE: i64 = 100;
/// Largest magnitude accepted for the initial balance, keeping every balance
/// sum and settlement difference far away from `i64` overflow.
pub const MAX_INITIAL_BALANCE: i64 = 1_000_000_000_000;

#[cfg(test)]
pub const TEST_BCRYPT_COST: u32 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub admin_password: String,
    pub session_secret: Vec<u8>,
    pub max_accounts: usize,
    pub initial_balance: i64,
    pub bcrypt_cost: u32,
    pub log_file: Option<LogFileConfig>,
}

#[derive(Clone, Debug)]
pub struct LogFileConfig {
    pub path: String,
    pub archive_pattern: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            session_secret: uuid::Uuid::new_v4().as_bytes().to_vec(),
            max_accounts: DEFAULT_MAX_ACCOUNTS,
            initial_balance: DEFAULT_INITIAL_BALANCE,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            log_file: None,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment, falling back to
    /// defaults for every unset variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let session_secret = lookup("PARTY_BANK_SESSION_SECRET")
            .map(String::into_bytes)
            .unwrap_or(defaults.session_secret);

        let log_file = match (lookup("LOG_FILE_PATH"), lookup("LOG_ARCHIVE_PATTERN")) {
            (Some(path), Some(archive_pattern)) => Some(LogFileConfig {
                path,
                archive_pattern,
            }),
            (Some(path), None) => Some(LogFileConfig {
                archive_pattern: format!("{}.{{}}.gz", path),
                path,
            }),
            _ => None,
        };

        let initial_balance = parse_var(&lookup, "PARTY_BANK_INITIAL_BALANCE", "integer")?
            .unwrap_or(defaults.initial_balance);
        if !(-MAX_INITIAL_BALANCE..=MAX_INITIAL_BALANCE).contains(&initial_balance) {
            return Err(ConfigError::Invalid {
                name: "PARTY_BANK_INITIAL_BALANCE",
                expected: "integer within +/-1000000000000",
                value: initial_balance.to_string(),
            });
        }

        Ok(Self {
            host: lookup("PARTY_BANK_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", "u16")?.unwrap_or(defaults.port),
            admin_password: lookup("PARTY_BANK_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            session_secret,
            max_accounts: parse_var(&lookup, "PARTY_BANK_MAX_ACCOUNTS", "usize")?
                .unwrap_or(defaults.max_accounts),
            initial_balance,
            bcrypt_cost: parse_var(&lookup, "PARTY_BANK_BCRYPT_COST", "bcrypt cost")?
                .unwrap_or(defaults.bcrypt_cost),
            log_file,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                expected,
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).expect("config should load");
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.admin_password, "admin123");
        assert_eq!(config.max_accounts, 20);
        assert_eq!(config.initial_balance, 100);
        assert!(config.log_file.is_none());
        assert!(!config.session_secret.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("PARTY_BANK_ADMIN_PASSWORD", "s3cret"),
            ("PARTY_BANK_INITIAL_BALANCE", "-5"),
            ("LOG_FILE_PATH", "/tmp/bank.log"),
        ]))
        .expect("config should load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.admin_password, "s3cret");
        assert_eq!(config.initial_balance, -5);
        let log_file = config.log_file.expect("log file should be configured");
        assert_eq!(log_file.archive_pattern, "/tmp/bank.log.{}.gz");
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_initial_balance_is_bounded() {
        let err = Config::from_lookup(lookup_from(&[(
            "PARTY_BANK_INITIAL_BALANCE",
            "-9223372036854775808",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("PARTY_BANK_INITIAL_BALANCE"));

        let config = Config::from_lookup(lookup_from(&[(
            "PARTY_BANK_INITIAL_BALANCE",
            "1000000000000",
        )]))
        .expect("the bound itself is allowed");
        assert_eq!(config.initial_balance, MAX_INITIAL_BALANCE);
    }
}
