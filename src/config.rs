use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not valid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,

    /// Address the server listens on
    pub server_ip_port: String,
    /// Comma separated list of origins allowed by CORS
    pub allow_origins: String,
    pub db_max_connections: u32,

    /// Enables `POST /login`, which starts a session for any known username.
    pub allow_dev_login: bool,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let server_ip_port = lookup("SERVER_IP_PORT").unwrap_or("0.0.0.0:3031".into());
        let allow_origins = lookup("ALLOW_ORIGINS").unwrap_or("http://localhost:5173".into());

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                value,
            })?,
            None => 16,
        };

        let allow_dev_login = match lookup("ALLOW_DEV_LOGIN").as_deref() {
            None | Some("false") | Some("0") | Some("") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "ALLOW_DEV_LOGIN",
                    value: other.to_owned(),
                });
            }
        };

        Ok(Config {
            database_url,
            server_ip_port,
            allow_origins,
            db_max_connections,
            allow_dev_login,
        })
    }

    pub fn allowed_origins(&self) -> impl Iterator<Item = &str> {
        self.allow_origins.split(',').map(str::trim).filter(|o| !o.is_empty())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:")])).unwrap();
        assert_eq!(config.server_ip_port, "0.0.0.0:3031");
        assert_eq!(config.db_max_connections, 16);
        assert!(!config.allow_dev_login);
        assert_eq!(config.allowed_origins().collect::<Vec<_>>(), ["http://localhost:5173"]);
    }

    #[test]
    fn test_missing_database_url() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://nudge.db"),
            ("ALLOW_ORIGINS", "http://a.test, http://b.test,"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("ALLOW_DEV_LOGIN", "true"),
        ]))
        .unwrap();
        assert_eq!(config.db_max_connections, 4);
        assert!(config.allow_dev_login);
        assert_eq!(config.allowed_origins().collect::<Vec<_>>(), ["http://a.test", "http://b.test"]);

        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("DB_MAX_CONNECTIONS", "many")])).is_err());
    }
}
