use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Upper bound for one restaurant's aggregation within a pass, so a slow
    /// query cannot stall the whole batch.
    #[serde(default = "default_restaurant_timeout_secs")]
    pub restaurant_timeout_secs: u64,
}

fn default_restaurant_timeout_secs() -> u64 {
    60
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            restaurant_timeout_secs: default_restaurant_timeout_secs(),
        }
    }
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // Read the config file if present, otherwise build from env vars.
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => toml::from_str(&config_str)
                .with_context(|| format!("Failed to parse {config_path}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // The database URL must be provided when there is no config file.
                let database_url = get_env("DATABASE_URL")
                    .ok_or_else(|| anyhow!("Missing DATABASE_URL env var and no {config_path}"))?;

                Config {
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    reports: ReportsConfig {
                        restaurant_timeout_secs: get_env_parse(
                            "REPORTS_RESTAURANT_TIMEOUT_SECS",
                            default_restaurant_timeout_secs(),
                        ),
                    },
                }
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("Failed to read {config_path}")));
            }
        };

        // Env vars win over file values when both are set.
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(n) = v.parse() {
                config.database.max_connections = n;
            }
        }
        if let Ok(v) = env::var("REPORTS_RESTAURANT_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                config.reports.restaurant_timeout_secs = n;
            }
        }

        Ok(config)
    }
}
