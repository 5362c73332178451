use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path};

const DEFAULT_PORT: u16 = 8000;

const fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// PostgreSQL DSN; without one notes live in process memory.
    #[serde(default)]
    pub database_dsn: Option<String>,
    #[serde(default)]
    pub secure_cookies: bool,
}

fn parse_config(contents: &str) -> Result<Config, Box<dyn std::error::Error>> {
    serde_yaml::from_str(contents).map_err(Into::into)
}

fn load_from_env() -> Result<Config, Box<dyn std::error::Error>> {
    let port = match env::var("NOTES_PORT") {
        Ok(port) => port
            .parse::<u16>()
            .map_err(|e| format!("Failed to parse NOTES_PORT: {e}"))?,
        Err(_) => DEFAULT_PORT,
    };

    let database_dsn = env::var("PG_DSN").ok().filter(|dsn| !dsn.is_empty());

    let secure_cookies = match env::var("NOTES_SECURE_COOKIES") {
        Ok(flag) => flag
            .parse::<bool>()
            .map_err(|e| format!("Failed to parse NOTES_SECURE_COOKIES: {e}"))?,
        Err(_) => false,
    };

    Ok(Config {
        port,
        database_dsn,
        secure_cookies,
    })
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path = env::var("NOTES_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return parse_config(&fs::read_to_string(&config_path)?);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return parse_config(&fs::read_to_string("config.yaml")?);
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'",
            config_path
        );
        return parse_config(&fs::read_to_string("config.example.yaml")?);
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    load_from_env().map_err(|e| {
        format!(
            "Config file not found and environment variables are invalid. \
             Tried: '{config_path}', 'config.yaml', 'config.example.yaml', and environment variables. \
             Error: {e}"
        )
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = parse_config(
            "port: 9000\ndatabase_dsn: \"host=db user=notes\"\nsecure_cookies: true\n",
        )
        .unwrap();

        assert_eq!(
            config,
            Config {
                port: 9000,
                database_dsn: Some("host=db user=notes".to_string()),
                secure_cookies: true,
            }
        );
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = parse_config("{}").unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_dsn, None);
        assert!(!config.secure_cookies);
    }

    #[test]
    fn rejects_bad_port() {
        assert!(parse_config("port: not-a-number").is_err());
    }
}
