use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Externally reachable hostname, used to build the `wss://` stream URL
    /// handed to the telephony provider.
    pub public_host: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub elevenlabs_api_key: String,
    pub elevenlabs_agent_id: String,
    pub mail_api_base: String,
    pub phone_accounts_path: PathBuf,
    pub session_ttl: Duration,
    pub log_level: Level,
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let public_host = require_var("PUBLIC_HOST")?;
        let twilio_account_sid = require_var("TWILIO_ACCOUNT_SID")?;
        let twilio_auth_token = require_var("TWILIO_AUTH_TOKEN")?;
        let elevenlabs_api_key = require_var("ELEVENLABS_API_KEY")?;
        let elevenlabs_agent_id = require_var("ELEVENLABS_AGENT_ID")?;

        let mail_api_base = std::env::var("MAIL_API_BASE")
            .unwrap_or_else(|_| "https://gmail.googleapis.com/gmail/v1".to_string());

        let phone_accounts_path = PathBuf::from(require_var("PHONE_ACCOUNTS")?);

        let ttl_str = std::env::var("SESSION_TTL_SECS").unwrap_or_else(|_| "3600".to_string());
        let session_ttl = ttl_str
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SESSION_TTL_SECS".to_string(),
                    format!("'{}' is not a number of seconds", ttl_str),
                )
            })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            public_host,
            twilio_account_sid,
            twilio_auth_token,
            elevenlabs_api_key,
            elevenlabs_agent_id,
            mail_api_base,
            phone_accounts_path,
            session_ttl,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("PUBLIC_HOST");
            env::remove_var("TWILIO_ACCOUNT_SID");
            env::remove_var("TWILIO_AUTH_TOKEN");
            env::remove_var("ELEVENLABS_API_KEY");
            env::remove_var("ELEVENLABS_AGENT_ID");
            env::remove_var("MAIL_API_BASE");
            env::remove_var("PHONE_ACCOUNTS");
            env::remove_var("SESSION_TTL_SECS");
            env::remove_var("RUST_LOG");
        }
    }

    fn set_minimal_env() {
        unsafe {
            env::set_var("PUBLIC_HOST", "voice.example.com");
            env::set_var("TWILIO_ACCOUNT_SID", "ACtest");
            env::set_var("TWILIO_AUTH_TOKEN", "token");
            env::set_var("ELEVENLABS_API_KEY", "el-key");
            env::set_var("ELEVENLABS_AGENT_ID", "agent-1");
            env::set_var("PHONE_ACCOUNTS", "./phone-accounts.json");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        set_minimal_env();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.public_host, "voice.example.com");
        assert_eq!(config.twilio_account_sid, "ACtest");
        assert_eq!(config.elevenlabs_agent_id, "agent-1");
        assert_eq!(
            config.mail_api_base,
            "https://gmail.googleapis.com/gmail/v1"
        );
        assert_eq!(
            config.phone_accounts_path,
            PathBuf::from("./phone-accounts.json")
        );
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("MAIL_API_BASE", "https://mail.internal/api");
            env::set_var("SESSION_TTL_SECS", "120");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.mail_api_base, "https://mail.internal/api");
        assert_eq!(config.session_ttl, Duration::from_secs(120));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_session_ttl() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("SESSION_TTL_SECS", "an hour");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "SESSION_TTL_SECS"),
            _ => panic!("Expected InvalidValue for SESSION_TTL_SECS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_required_vars() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::remove_var("ELEVENLABS_API_KEY");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(name) => assert_eq!(name, "ELEVENLABS_API_KEY"),
            _ => panic!("Expected MissingVar for ELEVENLABS_API_KEY"),
        }
    }
}
