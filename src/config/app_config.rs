use std::env;
use std::time::Duration;

const DEFAULT_GROUP_LOOKUP_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_CHAT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Credentials and endpoints of the chat service
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base of the chat REST API, e.g. `https://chat.example.com/api/v3`
    pub api_base_url: String,
    /// Token used for group lookups on behalf of this service
    pub bot_token: Option<String>,
    pub webhook_id: Option<String>,
    pub webhook_secret: Option<String>,
    /// Public URL of this service, used for links in chat messages
    pub app_base_url: String,
    pub request_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://chat.example.com/api/v3".to_string(),
            bot_token: None,
            webhook_id: None,
            webhook_secret: None,
            app_base_url: "https://questionnaire.example.com".to_string(),
            request_timeout: Duration::from_millis(DEFAULT_CHAT_REQUEST_TIMEOUT_MS),
        }
    }
}

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    /// Unset selects the in-process store
    pub database_url: Option<String>,
    pub group_lookup_timeout: Duration,
    pub chat: ChatConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 8080,
            database_url: None,
            group_lookup_timeout: Duration::from_millis(DEFAULT_GROUP_LOOKUP_TIMEOUT_MS),
            chat: ChatConfig::default(),
        }
    }
}

impl AppConfig {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = non_empty(env::var("DATABASE_URL").ok());
        if database_url.is_none() {
            tracing::warn!(
                "DATABASE_URL is not set; responses are kept in memory and lost on restart."
            );
        }

        let group_lookup_timeout = parse_millis(
            "GROUP_LOOKUP_TIMEOUT_MS",
            env::var("GROUP_LOOKUP_TIMEOUT_MS").ok(),
            DEFAULT_GROUP_LOOKUP_TIMEOUT_MS,
        )?;

        let webhook_id = non_empty(env::var("CHAT_WEBHOOK_ID").ok());
        let webhook_secret = non_empty(env::var("CHAT_WEBHOOK_SECRET").ok());
        if webhook_id.is_none() || webhook_secret.is_none() {
            tracing::warn!(
                "CHAT_WEBHOOK_ID or CHAT_WEBHOOK_SECRET is not set; chat notifications are disabled."
            );
        }

        let chat = ChatConfig {
            api_base_url: env::var("CHAT_API_BASE_URL")
                .unwrap_or(defaults.chat.api_base_url)
                .trim_end_matches('/')
                .to_string(),
            bot_token: non_empty(env::var("CHAT_BOT_TOKEN").ok()),
            webhook_id,
            webhook_secret,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or(defaults.chat.app_base_url)
                .trim_end_matches('/')
                .to_string(),
            request_timeout: parse_millis(
                "CHAT_REQUEST_TIMEOUT_MS",
                env::var("CHAT_REQUEST_TIMEOUT_MS").ok(),
                DEFAULT_CHAT_REQUEST_TIMEOUT_MS,
            )?,
        };

        Ok(Self {
            server_port,
            database_url,
            group_lookup_timeout,
            chat,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_millis(
    name: &'static str,
    raw: Option<String>,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    match non_empty(raw) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .ok_or(ConfigError::InvalidTimeout(name)),
        None => Ok(Duration::from_millis(default_ms)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Invalid timeout in {0}; expected a positive number of milliseconds")]
    InvalidTimeout(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_default_when_timeout_is_unset_or_blank() {
        assert_eq!(
            parse_millis("T", None, 1500).unwrap(),
            Duration::from_millis(1500)
        );
        assert_eq!(
            parse_millis("T", Some("  ".to_string()), 1500).unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn should_parse_timeout_in_millis() {
        let timeout = parse_millis("T", Some("250".to_string()), 1500).unwrap();

        assert_eq!(timeout, Duration::from_millis(250));
    }

    #[test]
    fn should_reject_zero_or_garbage_timeout() {
        assert!(matches!(
            parse_millis("T", Some("0".to_string()), 1500),
            Err(ConfigError::InvalidTimeout("T"))
        ));
        assert!(matches!(
            parse_millis("T", Some("soon".to_string()), 1500),
            Err(ConfigError::InvalidTimeout("T"))
        ));
    }
}
