use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.kinopoisk.dev/v1.4";
const DEFAULT_SESSION_TTL_SECS: u64 = 900;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
/// неделя простоя; больше держать незавершённый диалог смысла нет
pub const MAX_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const MAX_HTTP_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Отсутствуют обязательные переменные окружения: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("Переменная {name} должна быть целым числом, получено {value:?}")]
    NotANumber { name: &'static str, value: String },
    #[error("Переменная {name} должна быть не больше {max}, получено {value}")]
    OutOfRange { name: &'static str, value: u64, max: u64 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub kinopoisk_token: String,
    pub telegram_token: String,
    /// чат оператора: туда уходят сообщения об ошибках API
    pub operator_chat_id: i64,
    pub api_url: String,
    pub session_ttl: Duration,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let required = ["KINOPOISK_TOKEN", "TELEGRAM_TOKEN", "TELEGRAM_CHAT_ID"];
        let missing: Vec<&'static str> = required.into_iter().filter(|k| get(*k).is_none()).collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let number = |name: &'static str, default: i64| -> Result<i64, ConfigError> {
            match get(name) {
                Some(value) => value.parse().map_err(|_| ConfigError::NotANumber { name, value }),
                None => Ok(default),
            }
        };
        let secs = |name: &'static str, default: u64, max: u64| -> Result<Duration, ConfigError> {
            let n = number(name, default as i64)?;
            let value = u64::try_from(n).map_err(|_| ConfigError::NotANumber { name, value: n.to_string() })?;
            if value > max {
                return Err(ConfigError::OutOfRange { name, value, max });
            }
            Ok(Duration::from_secs(value))
        };

        Ok(Self {
            kinopoisk_token: get("KINOPOISK_TOKEN").unwrap_or_default(),
            telegram_token: get("TELEGRAM_TOKEN").unwrap_or_default(),
            operator_chat_id: number("TELEGRAM_CHAT_ID", 0)?,
            api_url: get("KINOPOISK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            session_ttl: secs("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS, MAX_SESSION_TTL_SECS)?,
            http_timeout: secs("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS, MAX_HTTP_TIMEOUT_SECS)?,
        })
    }
}
