// src/config/mod.rs
// All tunables load from the environment with sane defaults.

use once_cell::sync::Lazy;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct BereaConfig {
    // ── Completion API
    pub openai_base_url: String,
    pub model: String,
    pub openai_timeout: u64,

    // ── Database
    pub database_url: String,

    // ── Server
    pub host: String,
    pub port: u16,

    // ── Chat behavior
    pub checkpoint_interval_chars: usize,
    pub history_default_limit: usize,
    pub history_max_limit: usize,

    // ── Logging
    pub log_level: String,
}

/// Strip trailing comments and whitespace before parsing.
fn parse_clean<T: FromStr>(raw: &str) -> Option<T> {
    raw.split('#').next().unwrap_or("").trim().parse::<T>().ok()
}

/// Parse an env var, falling back to the default when unset or unparseable.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => match parse_clean(&val) {
            Some(parsed) => parsed,
            None => {
                eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                default
            }
        },
        Err(_) => default,
    }
}

pub static CONFIG: Lazy<BereaConfig> = Lazy::new(|| BereaConfig {
    openai_base_url: env_var_or(
        "OPENAI_BASE_URL",
        "https://api.openai.com/v1".to_string(),
    ),
    model: env_var_or("BEREA_MODEL", "gpt-4o-mini".to_string()),
    openai_timeout: env_var_or("OPENAI_TIMEOUT", 30),
    database_url: env_var_or("DATABASE_URL", "sqlite://berea.db?mode=rwc".to_string()),
    host: env_var_or("BEREA_HOST", "127.0.0.1".to_string()),
    port: env_var_or("BEREA_PORT", 8080),
    checkpoint_interval_chars: env_var_or("BEREA_CHECKPOINT_CHARS", 100),
    history_default_limit: env_var_or("BEREA_HISTORY_DEFAULT_LIMIT", 50),
    history_max_limit: env_var_or("BEREA_HISTORY_MAX_LIMIT", 100),
    log_level: env_var_or("BEREA_LOG_LEVEL", "info".to_string()),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or_default_when_unset() {
        let value: usize = env_var_or("BEREA_TEST_UNSET_KEY", 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_clean_strips_comment() {
        assert_eq!(parse_clean::<usize>("7 # seven"), Some(7));
        assert_eq!(parse_clean::<u16>("  8080  "), Some(8080));
        assert_eq!(parse_clean::<usize>("not a number"), None);
    }
}
