use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;

use crate::error::{RelayError, Result};

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    pub api_key: String,
    pub api_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub image_size: String,

    /// Upper bound for both page and image counts.
    pub max_pages: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Builds the config from a variable lookup. Unset or unreadable
    /// variables take their defaults.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RelayError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let port = get("PORT", "3001")
            .parse()
            .map_err(|e| RelayError::Config(format!("invalid PORT: {e}")))?;

        let max_pages: usize = get("STORY_MAX_PAGES", "10")
            .parse()
            .map_err(|e| RelayError::Config(format!("invalid STORY_MAX_PAGES: {e}")))?;
        if max_pages == 0 {
            return Err(RelayError::Config(
                "STORY_MAX_PAGES must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            host: get("HOST", "0.0.0.0"),
            port,
            api_key,
            api_base_url: get("OPENAI_BASE_URL", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            text_model: get("STORY_TEXT_MODEL", "gpt-4o"),
            image_model: get("STORY_IMAGE_MODEL", "dall-e-3"),
            image_size: get("STORY_IMAGE_SIZE", "1024x1024"),
            max_pages,
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| RelayError::Config(format!("invalid listen address: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_with_only_a_key() {
        let config = Config::from_vars(&vars(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.api_base_url, "https://api.openai.com/v1");
        assert_eq!(config.text_model, "gpt-4o");
        assert_eq!(config.image_model, "dall-e-3");
        assert_eq!(config.image_size, "1024x1024");
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:3001");
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = Config::from_vars(&vars(&[])).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Config::from_vars(&vars(&[("OPENAI_API_KEY", "sk"), ("PORT", "abc")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_variables_do_not_abort_startup() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // SAFETY: no other test in this binary touches the process environment.
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("STORY_RELAY_UNRELATED_BYTES", OsStr::from_bytes(&[0xff, 0xfe]));
            env::set_var("STORY_IMAGE_SIZE", OsStr::from_bytes(&[0xff]));
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.image_size, "1024x1024");
    }

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let config = Config::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk"),
            ("OPENAI_BASE_URL", "http://127.0.0.1:9000/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000/v1");
    }
}
