use std::env;

use crate::error::Error;

/// Endpoint configuration, read once at startup.
///
/// Two variables point at the auth provider and are required -- without
/// them the app cannot authenticate at all. The gallery API base falls
/// back to a local development default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the auth provider (GoTrue-style REST).
    pub auth_url: String,
    /// Public API key sent as the `apikey` header on auth calls.
    pub auth_key: String,
    /// Base URL of the gallery/profile REST API.
    pub api_url: String,
}

const DEFAULT_API_URL: &str = "http://localhost:4000";

impl Config {
    /// Load configuration from a `.env` file (if present) and the
    /// process environment.
    pub fn from_env() -> Result<Self, Error> {
        // A missing .env file is fine; variables may come from the shell.
        dotenv::dotenv().ok();

        let auth_url = required("AUTH_API_URL")?;
        let auth_key = required("AUTH_API_KEY")?;
        let api_url = env::var("GALLERY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Config {
            auth_url: normalize(auth_url),
            auth_key,
            api_url: normalize(api_url),
        })
    }
}

fn required(name: &str) -> Result<String, Error> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

/// Base URLs are joined with literal path segments, so a trailing slash
/// would produce `//gallery`.
fn normalize(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        assert_eq!(normalize("https://api.example.com/".into()), "https://api.example.com");
        assert_eq!(normalize("https://api.example.com".into()), "https://api.example.com");
    }

    #[test]
    fn missing_variable_is_a_config_error() {
        env::remove_var("LUMEN_TEST_UNSET");
        let err = required("LUMEN_TEST_UNSET").unwrap_err();
        assert_eq!(err, Error::Config("LUMEN_TEST_UNSET is not set".into()));
    }
}
