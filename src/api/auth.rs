/// Auth provider client
///
/// The provider is an external GoTrue-style service configured by two
/// environment variables (URL + public key). It owns credentials and
/// token issuance entirely; this module only performs the REST calls
/// and converts the relative `expires_in` into an absolute instant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// An authenticated session as issued by the provider.
///
/// This is the exact shape persisted to disk between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

impl Session {
    /// Whether the access token is expired (or about to be). The margin
    /// keeps a token from expiring mid-request.
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(30) >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base: String,
    api_key: String,
}

/// Successful answer of the signup/token endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    /// Seconds until the access token expires.
    expires_in: i64,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, issued_at: DateTime<Utc>) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: issued_at + Duration::seconds(self.expires_in),
            user: self.user,
        }
    }
}

/// Error bodies vary between endpoints; take whichever message field
/// is present.
#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AuthClient {
    pub fn new(base: String, api_key: String) -> Self {
        AuthClient {
            http: reqwest::Client::new(),
            base,
            api_key,
        }
    }

    /// Register a new account. The provider sends a confirmation email;
    /// no session is issued here.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), Error> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .http
            .post(format!("{}/auth/v1/signup", self.base))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;
        check_auth(response).await?;
        Ok(())
    }

    /// Exchange credentials for a session (password grant).
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .http
            .post(format!("{}/auth/v1/token?grant_type=password", self.base))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let token: TokenResponse = check_auth(response).await?.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    /// Exchange a refresh token for a fresh session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, Error> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self
            .http
            .post(format!("{}/auth/v1/token?grant_type=refresh_token", self.base))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let token: TokenResponse = check_auth(response).await?.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    /// Revoke the session remotely. Local cleanup happens regardless of
    /// the outcome here.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
        let response = self
            .http
            .post(format!("{}/auth/v1/logout", self.base))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        check_auth(response).await?;
        Ok(())
    }
}

/// Auth endpoints report failures as 4xx with a JSON message body.
/// All of them surface as `Error::Auth` for inline display on the form.
async fn check_auth(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<AuthErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error_description.or(body.msg).or(body.error))
        .unwrap_or_else(|| format!("authentication failed ({status})"));
    Err(Error::Auth(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_absolute() {
        let issued = Utc::now();
        let token = TokenResponse {
            access_token: "t".into(),
            refresh_token: "r".into(),
            expires_in: 3600,
            user: AuthUser {
                id: "u1".into(),
                email: "u@example.com".into(),
            },
        };

        let session = token.into_session(issued);
        assert_eq!(session.expires_at, issued + Duration::seconds(3600));
        assert!(!session.is_expired());
    }

    #[test]
    fn stale_session_reports_expired() {
        let session = Session {
            access_token: "t".into(),
            refresh_token: "r".into(),
            expires_at: Utc::now() - Duration::minutes(5),
            user: AuthUser {
                id: "u1".into(),
                email: String::new(),
            },
        };
        assert!(session.is_expired());
    }

    #[test]
    fn near_expiry_counts_as_expired() {
        // Inside the 30 second margin.
        let session = Session {
            access_token: "t".into(),
            refresh_token: "r".into(),
            expires_at: Utc::now() + Duration::seconds(10),
            user: AuthUser {
                id: "u1".into(),
                email: String::new(),
            },
        };
        assert!(session.is_expired());
    }
}
