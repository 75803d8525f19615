//! Client for the identity provider's password and refresh-token endpoints.

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

const SIGNUP_PATH: &str = "/auth/v1/signup";
const TOKEN_PATH: &str = "/auth/v1/token";

#[derive(Debug, Error)]
pub enum AuthClientError {
    #[error("Project URL must not be empty")]
    EmptyProjectUrl,
    #[error("Project URL must be a valid absolute URL: {0}")]
    InvalidProjectUrl(String),
    #[error("Publishable key must not be empty")]
    EmptyPublishableKey,
    #[error("Auth request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to parse auth response: {message}")]
    MalformedResponse { status: u16, message: String },
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Auth response did not include token details")]
    MissingToken,
}

impl AuthClientError {
    /// HTTP status that best describes the failure.
    pub fn status(&self) -> u16 {
        match self {
            AuthClientError::Rejected { status, .. } => *status,
            AuthClientError::MalformedResponse { status, .. } => *status,
            AuthClientError::MissingToken => 502,
            _ => 500,
        }
    }
}

/// Tokens issued on login or refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: f64,
}

#[derive(Deserialize)]
struct RestToken {
    access_token: String,
    refresh_token: String,
    token_type: String,
    expires_in: f64,
}

impl RestToken {
    fn from_value(value: &Value) -> Option<Self> {
        let token = Self::deserialize(value).ok()?;
        token.expires_in.is_finite().then_some(token)
    }
}

pub struct AuthClient {
    project_url: Url,
    publishable_key: String,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(project_url: &str, publishable_key: &str) -> Result<Self, AuthClientError> {
        let project_url = project_url.trim();
        if project_url.is_empty() {
            return Err(AuthClientError::EmptyProjectUrl);
        }
        let project_url = Url::parse(project_url)
            .map_err(|_| AuthClientError::InvalidProjectUrl(project_url.to_string()))?;

        let publishable_key = publishable_key.trim();
        if publishable_key.is_empty() {
            return Err(AuthClientError::EmptyPublishableKey);
        }

        Ok(Self {
            project_url,
            publishable_key: publishable_key.to_string(),
            http: reqwest::Client::new(),
        })
    }

    /// Registers an account. `redirect_url` is where the confirmation link lands.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        redirect_url: Option<&str>,
    ) -> Result<(), AuthClientError> {
        let query: Vec<(&str, &str)> = redirect_url.map(|u| ("redirect_to", u)).into_iter().collect();
        self.post(
            SIGNUP_PATH,
            &query,
            json!({ "email": email, "password": password }),
        )
        .await?;
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthClientError> {
        let payload = self
            .post(
                TOKEN_PATH,
                &[("grant_type", "password")],
                json!({ "email": email, "password": password }),
            )
            .await?;
        extract_tokens(payload)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthClientError> {
        let payload = self
            .post(
                TOKEN_PATH,
                &[("grant_type", "refresh_token")],
                json!({ "refresh_token": refresh_token }),
            )
            .await?;
        extract_tokens(payload)
    }

    async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Value,
    ) -> Result<Option<Value>, AuthClientError> {
        let mut url = self
            .project_url
            .join(path)
            .map_err(|_| AuthClientError::InvalidProjectUrl(self.project_url.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .header("apikey", &self.publishable_key)
            .bearer_auth(&self.publishable_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let payload = if text.trim().is_empty() {
            None
        } else {
            let value = serde_json::from_str::<Value>(&text).map_err(|e| {
                AuthClientError::MalformedResponse {
                    status: status.as_u16(),
                    message: e.to_string(),
                }
            })?;
            Some(value)
        };

        if !status.is_success() {
            let message = payload
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| format!("Auth request failed with status {}", status.as_u16()));
            tracing::warn!(status = status.as_u16(), "auth request rejected: {}", message);
            return Err(AuthClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(payload)
    }
}

/// Token fields either at the top level or under `data`.
fn extract_tokens(payload: Option<Value>) -> Result<TokenPair, AuthClientError> {
    let payload = payload.ok_or(AuthClientError::MissingToken)?;
    let token = RestToken::from_value(&payload)
        .or_else(|| payload.get("data").and_then(RestToken::from_value))
        .ok_or(AuthClientError::MissingToken)?;

    Ok(TokenPair {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        token_type: token.token_type,
        expires_in: token.expires_in,
    })
}

fn error_message(payload: &Value) -> Option<String> {
    ["error", "error_description", "message", "msg"]
        .iter()
        .filter_map(|key| payload.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}
