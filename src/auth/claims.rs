//! Typed claim sets carried by access tokens.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const JWT_SEGMENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Seconds since the epoch. Integral values keep their integer form when
/// re-serialized; fractional ones are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericDate {
    Whole(i64),
    Fractional(f64),
}

impl NumericDate {
    pub fn as_secs_f64(self) -> f64 {
        match self {
            NumericDate::Whole(secs) => secs as f64,
            NumericDate::Fractional(secs) => secs,
        }
    }
}

impl std::fmt::Display for NumericDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumericDate::Whole(secs) => write!(f, "{}", secs),
            NumericDate::Fractional(secs) => write!(f, "{}", secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthMethod {
    pub method: String,
    pub timestamp: i64,
}

/// Claims of an authenticated principal.
///
/// `sub` is required. Well-known members are type-checked when present; any
/// other member is preserved untouched in `extra` so the full claim set can be
/// handed to row-level-security policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<NumericDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<NumericDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<NumericDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_anonymous: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amr: Option<Vec<AuthMethod>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("Access token must not be empty")]
    Empty,
    #[error("Access token must be a JWT")]
    NotAJwt,
    #[error("Access token payload is invalid")]
    InvalidPayload,
    #[error("Access token claims are invalid: {0}")]
    InvalidClaims(String),
}

impl Claims {
    /// Minimal claim set for a principal identified by subject and role only.
    pub fn for_subject(sub: impl Into<String>, role: Option<String>) -> Self {
        Self {
            sub: sub.into(),
            role,
            iss: None,
            aud: None,
            exp: None,
            iat: None,
            nbf: None,
            jti: None,
            email: None,
            phone: None,
            session_id: None,
            is_anonymous: None,
            amr: None,
            extra: Map::new(),
        }
    }

    pub fn from_value(value: Value) -> Result<Self, ClaimsError> {
        if !value.is_object() {
            return Err(ClaimsError::InvalidClaims("claims must be an object".into()));
        }
        serde_json::from_value(value).map_err(|e| ClaimsError::InvalidClaims(e.to_string()))
    }

    /// Trimmed, non-empty email claim.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Reads the claims of an access token WITHOUT verifying its signature.
///
/// Only for tokens that were already verified upstream.
pub fn parse_access_token(token: &str) -> Result<Claims, ClaimsError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(ClaimsError::Empty);
    }

    let mut segments = trimmed.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) => payload,
        _ => return Err(ClaimsError::NotAJwt),
    };

    let bytes = JWT_SEGMENT
        .decode(payload)
        .map_err(|_| ClaimsError::InvalidPayload)?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|_| ClaimsError::InvalidPayload)?;

    Claims::from_value(value)
}
