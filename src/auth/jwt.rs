use async_trait::async_trait;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use super::jwks::RemoteKeySet;
use super::{extract_authorization_token, AuthError, AuthenticatedUser, AuthenticationProvider};
use crate::auth::claims::Claims;
use crate::config::{AuthConfig, ConfigError};

/// Verifies access tokens issued by the identity provider.
///
/// HMAC-signed tokens are checked against the shared secret; asymmetric ones
/// against the project's JWK set, with the key picked by the token's `kid`.
pub struct JwtAuthentication {
    header_name: String,
    scheme: String,
    secret: Option<DecodingKey>,
    key_set: Option<RemoteKeySet>,
    validation: Validation,
    required_role: Option<String>,
}

impl JwtAuthentication {
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let secret = config
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| DecodingKey::from_secret(s.as_bytes()));
        let key_set = config.jwks_url()?.map(RemoteKeySet::new);
        if secret.is_none() && key_set.is_none() {
            return Err(ConfigError::MissingJwtKeys);
        }

        // Algorithms are pinned per token to the one the selected key allows.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.clock_tolerance_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = config.issuer() {
            validation.set_issuer(&[issuer]);
        }
        if config.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&config.audience);
        }

        Ok(Self {
            header_name: config.header_name.clone(),
            scheme: config.scheme.clone(),
            secret,
            key_set,
            validation,
            required_role: config.required_role.clone(),
        })
    }

    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let remote_key;
        let key = if is_hmac(header.alg) {
            self.secret
                .as_ref()
                .ok_or_else(|| AuthError::InvalidToken("HMAC-signed tokens are not accepted".into()))?
        } else {
            let key_set = self.key_set.as_ref().ok_or_else(|| {
                AuthError::InvalidToken(format!("{:?} tokens are not accepted", header.alg))
            })?;
            let jwk = key_set.key_for(header.kid.as_deref()).await?;
            remote_key =
                DecodingKey::from_jwk(&jwk).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
            &remote_key
        };

        let mut validation = self.validation.clone();
        validation.algorithms = vec![header.alg];
        let data = decode::<Claims>(token, key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }
}

fn is_hmac(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

#[async_trait]
impl AuthenticationProvider for JwtAuthentication {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let token = extract_authorization_token(headers, &self.header_name, &self.scheme)?;
        let claims = self.verify(token).await?;

        if let Some(required) = &self.required_role {
            if claims.role.as_deref() != Some(required.as_str()) {
                return Err(AuthError::RoleMismatch);
            }
        }

        let id = Uuid::parse_str(claims.sub.trim()).map_err(|_| AuthError::InvalidSubject)?;
        Ok(AuthenticatedUser { id, claims })
    }
}
