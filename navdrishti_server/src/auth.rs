//! Identity token handling.
//!
//! Authentication lives outside this system: the identity service mints HS256 JWTs with a secret shared
//! with this server. All we do here is validate the signature and lift `{sub, roles}` out of the token.
//! There is no login, nonce or refresh flow in this repo.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use navdrishti_engine::{
    api::guards::Actor,
    db_types::Roles,
};
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::{AuthError, ServerError}};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The authenticated user id.
    pub sub: String,
    #[serde(default)]
    pub roles: Roles,
    pub exp: i64,
}

impl JwtClaims {
    pub fn actor(&self) -> Actor {
        Actor::new(self.sub.clone(), self.roles.clone())
    }
}

/// Extract the claims that the JWT middleware placed in the request extensions. Handlers take `JwtClaims`
/// as a parameter and never look at the raw token.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        ready(claims.ok_or(ServerError::CouldNotDeserializeAuthToken))
    }
}

pub fn decode_access_token(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<JwtClaims>(token, &key, &Validation::new(Algorithm::HS256))
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;
    Ok(data.claims)
}

/// Issues access tokens with the shared secret. In production the identity service does this; the issuer
/// here serves local tooling and the endpoint tests.
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let key = EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { key }
    }

    pub fn issue_token(&self, user_id: &str, roles: Roles, expires_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = JwtClaims { sub: user_id.to_string(), roles, exp: expires_at.timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}
