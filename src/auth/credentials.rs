use actix_web::web;

use super::extractors::AuthenticatedUser;
use super::password::{hash_password, verify_password};
use super::token::TokenService;
use crate::config::Config;
use crate::error::AppError;

/// Password hashing plus session issuance, configured once at startup.
///
/// bcrypt is deliberately slow, so the async entry points run it on actix's
/// blocking pool instead of a worker thread.
#[derive(Clone)]
pub struct CredentialService {
    tokens: TokenService,
    bcrypt_cost: u32,
    token_ttl: chrono::Duration,
}

impl CredentialService {
    pub fn new(secret: &str, bcrypt_cost: u32, token_ttl: chrono::Duration) -> Self {
        Self {
            tokens: TokenService::new(secret),
            bcrypt_cost,
            token_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.bcrypt_cost, config.token_ttl())
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        self.token_ttl
    }

    pub async fn hash_password(&self, plaintext: String) -> Result<String, AppError> {
        let cost = self.bcrypt_cost;
        web::block(move || hash_password(&plaintext, cost)).await?
    }

    pub async fn verify_password(&self, plaintext: String, hash: String) -> Result<bool, AppError> {
        web::block(move || verify_password(&plaintext, &hash)).await?
    }

    /// Issues a session token using the configured TTL.
    pub fn issue_token(&self, user_id: i64, name: &str) -> Result<String, AppError> {
        self.tokens.issue(user_id, name, self.token_ttl)
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = self.tokens.verify(token)?;
        Ok(AuthenticatedUser {
            user_id: claims.user_id,
            name: claims.name,
        })
    }
}
