use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::claims::{Claims, TokenPurpose},
    config::JwtConfig,
    state::AppState,
    users::repo_types::Role,
};

/// Lifetime of a password-reset grant, both inside the token and in the `users` row.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 30;

/// Malformed, badly signed, expired or wrong-purpose token. Callers never learn which.
#[derive(Debug, Error)]
#[error("invalid or expired token")]
pub struct InvalidToken;

/// Signing and verification keys with the issuer settings they are checked against.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    session_ttl: TimeDuration,
    reset_ttl: TimeDuration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            session_ttl: TimeDuration::minutes(cfg.ttl_minutes),
            reset_ttl: TimeDuration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }

    pub fn session_ttl(&self) -> TimeDuration {
        self.session_ttl
    }

    pub fn reset_ttl(&self) -> TimeDuration {
        self.reset_ttl
    }

    fn sign_with(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        role: Option<Role>,
        ttl: TimeDuration,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            purpose,
            role,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, purpose = ?purpose, "jwt signed");
        Ok(token)
    }

    pub fn sign_session(&self, user_id: Uuid, role: Role) -> anyhow::Result<String> {
        self.sign_with(user_id, TokenPurpose::Session, Some(role), self.session_ttl)
    }

    pub fn sign_password_reset(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with(user_id, TokenPurpose::ResetPassword, None, self.reset_ttl)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, InvalidToken> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            InvalidToken
        })?;
        debug!(user_id = %data.claims.sub, purpose = ?data.claims.purpose, "jwt verified");
        Ok(data.claims)
    }

    fn verify_purpose(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, InvalidToken> {
        let claims = self.verify(token)?;
        if claims.purpose != purpose {
            debug!(expected = ?purpose, got = ?claims.purpose, "jwt purpose mismatch");
            return Err(InvalidToken);
        }
        Ok(claims)
    }

    pub fn verify_session(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.verify_purpose(token, TokenPurpose::Session)
    }

    pub fn verify_password_reset(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.verify_purpose(token, TokenPurpose::ResetPassword)
    }
}
