//! Token service.
//!
//! Two token kinds share one claims shape but are signed with distinct
//! secrets, so a refresh token can never pass access verification even if
//! a caller lies about the `kind` claim. Access verification is pure
//! claim-checking; refresh verification is paired with a live credential
//! lookup at the call site.
//!
//! There is no revocation store. A token that leaves the building is valid
//! until expiry; the mitigation is the configurable access-token lifetime.

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::{Actor, Role};
use crate::config::AuthConfig;
use crate::error::ForgeError;

/// Which lifecycle a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signed claims. `role` is captured at issuance; role changes apply on
/// the next login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
}

impl Claims {
    pub fn actor(&self) -> Actor {
        Actor::new(self.sub, self.role)
    }
}

/// The pair handed back by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Issues and verifies both token kinds. Clone-cheap; keys are derived
/// once at construction.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    leeway_secs: u64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl_secs: config.access_ttl.as_secs() as i64,
            refresh_ttl_secs: config.refresh_ttl.as_secs() as i64,
            leeway_secs: config.leeway_secs,
        }
    }

    fn issue(&self, actor: &Actor, kind: TokenKind) -> Result<String, ForgeError> {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: actor.id,
            role: actor.role,
            iat: now,
            exp: now + ttl,
            kind,
        };
        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };
        encode(&Header::default(), &claims, key)
            .map_err(|e| ForgeError::internal(format!("token signing failed: {e}")))
    }

    /// Issue a fresh access/refresh pair for an actor.
    pub fn issue_pair(&self, actor: &Actor) -> Result<TokenPair, ForgeError> {
        Ok(TokenPair {
            access_token: self.issue(actor, TokenKind::Access)?,
            refresh_token: self.issue(actor, TokenKind::Refresh)?,
            expires_in: self.access_ttl_secs,
        })
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, ForgeError> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let mut validation = Validation::default();
        validation.leeway = self.leeway_secs;

        let data = decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ForgeError::token_expired(),
            _ => ForgeError::unauthenticated("invalid token"),
        })?;

        // Signature already binds the kind to the right secret; the claim
        // check catches same-secret misconfiguration in tests.
        if data.claims.kind != kind {
            return Err(ForgeError::wrong_token_kind());
        }
        Ok(data.claims)
    }

    /// Verify an access token. Pure: no storage lookup, so a deactivated
    /// account keeps its access until the token expires.
    pub fn verify_access(&self, token: &str) -> Result<Claims, ForgeError> {
        self.verify(token, TokenKind::Access)
    }

    /// Verify a refresh token's claims. Callers must follow up with a live
    /// credential lookup before issuing a new pair.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, ForgeError> {
        self.verify(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::time::Duration;

    fn config(access_ttl: Duration) -> AuthConfig {
        AuthConfig {
            access_secret: "access-secret-for-tests".into(),
            refresh_secret: "refresh-secret-for-tests".into(),
            access_ttl,
            refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            leeway_secs: 0,
        }
    }

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Manager)
    }

    #[test]
    fn test_round_trip_preserves_identity() {
        let svc = TokenService::new(&config(Duration::from_secs(3600)));
        let actor = actor();
        let pair = svc.issue_pair(&actor).unwrap();

        let claims = svc.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, actor.id);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.actor(), actor);

        let refresh = svc.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, actor.id);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let svc = TokenService::new(&config(Duration::from_secs(3600)));
        let pair = svc.issue_pair(&actor()).unwrap();

        // A refresh token fails access verification and vice versa. The
        // failure is a signature mismatch, not just a claim mismatch.
        let err = svc.verify_access(&pair.refresh_token).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
        let err = svc.verify_refresh(&pair.access_token).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
    }

    #[test]
    fn test_kind_claim_checked_when_secrets_collide() {
        // If both kinds were signed with one secret, the kind claim is the
        // remaining line of defense.
        let cfg = config(Duration::from_secs(3600));
        let same = AuthConfig {
            refresh_secret: cfg.access_secret.clone(),
            ..cfg
        };
        let svc = TokenService::new(&same);
        let pair = svc.issue_pair(&actor()).unwrap();
        let err = svc.verify_access(&pair.refresh_token).unwrap_err();
        assert_eq!(err.code(), ErrorCode::WrongTokenKind);
    }

    #[test]
    fn test_expired_access_token() {
        let svc = TokenService::new(&config(Duration::from_secs(0)));
        let pair = svc.issue_pair(&actor()).unwrap();
        // exp == iat, leeway 0.
        std::thread::sleep(Duration::from_millis(1100));
        let err = svc.verify_access(&pair.access_token).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenExpired);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let svc = TokenService::new(&config(Duration::from_secs(3600)));
        let err = svc.verify_access("not-a-jwt").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let svc = TokenService::new(&config(Duration::from_secs(3600)));
        let mut other_cfg = config(Duration::from_secs(3600));
        other_cfg.access_secret = "a-completely-different-secret".into();
        let other = TokenService::new(&other_cfg);

        let pair = other.issue_pair(&actor()).unwrap();
        let err = svc.verify_access(&pair.access_token).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
    }
}
