//! Credential storage and verification.
//!
//! Passwords are hashed with argon2id. Login failures are uniform: a
//! missing account and a wrong password both surface as invalid
//! credentials, so usernames cannot be enumerated. Deactivated accounts
//! are reported distinctly once the password has been verified.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::authz::{Actor, Role};
use crate::error::ForgeError;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, ForgeError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ForgeError::internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ForgeError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ForgeError::internal(format!("stored password hash is malformed: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Stored account state feeding the refresh gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRecord {
    pub role: Role,
    pub active: bool,
}

/// Decide the refresh outcome from fetched account state. A deleted
/// subject is NotFound, a deactivated one InactiveAccount; an active
/// account yields the actor with its current stored role, not whatever
/// the old token claimed.
pub fn refresh_gate(id: Uuid, record: Option<AccountRecord>) -> Result<Actor, ForgeError> {
    let Some(record) = record else {
        return Err(ForgeError::not_found("user", id));
    };
    if !record.active {
        return Err(ForgeError::inactive_account());
    }
    Ok(Actor::new(id, record.role))
}

/// Live credential lookups backing login and refresh.
#[derive(Clone)]
pub struct CredentialStore {
    pool: PgPool,
}

impl CredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_role(role: &str) -> Result<Role, ForgeError> {
        Role::parse(role)
            .ok_or_else(|| ForgeError::internal(format!("unknown role in storage: {role}")))
    }

    /// Verify a username/password pair and return the actor to issue
    /// tokens for.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Actor, ForgeError> {
        let row =
            sqlx::query("SELECT id, password_hash, role, active FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Err(ForgeError::invalid_credentials());
        };
        let stored_hash: String = row.try_get("password_hash")?;
        if !verify_password(password, &stored_hash)? {
            return Err(ForgeError::invalid_credentials());
        }
        if !row.try_get::<bool, _>("active")? {
            return Err(ForgeError::inactive_account());
        }
        let role: String = row.try_get("role")?;
        Ok(Actor::new(row.try_get("id")?, Self::row_role(&role)?))
    }

    /// Fetch the live account state for a refresh and run it through
    /// [`refresh_gate`].
    pub async fn fetch_for_refresh(&self, id: Uuid) -> Result<Actor, ForgeError> {
        let record = match sqlx::query("SELECT role, active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        {
            Some(row) => {
                let role: String = row.try_get("role")?;
                Some(AccountRecord {
                    role: Self::row_role(&role)?,
                    active: row.try_get("active")?,
                })
            }
            None => None,
        };
        refresh_gate(id, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("incorrect horse", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_stored_hash_is_internal_error() {
        let err = verify_password("anything", "not-a-phc-string").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Internal);
    }

    #[test]
    fn test_refresh_gate_deleted_subject_is_not_found() {
        let err = refresh_gate(Uuid::new_v4(), None).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NotFound);
    }

    #[test]
    fn test_refresh_gate_deactivated_subject_is_inactive() {
        let record = AccountRecord { role: Role::Manager, active: false };
        let err = refresh_gate(Uuid::new_v4(), Some(record)).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InactiveAccount);
    }

    #[test]
    fn test_refresh_gate_uses_current_stored_role() {
        let id = Uuid::new_v4();
        // Role was demoted since the refresh token was issued; the gate
        // hands back the stored role.
        let record = AccountRecord { role: Role::User, active: true };
        let actor = refresh_gate(id, Some(record)).unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, Role::User);
    }
}
