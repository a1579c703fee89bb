//! Session lifecycle: password verification and the two-kind token
//! scheme (short-lived access, longer-lived refresh).

pub mod credentials;
pub mod token;

pub use credentials::{hash_password, refresh_gate, verify_password, AccountRecord, CredentialStore};
pub use token::{Claims, TokenKind, TokenPair, TokenService};
