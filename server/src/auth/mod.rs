//! Authentication Service
//!
//! Personal password records and the fallback ladder used to decide
//! connection attempts against the voice server.

mod password;
mod service;
mod store;

pub use password::{hash_password, verify_password};
pub use service::{AuthOutcome, AuthService, AuthType};
pub use store::{AuthRecord, AuthStatus, AuthStore, PgAuthStore};
