//! Auth collaborator seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::AppResult;
use crate::types::id::UserId;

/// Identity extracted from a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Authenticated user.
    pub user_id: UserId,
    /// Display name carried by the credential.
    pub display_name: String,
    /// When the credential stops being valid, if it expires.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Full credential verification (signature, expiry, revocation).
///
/// Failures must be reported as `ErrorKind::Authentication`.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Verifies a bearer credential and returns the identity it carries.
    async fn verify(&self, credential: &str) -> AppResult<VerifiedIdentity>;
}
