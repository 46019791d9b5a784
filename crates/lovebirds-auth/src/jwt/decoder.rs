//! JWT token validation.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use lovebirds_core::config::AuthConfig;
use lovebirds_core::error::AppError;
use lovebirds_core::result::AppResult;
use lovebirds_core::traits::{CredentialVerifier, VerifiedIdentity};

use super::claims::Claims;

/// Validates chat credentials: HS256 signature and expiry.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token string.
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Authentication failed: jwt expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Authentication failed: invalid jwt signature")
                    }
                    _ => AppError::authentication(format!("Authentication failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl CredentialVerifier for JwtDecoder {
    async fn verify(&self, credential: &str) -> AppResult<VerifiedIdentity> {
        let claims = self.decode_token(credential)?;
        debug!(user_id = %claims.sub, jti = %claims.jti, "Credential verified");

        Ok(VerifiedIdentity {
            user_id: claims.sub,
            display_name: claims.name.clone(),
            expires_at: claims.expires_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use lovebirds_core::error::ErrorKind;
    use lovebirds_core::types::UserId;

    use super::*;
    use crate::jwt::encoder::JwtEncoder;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            leeway_seconds: 0,
            token_ttl_minutes: 30,
        }
    }

    #[tokio::test]
    async fn test_verify_issued_token() {
        let cfg = config("s3cret");
        let user = UserId::new();
        let token = JwtEncoder::new(&cfg).issue(user, "Mina").unwrap();

        let identity = JwtDecoder::new(&cfg).verify(&token).await.unwrap();
        assert_eq!(identity.user_id, user);
        assert_eq!(identity.display_name, "Mina");
        assert!(identity.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_wrong_secret_is_authentication_failure() {
        let token = JwtEncoder::new(&config("one"))
            .issue(UserId::new(), "Mina")
            .unwrap();

        let err = JwtDecoder::new(&config("two")).verify(&token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let cfg = config("s3cret");
        let token = JwtEncoder::new(&cfg)
            .issue_with_ttl(UserId::new(), "Mina", Duration::minutes(-5))
            .unwrap();

        let err = JwtDecoder::new(&cfg).verify(&token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(err.message.contains("jwt expired"));
    }

    #[tokio::test]
    async fn test_garbage_segments_rejected() {
        let err = JwtDecoder::new(&config("s3cret"))
            .verify("aaa.bbb.ccc")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }
}
