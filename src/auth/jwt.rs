//! Password hashing and access-token management.
//!
//! Passwords are hashed with Argon2id; access tokens are HMAC-signed
//! JWTs (HS256 by default) whose subject is the user id. Token issuance lives here so handlers and the
//! bearer middleware share one verification path.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::errors::{ApiError, ApiResult, ErrorCode};
use crate::types::Claims;

pub struct AuthService {
    secret_key: String,
    algorithm: Algorithm,
    access_expiry_minutes: i64,
}

impl AuthService {
    /// # Arguments
    /// * `secret_key` - signing secret (should be at least 32 chars)
    /// * `algorithm` - JWT algorithm name; unknown names fall back to HS256
    /// * `access_expiry_minutes` - Access token validity in minutes
    pub fn new(secret_key: String, algorithm: &str, access_expiry_minutes: i64) -> Self {
        let algorithm = algorithm.parse().unwrap_or_else(|_| {
            tracing::warn!(algorithm, "unknown JWT algorithm, using HS256");
            Algorithm::HS256
        });

        Self {
            secret_key,
            algorithm,
            access_expiry_minutes,
        }
    }

    /// Hashes a password using Argon2id. Returns a PHC-formatted string.
    pub fn hash_password(&self, password: &str) -> ApiResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
    }

    /// Verifies a password against an Argon2 hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> ApiResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| ApiError::internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Issues an access token for a user id.
    pub fn generate_access_token(&self, user_id: i64) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::minutes(self.access_expiry_minutes)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret_key.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a token, distinguishing expiry from every other defect.
    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::new(self.algorithm);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret_key.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::new(ErrorCode::AuthTokenExpired)
            }
            _ => ApiError::new(ErrorCode::AuthInvalidToken),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> AuthService {
        AuthService::new(
            "test-secret-key-that-is-at-least-32-chars".to_string(),
            "HS256",
            30,
        )
    }

    #[test]
    fn test_password_hashing() {
        let service = create_test_service();
        let password = "test_password_123";

        let hash = service
            .hash_password(password)
            .expect("should hash password");

        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2"), "hash should be in PHC format");
    }

    #[test]
    fn test_password_verification() {
        let service = create_test_service();
        let password = "secure_password_456";

        let hash = service
            .hash_password(password)
            .expect("should hash password");

        assert!(service.verify_password(password, &hash).unwrap());
        assert!(!service.verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_token_round_trip() {
        let service = create_test_service();

        let token = service.generate_access_token(42).expect("should generate");
        let claims = service.verify_token(&token).expect("should verify");

        assert_eq!(claims.sub, "42");

        let now = Utc::now().timestamp() as usize;
        assert!(claims.iat <= now && claims.iat >= now - 5);
        assert!(claims.exp >= claims.iat + 30 * 60 - 5);
    }

    #[test]
    fn test_token_wrong_secret_rejected() {
        let service1 = AuthService::new("secret-one-that-is-32-chars-long".to_string(), "HS256", 30);
        let service2 = AuthService::new("secret-two-that-is-32-chars-long".to_string(), "HS256", 30);

        let token = service1.generate_access_token(1).expect("should generate");
        let err = service2.verify_token(&token).unwrap_err();

        assert_eq!(err.code(), ErrorCode::AuthInvalidToken);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = create_test_service();
        let err = service.verify_token("not.a.token").unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthInvalidToken);
    }
}
