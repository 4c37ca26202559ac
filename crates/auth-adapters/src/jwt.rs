//! HS256 bearer tokens carrying a `userId` claim.
//!
//! Verification is what the API needs; `sign` exists for the seeder and for
//! tests that need a valid token.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use domains::{AuthProvider, DomainError, DomainResult, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    /// Seconds since the epoch
    pub exp: i64,
}

pub struct JwtAuthProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtAuthProvider {
    pub fn new(secret: &SecretString, ttl_secs: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn sign(&self, user_id: UserId) -> DomainResult<String> {
        let claims = Claims {
            user_id,
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::Internal(format!("failed to sign token: {e}")))
    }
}

impl AuthProvider for JwtAuthProvider {
    fn authenticate(&self, token: &str) -> DomainResult<UserId> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.user_id)
            .map_err(|e| {
                debug!(error = %e, "rejected bearer token");
                DomainError::Unauthorized("Invalid or expired token".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::ErrorKind;

    fn provider(secret: &str, ttl_secs: i64) -> JwtAuthProvider {
        JwtAuthProvider::new(&SecretString::from(secret.to_string()), ttl_secs)
    }

    #[test]
    fn signed_token_authenticates_its_user() {
        let auth = provider("test-secret", 3600);
        let user = UserId::new();
        let token = auth.sign(user).unwrap();
        assert_eq!(auth.authenticate(&token).unwrap(), user);
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let user = UserId::new();
        let foreign = provider("other-secret", 3600).sign(user).unwrap();
        let auth = provider("test-secret", 3600);
        assert_eq!(
            auth.authenticate(&foreign).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );

        // well past the default 60s leeway
        let expired = provider("test-secret", -600).sign(user).unwrap();
        assert!(auth.authenticate(&expired).is_err());
        assert!(auth.authenticate("not-a-jwt").is_err());
    }

    #[test]
    fn token_carries_only_user_and_expiry() {
        let auth = provider("test-secret", 3600);
        let user = UserId::new();
        let token = auth.sign(user).unwrap();

        let payload = decode::<serde_json::Value>(&token, &auth.decoding, &auth.validation)
            .unwrap()
            .claims;
        let mut keys: Vec<&str> = payload
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, ["exp", "userId"]);
        assert_eq!(payload["userId"], user.to_string());
    }

    #[test]
    fn extra_claims_from_other_issuers_are_ignored() {
        let auth = provider("test-secret", 3600);
        let user = UserId::new();
        let claims = serde_json::json!({
            "userId": user,
            "email": "a@example.com",
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        });
        let token = encode(&Header::new(Algorithm::HS256), &claims, &auth.encoding).unwrap();
        assert_eq!(auth.authenticate(&token).unwrap(), user);
    }
}
