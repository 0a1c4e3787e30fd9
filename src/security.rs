use anyhow::Context;
use bcrypt::DEFAULT_COST;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How long an issued bearer token stays valid, in hours
const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// The authenticated user's id
    sub: i32,
    /// Expiration timestamp, seconds since the epoch
    exp: i64,
}

/// Signs and verifies the bearer tokens which identify users on authenticated
/// routes. Constructed once at startup from the configured secret and shared
/// across requests.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token was malformed, expired, or signed with the wrong key")]
    Rejected(#[source] jsonwebtoken::errors::Error),
}

impl TokenAuthority {
    pub fn new(secret: &str) -> TokenAuthority {
        TokenAuthority {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a signed token identifying [user_id], expiring after [TOKEN_LIFETIME_HOURS]
    pub fn create_token(&self, user_id: i32) -> Result<String, anyhow::Error> {
        self.signed_token(user_id, Duration::hours(TOKEN_LIFETIME_HOURS))
    }

    fn signed_token(&self, user_id: i32, lifetime: Duration) -> Result<String, anyhow::Error> {
        let expiration = Utc::now()
            .checked_add_signed(lifetime)
            .context("token expiration timestamp overflowed")?
            .timestamp();
        let claims = Claims {
            sub: user_id,
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding_key).context("signing bearer token")
    }

    /// Extracts the user id from a presented token, rejecting it when the signature
    /// doesn't match or the expiration has passed. The error carries no detail the
    /// client could use to distinguish the cases.
    pub fn verify_token(&self, token: &str) -> Result<i32, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(TokenError::Rejected)
    }
}

/// Hashes a registration password for storage
pub fn hash_password(password: &str) -> Result<String, anyhow::Error> {
    bcrypt::hash(password, DEFAULT_COST).context("hashing password")
}

/// Checks a login password against the stored hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, anyhow::Error> {
    bcrypt::verify(password, password_hash).context("verifying password against stored hash")
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    mod token_authority {
        use super::*;

        #[test]
        fn issued_tokens_verify() {
            let authority = TokenAuthority::new("unit-test-secret");

            let token = authority.create_token(42).expect("token issue failed");
            let verified_id = authority.verify_token(&token);
            assert_that!(verified_id).is_ok_containing(42);
        }

        #[test]
        fn expired_tokens_are_rejected() {
            let authority = TokenAuthority::new("unit-test-secret");

            // Far enough in the past to clear jsonwebtoken's default leeway
            let token = authority
                .signed_token(42, Duration::hours(-1))
                .expect("token issue failed");
            assert_that!(authority.verify_token(&token)).is_err();
        }

        #[test]
        fn tokens_signed_with_another_key_are_rejected() {
            let issuing_authority = TokenAuthority::new("one-secret");
            let verifying_authority = TokenAuthority::new("a-different-secret");

            let token = issuing_authority
                .create_token(42)
                .expect("token issue failed");
            assert_that!(verifying_authority.verify_token(&token)).is_err();
        }

        #[test]
        fn garbage_tokens_are_rejected() {
            let authority = TokenAuthority::new("unit-test-secret");

            assert_that!(authority.verify_token("not-even-a-jwt")).is_err();
        }
    }

    mod passwords {
        use super::*;

        #[test]
        fn hash_verifies_original_password_only() {
            let hash = hash_password("hunter2!").expect("hashing failed");

            assert_that!(verify_password("hunter2!", &hash)).is_ok_containing(true);
            assert_that!(verify_password("hunter3!", &hash)).is_ok_containing(false);
        }
    }
}
