use std::time::Duration;

use anyhow::Context;
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Option<Duration>,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            ttl_minutes,
        } = &state.config.jwt;
        Self::new(
            secret,
            ttl_minutes
                .and_then(|m| u64::try_from(m).ok())
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs),
        )
    }
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Option<Duration>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = self
            .ttl
            .map(|ttl| {
                TimeDuration::try_from(ttl)
                    .ok()
                    .and_then(|ttl| now.checked_add(ttl))
                    .map(|exp| exp.unix_timestamp() as usize)
                    .context("token lifetime out of range")
            })
            .transpose()?;
        let claims = Claims {
            user: user_id,
            iat: now.unix_timestamp() as usize,
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, expires = exp.is_some(), "jwt signed");
        Ok(token)
    }

    /// Checks signature and, when the token carries one, expiry.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.user, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::new(secret, None)
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.user, user_id);
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn configured_ttl_sets_expiry() {
        let keys = JwtKeys::new("dev-secret", Some(Duration::from_secs(600)));
        let token = keys.sign(Uuid::new_v4()).unwrap();
        let claims = keys.verify(&token).unwrap();
        let exp = claims.exp.expect("exp claim present");
        assert!(exp >= claims.iat + 600);
    }

    #[test]
    fn out_of_range_ttl_is_an_error_not_a_panic() {
        let keys = JwtKeys::new("dev-secret", Some(Duration::from_secs(u64::MAX)));
        assert!(keys.sign(Uuid::new_v4()).is_err());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let token = keys("secret-a").sign(Uuid::new_v4()).unwrap();
        assert!(keys("secret-b").verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            user: Uuid::new_v4(),
            iat: now - 7200,
            exp: Some(now - 3600),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_and_garbage_tokens() {
        let keys = keys("dev-secret");
        let token = keys.sign(Uuid::new_v4()).unwrap();
        let other = keys.sign(Uuid::new_v4()).unwrap();
        // payload of one token with the signature of another
        let (signed_part, _) = other.rsplit_once('.').unwrap();
        let (_, signature) = token.rsplit_once('.').unwrap();
        let tampered = format!("{signed_part}.{signature}");
        assert!(keys.verify(&tampered).is_err());
        assert!(keys.verify("not.a.jwt").is_err());
        assert!(keys.verify("").is_err());
    }
}
