//! Claim extraction from the Cognito ID token on embed requests.
//!
//! The token's signature and expiry are checked by the API gateway in front
//! of the proxy; only the claims are read here.

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbedClaims {
    #[serde(rename = "cognito:username")]
    pub username: String,
    pub email: String,
}

fn claims_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Decode the claims of `Bearer <jwt>` (the prefix is optional).
pub fn claims_from_bearer(header: &str) -> Result<EmbedClaims> {
    let token = header.trim();
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
    if token.is_empty() {
        return Err(anyhow!("authorization token is empty"));
    }

    let data = decode::<EmbedClaims>(token, &DecodingKey::from_secret(&[]), &claims_validation())
        .context("authorization token lacks cognito:username or email")?;
    Ok(data.claims)
}

#[cfg(test)]
pub(crate) fn encode_for_test(payload: &serde_json::Value) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    encode(
        &Header::new(Algorithm::HS256),
        payload,
        &EncodingKey::from_secret(b"test-signing-key"),
    )
    .expect("test token encodes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_claims() {
        let token = encode_for_test(&json!({
            "cognito:username": "jdoe",
            "email": "jdoe@example.com",
            "aud": "portal-client",
            "exp": 1700000000
        }));
        let claims = claims_from_bearer(&format!("Bearer {}", token)).unwrap();
        assert_eq!(claims.username, "jdoe");
        assert_eq!(claims.email, "jdoe@example.com");
        assert_eq!(claims_from_bearer(&token).unwrap(), claims);
    }

    #[test]
    fn test_signature_is_not_checked() {
        let token = encode_for_test(&json!({
            "cognito:username": "a",
            "email": "a@b.c"
        }));
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        let token = format!("{}.c2lnbmF0dXJl", unsigned);
        assert_eq!(claims_from_bearer(&token).unwrap().email, "a@b.c");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(claims_from_bearer("Bearer ").is_err());
        assert!(claims_from_bearer("Bearer not-a-token").is_err());
        assert!(claims_from_bearer("a.!!!.b").is_err());
        let token = encode_for_test(&json!({ "email": "x@y.z" }));
        assert!(claims_from_bearer(&token).is_err());
    }
}
