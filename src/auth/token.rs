use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const EMAIL_CONFIRMATION: &str = "EmailConfirmation";
pub const RESET_PASSWORD: &str = "ResetPassword";
pub const SESSION: &str = "Session";
pub const EXTERNAL_IDENTITY: &str = "ExternalIdentity";
pub const EXTERNAL_CHALLENGE: &str = "ExternalChallenge";

/// Claims wrapper written into every token.
///
/// `purpose` keeps a token issued for one job (say, a password reset) from
/// being replayed for another (say, a session cookie).
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<C> {
    purpose: String,
    /// Expiration timestamp (seconds since epoch).
    exp: usize,
    #[serde(flatten)]
    claims: C,
}

/// Signs and verifies the HMAC tokens used for sessions, links and challenges.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs `claims` for `purpose`, valid for `lifetime` from now.
    pub fn issue<C: Serialize>(
        &self,
        purpose: &str,
        claims: C,
        lifetime: chrono::Duration,
    ) -> Result<String, AppError> {
        let exp = chrono::Utc::now()
            .checked_add_signed(lifetime)
            .ok_or_else(|| AppError::InternalServerError("Token lifetime out of range".into()))?
            .timestamp() as usize;

        let envelope = Envelope {
            purpose: purpose.to_string(),
            exp,
            claims,
        };
        Ok(encode(&Header::default(), &envelope, &self.encoding)?)
    }

    /// Verifies signature, expiry and purpose, and returns the inner claims.
    ///
    /// Returns `AppError::Unauthorized` for a malformed, forged, expired or
    /// wrong-purpose token.
    pub fn verify<C: DeserializeOwned>(&self, purpose: &str, token: &str) -> Result<C, AppError> {
        let envelope = decode::<Envelope<C>>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        if envelope.purpose != purpose {
            return Err(AppError::Unauthorized(format!(
                "Invalid token: issued for {}",
                envelope.purpose
            )));
        }
        Ok(envelope.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        sub: String,
    }

    fn sample() -> Sample {
        Sample { sub: "42".into() }
    }

    #[test]
    fn test_token_generation_and_verification() {
        let tokens = TokenService::new("test_secret_for_gen_verify");
        let token = tokens
            .issue(SESSION, sample(), chrono::Duration::hours(1))
            .unwrap();
        let claims: Sample = tokens.verify(SESSION, &token).unwrap();
        assert_eq!(claims, sample());
    }

    #[test]
    fn test_token_expiration() {
        let tokens = TokenService::new("test_secret_for_expiration");
        let expired = tokens
            .issue(SESSION, sample(), chrono::Duration::hours(-2))
            .unwrap();

        match tokens.verify::<Sample>(SESSION, &expired) {
            Err(AppError::Unauthorized(msg)) => {
                assert!(msg.contains("Invalid token: ExpiredSignature"));
            }
            Ok(_) => panic!("Token should have been invalid due to expiration"),
            Err(e) => panic!("Unexpected error type for expired token: {:?}", e),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let issuer = TokenService::new("one_secret");
        let verifier = TokenService::new("a_completely_different_secret");
        let token = issuer
            .issue(SESSION, sample(), chrono::Duration::hours(1))
            .unwrap();

        match verifier.verify::<Sample>(SESSION, &token) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("InvalidSignature")),
            other => panic!("Token should have been rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_purpose_is_rejected() {
        let tokens = TokenService::new("purpose_secret");
        let token = tokens
            .issue(RESET_PASSWORD, sample(), chrono::Duration::hours(1))
            .unwrap();
        assert!(tokens.verify::<Sample>(EMAIL_CONFIRMATION, &token).is_err());
        assert!(tokens.verify::<Sample>(RESET_PASSWORD, &token).is_ok());
    }
}
