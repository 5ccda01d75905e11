//! Access token generation and validation.
//!
//! Access tokens are HS256 JWTs carrying the subject, issue time and expiry.
//! They are never stored; validity is decided entirely by the signature and
//! the `exp` claim compared against the caller-supplied clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default access token lifetime: 15 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Claims encoded inside an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (username)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Result of generating an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Signs and verifies access tokens. Holds no mutable state.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and access token lifetime.
    pub fn new(secret: &[u8], access_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    /// Issue an access token for `identity`, valid from `now` for the configured TTL.
    pub fn issue(&self, identity: &str, now: u64) -> Result<AccessTokenResult, TokenError> {
        let duration = self.access_ttl.as_secs();
        let claims = AccessClaims {
            sub: identity.to_string(),
            iat: now,
            exp: now.saturating_add(duration),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(AccessTokenResult { token, duration })
    }

    /// Verify an access token against `now`.
    ///
    /// The MAC over the raw `header.payload` text is checked before either
    /// segment is parsed, so any change to the header, the payload or the
    /// signature surfaces as `InvalidSignature`.
    pub fn verify(&self, token: &str, now: u64) -> Result<AccessClaims, TokenError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let mac_matches = jsonwebtoken::crypto::verify(
            signature,
            signing_input.as_bytes(),
            &self.decoding_key,
            Algorithm::HS256,
        )
        .unwrap_or(false);
        if !mac_matches {
            return Err(TokenError::InvalidSignature);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked below against the supplied clock, not wall time.
        validation.validate_exp = false;

        let token_data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::from_kind(e.kind()))?;

        let claims = token_data.claims;
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }
}

/// Reasons an access token can be rejected or fail to be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

impl TokenError {
    fn from_kind(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const NOW: u64 = 1_705_321_845;

    fn config() -> JwtConfig {
        JwtConfig::new(b"test-secret-key-for-testing", DEFAULT_ACCESS_TOKEN_TTL)
    }

    /// Flip one bit of the decoded segment `index` and re-encode the token.
    fn flip_bit(token: &str, index: usize, bit: usize) -> String {
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut bytes = URL_SAFE_NO_PAD.decode(&parts[index]).unwrap();
        bytes[bit / 8] ^= 1 << (bit % 8);
        parts[index] = URL_SAFE_NO_PAD.encode(bytes);
        parts.join(".")
    }

    fn segment_bits(token: &str, index: usize) -> usize {
        let segment = token.split('.').nth(index).unwrap();
        URL_SAFE_NO_PAD.decode(segment).unwrap().len() * 8
    }

    #[test]
    fn test_issue_and_verify() {
        let config = config();
        let result = config.issue("alice", NOW).unwrap();

        assert_eq!(result.duration, DEFAULT_ACCESS_TOKEN_TTL.as_secs());

        let claims = config.verify(&result.token, NOW).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + result.duration);
    }

    #[test]
    fn test_valid_until_expiry() {
        let config = config();
        let result = config.issue("alice", NOW).unwrap();
        let exp = NOW + result.duration;

        assert!(config.verify(&result.token, NOW + 1).is_ok());
        assert!(config.verify(&result.token, exp - 1).is_ok());
        assert_eq!(config.verify(&result.token, exp), Err(TokenError::Expired));
        assert_eq!(
            config.verify(&result.token, exp + 3600),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_payload_bit_flip_is_invalid_signature() {
        let config = config();
        let token = config.issue("alice", NOW).unwrap().token;

        for bit in 0..segment_bits(&token, 1) {
            let tampered = flip_bit(&token, 1, bit);
            assert_eq!(
                config.verify(&tampered, NOW),
                Err(TokenError::InvalidSignature),
                "payload bit {} flip was accepted",
                bit
            );
        }
    }

    #[test]
    fn test_signature_bit_flip_is_invalid_signature() {
        let config = config();
        let token = config.issue("alice", NOW).unwrap().token;

        for bit in 0..segment_bits(&token, 2) {
            let tampered = flip_bit(&token, 2, bit);
            assert_eq!(
                config.verify(&tampered, NOW),
                Err(TokenError::InvalidSignature),
                "signature bit {} flip was accepted",
                bit
            );
        }
    }

    #[test]
    fn test_raw_text_bit_flip_is_invalid_signature() {
        let config = config();
        let token = config.issue("alice", NOW).unwrap().token;

        for (pos, byte) in token.bytes().enumerate() {
            if byte == b'.' {
                continue;
            }
            // The high bit would make the text invalid UTF-8.
            for bit in 0..7 {
                let mut bytes = token.clone().into_bytes();
                bytes[pos] ^= 1 << bit;
                let tampered = String::from_utf8(bytes).unwrap();
                assert_eq!(
                    config.verify(&tampered, NOW),
                    Err(TokenError::InvalidSignature),
                    "flip of bit {} at offset {} was not rejected as a bad signature",
                    bit,
                    pos
                );
            }
        }
    }

    #[test]
    fn test_header_bit_flip_is_invalid_signature() {
        let config = config();
        let token = config.issue("alice", NOW).unwrap().token;

        for bit in 0..segment_bits(&token, 0) {
            let tampered = flip_bit(&token, 0, bit);
            assert_eq!(
                config.verify(&tampered, NOW),
                Err(TokenError::InvalidSignature),
                "header bit {} flip was accepted",
                bit
            );
        }
    }

    #[test]
    fn test_garbage_is_rejected() {
        let config = config();
        assert_eq!(config.verify("invalid-token", NOW), Err(TokenError::Malformed));
        assert_eq!(config.verify("", NOW), Err(TokenError::Malformed));
        assert_eq!(
            config.verify("a.b.c", NOW),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"secret-1", DEFAULT_ACCESS_TOKEN_TTL);
        let config2 = JwtConfig::new(b"secret-2", DEFAULT_ACCESS_TOKEN_TTL);

        let result = config1.issue("alice", NOW).unwrap();

        assert_eq!(
            config2.verify(&result.token, NOW),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let secret = b"test-secret-key-for-testing";
        let claims = AccessClaims {
            sub: "alice".to_string(),
            iat: NOW,
            exp: NOW + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(config().verify(&token, NOW).is_err());
    }

    #[test]
    fn test_same_inputs_same_signed_fields() {
        let config = config();
        let a = config.verify(&config.issue("alice", NOW).unwrap().token, NOW).unwrap();
        let b = config.verify(&config.issue("alice", NOW).unwrap().token, NOW).unwrap();
        assert_eq!(a, b);
    }
}
