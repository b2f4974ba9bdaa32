//! Credential codec: issues and verifies signed session tokens.
//!
//! Tokens are HS256 JWTs. Signature comparison is delegated to
//! `jsonwebtoken`, which verifies the HMAC in constant time.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::{Claims, CredentialError, Identity};

/// Signing algorithm for all session credentials.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// A freshly issued credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Encoded token, as carried by the session transport.
    pub token: String,
    /// Signed claims.
    pub claims: Claims,
}

impl Credential {
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

/// Signs and verifies credentials with a server-held secret.
#[derive(Clone)]
pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    // Makes every verification fail with `Internal`.
    #[cfg(test)]
    fault: Option<String>,
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec").finish_non_exhaustive()
    }
}

impl CredentialCodec {
    /// Create a codec from a shared secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            #[cfg(test)]
            fault: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn failing(secret: &[u8], reason: &str) -> Self {
        Self {
            fault: Some(reason.to_string()),
            ..Self::new(secret)
        }
    }

    /// Issue a credential for `identity`, valid for `ttl` from now.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<Credential, CredentialError> {
        self.issue_at(identity, ttl, Utc::now().timestamp())
    }

    /// Issue a credential as if the current time were `now`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        now: i64,
    ) -> Result<Credential, CredentialError> {
        if ttl <= Duration::zero() {
            return Err(CredentialError::Internal(
                "credential ttl must be positive".to_string(),
            ));
        }

        let exp = now.checked_add(ttl.num_seconds()).ok_or_else(|| {
            CredentialError::Internal("credential expiry overflows".to_string())
        })?;

        let claims = Claims {
            sub: identity.id.clone(),
            role: identity.role,
            iat: now,
            exp,
            jti: nanoid::nanoid!(16),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| CredentialError::Internal(e.to_string()))?;

        Ok(Credential { token, claims })
    }

    /// Verify a token and return its identity.
    pub fn verify(&self, token: &str) -> Result<Identity, CredentialError> {
        self.verify_claims(token).map(|claims| claims.identity())
    }

    /// Verify a token and return its full claims.
    pub fn verify_claims(&self, token: &str) -> Result<Claims, CredentialError> {
        self.verify_claims_at(token, Utc::now().timestamp())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// Expiry is checked before the signature, so a token at or past its
    /// expiry is reported as `Expired` whether or not it was tampered with.
    pub fn verify_claims_at(&self, token: &str, now: i64) -> Result<Claims, CredentialError> {
        #[cfg(test)]
        if let Some(reason) = &self.fault {
            return Err(CredentialError::Internal(reason.clone()));
        }

        let unverified = self.decode(token, false)?;
        if unverified.is_expired_at(now) {
            debug!(sub = %unverified.sub, exp = unverified.exp, now, "credential expired");
            return Err(CredentialError::Expired);
        }

        let claims = self.decode(token, true)?;
        // Both passes read the same bytes; anything else is a codec bug.
        if claims != unverified {
            return Err(CredentialError::Internal(
                "claims changed between decode passes".to_string(),
            ));
        }

        Ok(claims)
    }

    fn decode(&self, token: &str, check_signature: bool) -> Result<Claims, CredentialError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        if !check_signature {
            validation.insecure_disable_signature_validation();
        }

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| classify(e.into_kind()))
    }
}

fn classify(kind: ErrorKind) -> CredentialError {
    match kind {
        ErrorKind::InvalidSignature => CredentialError::BadSignature,
        ErrorKind::ExpiredSignature => CredentialError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => CredentialError::Malformed,
        other => CredentialError::Internal(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const SECRET: &[u8] = b"test-secret-for-unit-tests-minimum-32-chars-long";

    fn codec() -> CredentialCodec {
        CredentialCodec::new(SECRET)
    }

    fn seeker() -> Identity {
        Identity::new("usr_seeker", Role::Seeker)
    }

    #[test]
    fn test_issue_then_verify_round_trip() {
        let codec = codec();
        for identity in [seeker(), Identity::new("usr_rec", Role::Recruiter)] {
            let credential = codec.issue(&identity, Duration::hours(1)).unwrap();
            assert_eq!(codec.verify(&credential.token).unwrap(), identity);
        }
    }

    #[test]
    fn test_issue_sets_expiry_from_ttl() {
        let credential = codec()
            .issue_at(&seeker(), Duration::seconds(90), 1_000)
            .unwrap();
        assert_eq!(credential.claims.iat, 1_000);
        assert_eq!(credential.expires_at(), 1_090);
        assert!(!credential.claims.jti.is_empty());
    }

    #[test]
    fn test_non_positive_ttl_is_rejected() {
        let err = codec().issue(&seeker(), Duration::zero()).unwrap_err();
        assert!(matches!(err, CredentialError::Internal(_)));
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        let err = codec()
            .issue_at(&seeker(), Duration::seconds(10), i64::MAX - 5)
            .unwrap_err();
        assert!(matches!(err, CredentialError::Internal(_)));
    }

    #[test]
    fn test_expired_at_and_after_expiry() {
        let codec = codec();
        let credential = codec
            .issue_at(&seeker(), Duration::seconds(60), 1_000)
            .unwrap();

        assert!(codec.verify_claims_at(&credential.token, 1_059).is_ok());
        assert_eq!(
            codec.verify_claims_at(&credential.token, 1_060).unwrap_err(),
            CredentialError::Expired
        );
        assert_eq!(
            codec.verify_claims_at(&credential.token, 5_000).unwrap_err(),
            CredentialError::Expired
        );
    }

    #[test]
    fn test_expired_wins_over_bad_signature() {
        let credential = codec()
            .issue_at(&seeker(), Duration::seconds(60), 1_000)
            .unwrap();
        let other = CredentialCodec::new(b"another-secret-that-is-also-long-enough!!");

        assert_eq!(
            other.verify_claims_at(&credential.token, 1_060).unwrap_err(),
            CredentialError::Expired
        );
        assert_eq!(
            other.verify_claims_at(&credential.token, 1_010).unwrap_err(),
            CredentialError::BadSignature
        );
    }

    #[test]
    fn test_flipped_signature_bit_is_bad_signature() {
        let codec = codec();
        let credential = codec.issue(&seeker(), Duration::hours(1)).unwrap();
        let (signed, signature) = credential.token.rsplit_once('.').unwrap();
        let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();

        for byte in 0..signature.len() {
            for bit in [0u8, 3, 7] {
                let mut tampered = signature.clone();
                tampered[byte] ^= 1 << bit;
                let token = format!("{signed}.{}", URL_SAFE_NO_PAD.encode(&tampered));
                assert_eq!(
                    codec.verify(&token).unwrap_err(),
                    CredentialError::BadSignature,
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn test_tampered_payload_is_bad_signature() {
        let codec = codec();
        let credential = codec.issue(&seeker(), Duration::hours(1)).unwrap();
        let mut parts: Vec<&str> = credential.token.split('.').collect();

        let mut claims = credential.claims.clone();
        claims.role = Role::Recruiter;
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        parts[1] = &forged;

        assert_eq!(
            codec.verify(&parts.join(".")).unwrap_err(),
            CredentialError::BadSignature
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = codec();
        for token in ["", "not-a-token", "a.b", "a.b.c", "....", "e30.e30.e30"] {
            assert_eq!(
                codec.verify(token).unwrap_err(),
                CredentialError::Malformed,
                "{token:?}"
            );
        }
    }

    #[test]
    fn test_foreign_algorithm_is_malformed() {
        let claims = Claims {
            sub: "usr_1".into(),
            role: Role::Seeker,
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 60,
            jti: "x".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec().verify(&token).unwrap_err(), CredentialError::Malformed);
    }
}
