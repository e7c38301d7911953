//! Signed bearer tokens.
//!
//! Tokens are standard JWTs signed with EdDSA (Ed25519). `iat` and `exp` are
//! NumericDate seconds, so tokens minted by any JWT library with the same key
//! verify here. Expiry is enforced by `jsonwebtoken` against the wall clock
//! with no leeway.

use jsonwebtoken::{Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::crypto::{short_digest, Keypair, PublicKey};
use crate::error::Result;
use crate::types::PrincipalId;

/// JWT claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The principal the token was issued to.
    pub sub: PrincipalId,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expires at (Unix seconds).
    pub exp: i64,
}

/// Short, non-reversible identifier of a token for log lines.
pub fn fingerprint(token: &str) -> String {
    short_digest(token.as_bytes())
}

/// Issues tokens. Owned by the authentication layer.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    keypair: Keypair,
    ttl_ms: i64,
}

impl TokenIssuer {
    pub fn new(keypair: Keypair, ttl_ms: i64) -> Self {
        Self { keypair, ttl_ms }
    }

    /// The verifier matching this issuer.
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(self.keypair.public_key())
    }

    /// Issue a token for a principal, valid from `now_ms` for the configured ttl.
    pub fn issue(&self, principal: PrincipalId, now_ms: i64) -> Result<String> {
        self.issue_claims(&TokenClaims {
            sub: principal,
            iat: now_ms.div_euclid(1000),
            exp: now_ms.saturating_add(self.ttl_ms).div_euclid(1000),
        })
    }

    /// Sign arbitrary claims.
    pub fn issue_claims(&self, claims: &TokenClaims) -> Result<String> {
        let key = self.keypair.encoding_key()?;
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::EdDSA),
            claims,
            &key,
        )?)
    }
}

/// Verifies tokens against the issuer's public key.
#[derive(Debug, Clone, Copy)]
pub struct TokenVerifier {
    public_key: PublicKey,
}

impl TokenVerifier {
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Check structure, algorithm, signature, then expiry.
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let key = self.public_key.decoding_key()?;
        let data = jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use jsonwebtoken::EncodingKey;
    use std::time::{SystemTime, UNIX_EPOCH};

    const HOUR: i64 = 60 * 60 * 1000;

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(Keypair::from_seed(&[0x42; 32]), HOUR)
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let principal = PrincipalId::new_v4();
        let now = now_ms();
        let token = issuer.issue(principal, now).unwrap();

        let claims = issuer.verifier().verify(&token).unwrap();
        assert_eq!(claims.sub, principal);
        assert_eq!(claims.iat, now / 1000);
        assert_eq!(claims.exp, (now + HOUR) / 1000);
    }

    #[test]
    fn test_token_is_a_standard_jwt() {
        let token = issuer().issue(PrincipalId::new_v4(), now_ms()).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::EdDSA);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_externally_minted_token_verifies() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let principal = PrincipalId::new_v4();
        let iat = now_ms() / 1000;
        // Extra claims from other issuers are ignored.
        let claims = serde_json::json!({
            "sub": principal.to_string(),
            "iat": iat,
            "exp": iat + 600,
            "email": "resident@example.org",
        });
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::EdDSA),
            &claims,
            &keypair.encoding_key().unwrap(),
        )
        .unwrap();

        let verified = TokenVerifier::new(keypair.public_key()).verify(&token).unwrap();
        assert_eq!(verified.sub, principal);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let token = issuer.issue(PrincipalId::new_v4(), 0).unwrap();
        let err = issuer.verifier().verify(&token).unwrap_err();
        assert!(matches!(err, CoreError::TokenExpired));
    }

    #[test]
    fn test_foreign_key_rejected() {
        let token = issuer().issue(PrincipalId::new_v4(), now_ms()).unwrap();
        let other = TokenVerifier::new(Keypair::from_seed(&[0x43; 32]).public_key());
        assert!(matches!(other.verify(&token), Err(CoreError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let issuer = issuer();
        let now = now_ms();
        let token = issuer.issue(PrincipalId::new_v4(), now).unwrap();
        let forged = issuer
            .issue_claims(&TokenClaims {
                sub: PrincipalId::new_v4(),
                iat: now / 1000,
                exp: i64::MAX / 1000,
            })
            .unwrap();

        // Forged payload, original signature.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);
        assert!(matches!(
            issuer.verifier().verify(&spliced),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_other_algorithms_rejected() {
        let iat = now_ms() / 1000;
        let claims = TokenClaims {
            sub: PrincipalId::new_v4(),
            iat,
            exp: iat + 600,
        };
        let hs256 = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"shared-secret"),
        )
        .unwrap();
        assert!(matches!(
            issuer().verifier().verify(&hs256),
            Err(CoreError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let verifier = issuer().verifier();
        assert!(matches!(verifier.verify(""), Err(CoreError::MalformedToken(_))));
        assert!(matches!(verifier.verify("zz.yy"), Err(CoreError::MalformedToken(_))));
        assert!(matches!(verifier.verify("a.b.c"), Err(CoreError::MalformedToken(_))));
    }

    #[test]
    fn test_fingerprint_stable() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }
}
