use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use guildhall_core::{DomainError, DomainResult, UserId};

use crate::principal::Principal;
use crate::roles::RoleSet;

/// Session token claims (transport-agnostic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the signed-in user.
    pub sub: UserId,

    /// Role keys held when the session was issued.
    pub roles: RoleSet,

    /// The user's session epoch at issue time; a bump revokes the token.
    pub epoch: u64,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    /// Expiry saturates at the latest representable instant.
    pub fn issue(principal: &Principal, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: principal.user_id,
            roles: principal.roles.clone(),
            epoch: principal.session_epoch,
            issued_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.sub, self.roles.clone(), self.epoch)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("session was revoked; sign in again")]
    Stale,
}

/// Deterministically validate the time window of session claims.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Signs and verifies session tokens.
pub trait SessionCodec: Send + Sync {
    fn encode(&self, claims: &SessionClaims) -> DomainResult<String>;

    /// Verify the signature, then the claim time window.
    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError>;
}

/// HS256 JWT codec over a shared secret.
pub struct Hs256SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256SessionCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time claims are RFC 3339 and checked by `validate_claims`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl SessionCodec for Hs256SessionCodec {
    fn encode(&self, claims: &SessionClaims) -> DomainResult<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| DomainError::internal(format!("failed to sign session token: {e}")))
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleKey;

    fn claims(now: DateTime<Utc>) -> SessionClaims {
        let roles: RoleSet = [RoleKey::Member].into_iter().collect();
        SessionClaims::issue(&Principal::new(UserId::new(), roles, 3), now, Duration::minutes(10))
    }

    #[test]
    fn time_window_is_enforced() {
        let now = Utc::now();
        let c = claims(now);
        assert!(validate_claims(&c, now).is_ok());
        assert_eq!(validate_claims(&c, now - Duration::seconds(1)), Err(TokenValidationError::NotYetValid));
        assert_eq!(validate_claims(&c, c.expires_at), Err(TokenValidationError::Expired));

        let mut broken = c.clone();
        broken.expires_at = broken.issued_at;
        assert_eq!(validate_claims(&broken, now), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn codec_round_trips_and_rejects_foreign_signatures() {
        let now = Utc::now();
        let codec = Hs256SessionCodec::new(b"secret-a");
        let token = codec.encode(&claims(now)).unwrap();

        let decoded = codec.decode(&token, now).unwrap();
        assert_eq!(decoded.epoch, 3);
        assert!(decoded.roles.is_member());

        let other = Hs256SessionCodec::new(b"secret-b");
        assert!(matches!(other.decode(&token, now), Err(TokenValidationError::Malformed(_))));
        assert!(matches!(codec.decode("not-a-jwt", now), Err(TokenValidationError::Malformed(_))));
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let now = Utc::now();
        let roles: RoleSet = [RoleKey::Member].into_iter().collect();
        let c = SessionClaims::issue(&Principal::new(UserId::new(), roles, 0), now, Duration::MAX);
        assert_eq!(c.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(validate_claims(&c, now).is_ok());
    }

    #[test]
    fn codec_checks_expiry_after_signature() {
        let now = Utc::now();
        let codec = Hs256SessionCodec::new(b"secret");
        let token = codec.encode(&claims(now)).unwrap();
        assert_eq!(
            codec.decode(&token, now + Duration::minutes(11)),
            Err(TokenValidationError::Expired)
        );
    }
}
