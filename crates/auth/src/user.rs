use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use guildhall_core::{AppId, DomainError, DomainResult, Entity, OrganisationId, UserId, ValueObject};

pub const MIN_PASSWORD_LEN: usize = 8;

/// A trimmed, lower-cased email address of the form `local@domain.tld`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let email = raw.trim().to_lowercase();
        if email.is_empty() {
            return Err(DomainError::validation("Email is required."));
        }
        if !looks_like_email(&email) {
            return Err(DomainError::validation("Email address format is invalid."));
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Email {}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Validated editable identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
}

impl UserProfile {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> DomainResult<Self> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() || email.trim().is_empty() {
            return Err(DomainError::validation("First name, last name, and email are required."));
        }
        Ok(Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: Email::parse(email)?,
        })
    }
}

pub fn validate_new_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub organisation_id: Option<OrganisationId>,
    pub default_app_id: Option<AppId>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Bumped whenever the role set changes or the password is reset by an
    /// admin; sessions issued under an older epoch are rejected.
    pub session_epoch: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(profile: UserProfile, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            organisation_id: None,
            default_app_id: None,
            password_hash,
            session_epoch: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn apply_profile(&mut self, profile: UserProfile, now: DateTime<Utc>) {
        self.first_name = profile.first_name;
        self.last_name = profile.last_name;
        self.email = profile.email;
        self.updated_at = now;
    }

    pub fn set_password_hash(&mut self, hash: String, now: DateTime<Utc>) {
        self.password_hash = hash;
        self.updated_at = now;
    }

    pub fn revoke_sessions(&mut self, now: DateTime<Utc>) {
        self.session_epoch += 1;
        self.updated_at = now;
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalised_and_checked() {
        assert_eq!(Email::parse("  Ada@Example.ORG ").unwrap().as_str(), "ada@example.org");
        for bad in ["ada", "ada@", "@example.org", "ada@example", "a b@example.org", "a@b@c.org"] {
            assert!(Email::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn profile_requires_names() {
        let err = UserProfile::new(" ", "Lovelace", "ada@example.org").unwrap_err();
        assert_eq!(err.message(), "First name, last name, and email are required.");
    }

    #[test]
    fn password_minimum_length() {
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password("exactly8").is_ok());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let profile = UserProfile::new("Ada", "Lovelace", "ada@example.org").unwrap();
        let user = User::new(profile, "$argon2id$secret".to_string(), Utc::now());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
