use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use guildhall_core::{DomainError, DomainResult, Entity, RoleId};

/// Capability tag carried by a user.
///
/// The four built-in roles get their own variants; anything else an admin
/// creates is `Custom`. Keys are upper case `[A-Z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoleKey {
    Admin,
    Member,
    Student,
    ModuleLeader,
    Custom(String),
}

impl RoleKey {
    pub fn as_str(&self) -> &str {
        match self {
            RoleKey::Admin => "ADMIN",
            RoleKey::Member => "MEMBER",
            RoleKey::Student => "STUDENT",
            RoleKey::ModuleLeader => "MODULE_LEADER",
            RoleKey::Custom(key) => key,
        }
    }

    /// Trim, upper-case and validate a submitted key.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let key = raw.trim().to_ascii_uppercase();
        if key.is_empty() {
            return Err(DomainError::validation("Role key is required."));
        }
        if !key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
            return Err(DomainError::validation(
                "Role key must use uppercase letters, digits or underscores.",
            ));
        }
        Ok(match key.as_str() {
            "ADMIN" => RoleKey::Admin,
            "MEMBER" => RoleKey::Member,
            "STUDENT" => RoleKey::Student,
            "MODULE_LEADER" => RoleKey::ModuleLeader,
            _ => RoleKey::Custom(key),
        })
    }
}

impl core::fmt::Display for RoleKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoleKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoleKey> for String {
    fn from(value: RoleKey) -> Self {
        value.as_str().to_string()
    }
}

/// The set of roles held by one user. Roles are additive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<RoleKey>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, role: &RoleKey) -> bool {
        self.0.contains(role)
    }

    /// ADMIN is the universal override.
    pub fn is_admin(&self) -> bool {
        self.contains(&RoleKey::Admin)
    }

    pub fn is_member(&self) -> bool {
        self.contains(&RoleKey::Member)
    }

    pub fn insert(&mut self, role: RoleKey) -> bool {
        self.0.insert(role)
    }

    pub fn remove(&mut self, role: &RoleKey) -> bool {
        self.0.remove(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_string()).collect()
    }
}

impl FromIterator<RoleKey> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a RoleKey;
    type IntoIter = std::collections::btree_set::Iter<'a, RoleKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A persisted role row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub key: RoleKey,
    pub label: String,
}

impl Role {
    pub fn new(key: RoleKey, label: &str) -> DomainResult<Self> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DomainError::validation("Role label is required."));
        }
        Ok(Self {
            id: RoleId::new(),
            key,
            label: label.to_string(),
        })
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_normalised_to_upper_case() {
        assert_eq!(RoleKey::parse(" module_leader ").unwrap(), RoleKey::ModuleLeader);
        assert_eq!(
            RoleKey::parse("reviewer_2").unwrap(),
            RoleKey::Custom("REVIEWER_2".to_string())
        );
    }

    #[test]
    fn malformed_keys_are_validation_errors() {
        for raw in ["", "   ", "has space", "dash-key", "émoji"] {
            let err = RoleKey::parse(raw).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{raw:?} -> {err:?}");
        }
    }

    #[test]
    fn serde_uses_the_key_string() {
        let set: RoleSet = [RoleKey::Admin, RoleKey::Custom("X1".into())].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["ADMIN","X1"]"#);
        let back: RoleSet = serde_json::from_str(r#"["admin","x1"]"#).unwrap();
        assert_eq!(back, set);
        assert!(serde_json::from_str::<RoleKey>(r#""bad key""#).is_err());
    }

    #[test]
    fn role_label_is_required() {
        assert!(Role::new(RoleKey::Student, "  ").is_err());
        assert_eq!(Role::new(RoleKey::Student, " Student ").unwrap().label, "Student");
    }
}
