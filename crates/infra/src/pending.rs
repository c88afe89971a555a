//! New organisations and roles proposed inline during a user edit.
//!
//! Clients refer to not-yet-created rows by a correlation id. The batch is
//! validated up front, resolved to real rows at the start of the edit
//! transaction, and everything after that works with real ids only.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use guildhall_auth::{Role, RoleKey};
use guildhall_core::{DomainError, DomainResult, OrganisationId};
use guildhall_membership::{Organisation, OrganisationType, unique_slug};

use crate::store::DirectoryTx;

/// Client-supplied handle for a pending row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to either a persisted row or a row pending in the same batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Choice<T> {
    Existing { id: T },
    Pending { correlation_id: CorrelationId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrganisation {
    pub correlation_id: CorrelationId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRole {
    pub correlation_id: CorrelationId,
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntityBatch {
    #[serde(default)]
    pub organisations: Vec<PendingOrganisation>,
    #[serde(default)]
    pub roles: Vec<PendingRole>,
}

impl PendingEntityBatch {
    pub fn is_empty(&self) -> bool {
        self.organisations.is_empty() && self.roles.is_empty()
    }

    /// Check every pending row without touching storage.
    ///
    /// Any malformed row fails the whole batch.
    pub fn validate(&self) -> DomainResult<ValidatedBatch> {
        let mut seen = BTreeSet::new();
        let mut organisations = Vec::with_capacity(self.organisations.len());
        for o in &self.organisations {
            let name = o.name.trim();
            if o.correlation_id.as_str().is_empty() || name.is_empty() {
                return Err(DomainError::validation("Pending organisation is invalid."));
            }
            let kind: OrganisationType = o.kind.parse()?;
            if !seen.insert(o.correlation_id.clone()) {
                return Err(duplicate(&o.correlation_id));
            }
            organisations.push((o.correlation_id.clone(), name.to_string(), kind));
        }

        let mut seen = BTreeSet::new();
        let mut roles = BTreeMap::new();
        for r in &self.roles {
            let label = r.label.trim();
            if r.correlation_id.as_str().is_empty() || r.key.trim().is_empty() || label.is_empty() {
                return Err(DomainError::validation("Pending role is invalid."));
            }
            let key = RoleKey::parse(&r.key)?;
            if !seen.insert(r.correlation_id.clone()) {
                return Err(duplicate(&r.correlation_id));
            }
            roles.insert(r.correlation_id.clone(), (key, label.to_string()));
        }

        Ok(ValidatedBatch { organisations, roles })
    }
}

fn duplicate(id: &CorrelationId) -> DomainError {
    DomainError::validation(format!("Pending reference '{id}' is used twice."))
}

fn unknown(id: &CorrelationId) -> DomainError {
    DomainError::validation(format!("Pending reference '{id}' does not match any pending item."))
}

/// A batch whose rows are known to be well formed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedBatch {
    organisations: Vec<(CorrelationId, String, OrganisationType)>,
    roles: BTreeMap<CorrelationId, (RoleKey, String)>,
}

impl ValidatedBatch {
    /// Role key a choice resolves to, known before anything is written.
    pub fn role_key(&self, choice: &Choice<RoleKey>) -> DomainResult<RoleKey> {
        match choice {
            Choice::Existing { id } => Ok(id.clone()),
            Choice::Pending { correlation_id } => self
                .roles
                .get(correlation_id)
                .map(|(key, _)| key.clone())
                .ok_or_else(|| unknown(correlation_id)),
        }
    }

    /// Create the pending rows inside `tx`.
    ///
    /// Organisations always get a fresh unique slug. A pending role whose
    /// key already exists reuses the existing role.
    pub fn resolve(self, tx: &mut dyn DirectoryTx, now: DateTime<Utc>) -> DomainResult<ResolvedBatch> {
        let mut organisations = BTreeMap::new();
        for (correlation_id, name, kind) in self.organisations {
            let taken: BTreeSet<String> = tx
                .organisations()?
                .into_iter()
                .map(|o| o.slug.as_str().to_string())
                .collect();
            let slug = unique_slug(&name, |s| taken.contains(s));
            let organisation = Organisation::new(&name, kind, slug, now)?;
            organisations.insert(correlation_id, organisation.id);
            tx.insert_organisation(organisation)?;
        }

        for (key, label) in self.roles.into_values() {
            if tx.role(&key)?.is_none() {
                tx.insert_role(Role::new(key, &label)?)?;
            }
        }

        Ok(ResolvedBatch { organisations })
    }
}

/// Pending organisations mapped to their persisted ids.
///
/// Pending roles need no mapping: their keys are known once validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBatch {
    organisations: BTreeMap<CorrelationId, OrganisationId>,
}

impl ResolvedBatch {
    pub fn organisation(&self, choice: &Choice<OrganisationId>) -> DomainResult<OrganisationId> {
        match choice {
            Choice::Existing { id } => Ok(*id),
            Choice::Pending { correlation_id } => {
                self.organisations.get(correlation_id).copied().ok_or_else(|| unknown(correlation_id))
            }
        }
    }
}
