//! Partner organisations.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use guildhall_core::{DomainError, DomainResult, Entity, OrganisationId, ValueObject};

const MAX_SLUG_LEN: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganisationType {
    University,
    Industry,
    Other,
}

impl OrganisationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganisationType::University => "UNIVERSITY",
            OrganisationType::Industry => "INDUSTRY",
            OrganisationType::Other => "OTHER",
        }
    }
}

impl FromStr for OrganisationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "UNIVERSITY" => Ok(OrganisationType::University),
            "INDUSTRY" => Ok(OrganisationType::Industry),
            "OTHER" => Ok(OrganisationType::Other),
            _ => Err(DomainError::validation("Organisation type is invalid.")),
        }
    }
}

/// URL-safe organisation handle: `[a-z0-9-]`, at most 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Slug {}

impl core::fmt::Display for Slug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case, strip quotes, collapse every other non-alphanumeric run to `-`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.trim().to_lowercase().chars() {
        if ch == '\'' || ch == '"' {
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }

    out.truncate(MAX_SLUG_LEN);
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Derive a slug from `name` that `taken` does not report as used.
///
/// Collisions are disambiguated with `-2`, `-3`, ...
pub fn unique_slug(name: &str, taken: impl Fn(&str) -> bool) -> Slug {
    let root = match slugify(name) {
        s if s.is_empty() => "org".to_string(),
        s => s,
    };

    let mut candidate = root.clone();
    let mut suffix = 2u32;
    while taken(&candidate) {
        let tail = format!("-{suffix}");
        // Slugs are ASCII, so byte slicing is safe.
        let keep = root.len().min(MAX_SLUG_LEN - tail.len());
        candidate = format!("{}{tail}", root[..keep].trim_end_matches('-'));
        suffix += 1;
    }
    Slug(candidate)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: OrganisationId,
    pub name: String,
    pub slug: Slug,
    pub kind: OrganisationType,
    pub created_at: DateTime<Utc>,
}

impl Organisation {
    /// Validate the name and build a new organisation row.
    pub fn new(
        name: &str,
        kind: OrganisationType,
        slug: Slug,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("Organisation name is required."));
        }
        Ok(Self {
            id: OrganisationId::new(),
            name: name.to_string(),
            slug,
            kind,
            created_at,
        })
    }
}

impl Entity for Organisation {
    type Id = OrganisationId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
