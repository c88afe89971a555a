//! Benefit catalog.
//!
//! Benefits are static definitions, not persisted rows. Each carries the
//! minimum tier that unlocks it and, optionally, the ids of lower benefits it
//! supersedes.

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use guildhall_core::{DomainError, DomainResult};

use crate::tier::TierKey;

/// Benefit identifier (`B01` ... `B17` in the standard catalog).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenefitId(Cow<'static, str>);

impl BenefitId {
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for BenefitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitCategory {
    WorkforceDevelopment,
    Innovation,
    PrAndNetworking,
    Operations,
}

impl BenefitCategory {
    pub fn label(&self) -> &'static str {
        match self {
            BenefitCategory::WorkforceDevelopment => "Workforce Development & Talent Acquisition",
            BenefitCategory::Innovation => "Innovation",
            BenefitCategory::PrAndNetworking => "PR & Networking",
            BenefitCategory::Operations => "Operations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benefit {
    pub id: BenefitId,
    pub tier_min: TierKey,
    pub category: BenefitCategory,
    pub label: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supersedes: Vec<BenefitId>,
}

impl Benefit {
    pub fn new(
        id: impl Into<Cow<'static, str>>,
        tier_min: TierKey,
        category: BenefitCategory,
        label: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            id: BenefitId::new(id),
            tier_min,
            category,
            label: label.into(),
            supersedes: Vec::new(),
        }
    }

    pub fn superseding(mut self, ids: &[&'static str]) -> Self {
        self.supersedes = ids.iter().map(|id| BenefitId::new(*id)).collect();
        self
    }
}

use BenefitCategory::{Innovation, Operations, PrAndNetworking, WorkforceDevelopment};
use TierKey::{Bronze, Gold, Platinum, Silver};

const STANDARD: &[(&str, TierKey, BenefitCategory, &str)] = &[
    ("B01", Bronze, Innovation, "IXN Undergraduate or Graduate Project Collaboration"),
    ("B02", Silver, PrAndNetworking, "Brand Visibility on the UCL Computer Science Website"),
    ("B03", Silver, WorkforceDevelopment, "Presentation Slot at a Student Careers Fair"),
    ("B04", Silver, WorkforceDevelopment, "Promotion of Up to Two Job Roles per Year"),
    ("B05", Silver, PrAndNetworking, "Invitation to the Student Project Showcase"),
    ("B06", Silver, WorkforceDevelopment, "Sponsorship of a Student Engagement Event (Including Catering for 50)"),
    ("B07", Silver, Operations, "Dedicated Strategic Alliances Client Experience Manager"),
    ("B08", Silver, WorkforceDevelopment, "Pop-Up Careers Fair Stand (Half Day)"),
    ("B09", Gold, WorkforceDevelopment, "Access to Curated UCL Short Courses"),
    ("B10", Gold, PrAndNetworking, "VIP Invitations to Departmental Special Events"),
    ("B11", Gold, WorkforceDevelopment, "Recruiter-in-Residence: On-Campus Interview Space"),
    ("B12", Gold, Innovation, "Sponsorship and Participation in One Hackathon or Consultancy Challenge"),
    ("B13", Platinum, Operations, "Seat on the Friends of UCL Computer Science Steering Group"),
    ("B14", Platinum, WorkforceDevelopment, "Executive Education Taster Session for up to 20 Leaders (1 Day)"),
    ("B15", Platinum, WorkforceDevelopment, "Dedicated Support for Reverse Mentoring Programmes"),
    ("B16", Platinum, PrAndNetworking, "Invitation to Network with PhD Researchers"),
    ("B17", Platinum, WorkforceDevelopment, "Pop-Up Careers Fair Stand (Full Day)"),
];

/// Ordered benefit definitions.
///
/// # Invariants
/// - Ids are unique.
/// - Every `supersedes` entry names a benefit in the same catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenefitCatalog {
    benefits: Vec<Benefit>,
}

impl BenefitCatalog {
    pub fn new(benefits: Vec<Benefit>) -> DomainResult<Self> {
        let mut seen = BTreeSet::new();
        for b in &benefits {
            if !seen.insert(b.id.clone()) {
                return Err(DomainError::validation(format!("duplicate benefit id {}", b.id)));
            }
        }
        for b in &benefits {
            if let Some(missing) = b.supersedes.iter().find(|id| !seen.contains(*id)) {
                return Err(DomainError::validation(format!(
                    "benefit {} supersedes unknown benefit {missing}",
                    b.id
                )));
            }
        }
        Ok(Self { benefits })
    }

    /// The seventeen partner benefits; B17 supersedes B08.
    pub fn standard() -> Self {
        let benefits = STANDARD
            .iter()
            .map(|(id, tier, category, label)| {
                let benefit = Benefit::new(*id, *tier, *category, *label);
                if *id == "B17" { benefit.superseding(&["B08"]) } else { benefit }
            })
            .collect();
        Self { benefits }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Benefit> {
        self.benefits.iter()
    }

    pub fn len(&self) -> usize {
        self.benefits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.benefits.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Benefit> {
        self.benefits.iter().find(|b| b.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Validate raw codes against the catalog.
    ///
    /// Codes are trimmed and then matched exactly, so `b01` is not `B01`.
    /// The first unknown code fails the whole set.
    pub fn validate_codes<I, S>(&self, codes: I) -> DomainResult<BTreeSet<BenefitId>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        codes
            .into_iter()
            .map(|code| {
                let code = code.as_ref().trim();
                self.get(code)
                    .map(|b| b.id.clone())
                    .ok_or_else(|| DomainError::validation(format!("Unknown benefit code: {code}")))
            })
            .collect()
    }
}

impl Default for BenefitCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_internally_consistent() {
        let standard = BenefitCatalog::standard();
        assert_eq!(standard.len(), 17);
        let rebuilt = BenefitCatalog::new(standard.iter().cloned().collect()).unwrap();
        assert_eq!(rebuilt, standard);
    }

    #[test]
    fn b17_supersedes_b08() {
        let catalog = BenefitCatalog::standard();
        let b17 = catalog.get("B17").unwrap();
        assert_eq!(b17.tier_min, TierKey::Platinum);
        assert_eq!(b17.supersedes, vec![BenefitId::new("B08")]);
        assert_eq!(catalog.get("B08").unwrap().tier_min, TierKey::Silver);
    }

    #[test]
    fn validate_codes_trims_and_dedups() {
        let catalog = BenefitCatalog::standard();
        let ids = catalog.validate_codes(["B01", " B02 ", "B01"]).unwrap();
        let ids: Vec<&str> = ids.iter().map(BenefitId::as_str).collect();
        assert_eq!(ids, vec!["B01", "B02"]);
    }

    #[test]
    fn validate_codes_rejects_unknown_code() {
        let err = BenefitCatalog::standard().validate_codes(["B01", "B99"]).unwrap_err();
        assert_eq!(err, DomainError::validation("Unknown benefit code: B99"));
    }

    #[test]
    fn validate_codes_is_case_sensitive() {
        let err = BenefitCatalog::standard().validate_codes(["b01"]).unwrap_err();
        assert_eq!(err, DomainError::validation("Unknown benefit code: b01"));
    }

    #[test]
    fn dangling_supersedes_is_rejected() {
        let result = BenefitCatalog::new(vec![
            Benefit::new("X1", TierKey::Gold, BenefitCategory::Operations, "x").superseding(&["NOPE"]),
        ]);
        assert!(result.is_err());
    }
}
