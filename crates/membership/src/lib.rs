//! `guildhall-membership`: tiers, memberships, benefits and redemptions.
//!
//! Everything here is pure: no storage, no transport. The infra layer loads
//! rows and hands them to these types and functions.

pub mod benefit;
pub mod eligibility;
pub mod membership;
pub mod organisation;
pub mod redemption;
pub mod stats;
pub mod tier;

pub use benefit::{Benefit, BenefitCatalog, BenefitCategory, BenefitId};
pub use eligibility::{
    BenefitCounts, BenefitState, EffectiveBenefit, benefit_state, can_access_benefit,
    effective_benefits,
};
pub use membership::{
    Membership, MembershipForm, MembershipStatus, MembershipTerms, active_membership_violations,
    select_active,
};
pub use organisation::{Organisation, OrganisationType, Slug, slugify, unique_slug};
pub use redemption::{RedemptionRecord, member_key};
pub use stats::{
    BenefitRedemptionStat, MemberRedemptions, TierPricing, TierSummary, benefit_redemption_stats,
    tier_summaries, top_benefit,
};
pub use tier::{MembershipTier, TierCatalog, TierKey, TierRank};
