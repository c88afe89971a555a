//! Entitlement resolver for protected apps.
//!
//! [`decide`] is pure: callers load the subject's roles and active membership
//! rank plus the app's rules, and pass them in. Every call re-reads current
//! state upstream; nothing here is cached.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use guildhall_core::{AppId, DomainError, DomainResult, Entity};
use guildhall_membership::{TierCatalog, TierKey, TierRank};

use crate::roles::{RoleKey, RoleSet};

/// Unique key of a protected app, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppKey(String);

impl AppKey {
    pub const MEMBERSHIP_DASHBOARD: &'static str = "MEMBERSHIP_DASHBOARD";
    pub const IXN_WORKFLOW_MANAGER: &'static str = "IXN_WORKFLOW_MANAGER";
    pub const TALENT_DISCOVERY: &'static str = "TALENT_DISCOVERY";

    /// Normalising constructor; lookups are case-insensitive.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn parse(raw: &str) -> DomainResult<Self> {
        let key = Self::new(raw);
        if key.0.is_empty() {
            return Err(DomainError::validation("App key is required."));
        }
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, key: &str) -> bool {
        self.0 == key
    }
}

impl core::fmt::Display for AppKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    Allow,
}

/// "Members at or above `min_tier` may use this app."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub access_type: AccessType,
    pub min_tier: TierKey,
}

impl AccessRule {
    pub fn allow(min_tier: TierKey) -> Self {
        Self {
            access_type: AccessType::Allow,
            min_tier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub key: AppKey,
    pub name: String,
    pub rules: Vec<AccessRule>,
}

impl App {
    pub fn new(key: AppKey, name: impl Into<String>, rules: Vec<AccessRule>) -> Self {
        Self {
            id: AppId::new(),
            key,
            name: name.into(),
            rules,
        }
    }

    /// Lowest rank among ALLOW rules: the most permissive rule wins.
    ///
    /// `None` when the app has no ALLOW rule whose tier is known.
    pub fn effective_min_rank(&self, tiers: &TierCatalog) -> Option<TierRank> {
        self.rules
            .iter()
            .filter(|r| r.access_type == AccessType::Allow)
            .filter_map(|r| tiers.rank(r.min_tier))
            .min()
    }
}

impl Entity for App {
    type Id = AppId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Declarative per-app role bypasses: holders of any listed role may use the
/// app regardless of membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BypassTable {
    entries: BTreeMap<AppKey, BTreeSet<RoleKey>>,
}

impl BypassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module leaders may use the IXN workflow manager.
    pub fn standard() -> Self {
        Self::new().with(AppKey::new(AppKey::IXN_WORKFLOW_MANAGER), [RoleKey::ModuleLeader])
    }

    pub fn with(mut self, app: AppKey, roles: impl IntoIterator<Item = RoleKey>) -> Self {
        self.entries.entry(app).or_default().extend(roles);
        self
    }

    pub fn roles_for(&self, app: &AppKey) -> Option<&BTreeSet<RoleKey>> {
        self.entries.get(app)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `APP=ROLE|ROLE;APP2=ROLE`. Blank input is an empty table.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let mut table = Self::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (app, roles) = entry
                .split_once('=')
                .ok_or_else(|| DomainError::validation(format!("bypass entry '{entry}' must look like APP=ROLE")))?;
            let app = AppKey::parse(app)?;
            let roles = roles
                .split('|')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(RoleKey::parse)
                .collect::<DomainResult<Vec<_>>>()?;
            if roles.is_empty() {
                return Err(DomainError::validation(format!("bypass entry for {app} lists no roles")));
            }
            table = table.with(app, roles);
        }
        Ok(table)
    }
}

/// What the resolver needs to know about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSubject {
    pub roles: RoleSet,
    /// Rank of the single active membership, if any.
    pub active_rank: Option<TierRank>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessReason {
    AdminOverride,
    RoleBypass { role: RoleKey },
    UnknownUser,
    UnknownApp,
    NoActiveMembership,
    NoAllowRules,
    TierSufficient { member: TierRank, required: TierRank },
    TierInsufficient { member: TierRank, required: TierRank },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub granted: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    pub fn allow(reason: AccessReason) -> Self {
        Self { granted: true, reason }
    }

    pub fn deny(reason: AccessReason) -> Self {
        Self { granted: false, reason }
    }
}

/// Decide whether `subject` may use `app`.
///
/// Order matters: the ADMIN override is checked before the app is even
/// looked at, so an admin passes for unknown apps too. Per-app bypass roles
/// only apply to apps that exist.
pub fn decide(subject: &AccessSubject, app: Option<&App>, bypass: &BypassTable, tiers: &TierCatalog) -> AccessDecision {
    if subject.roles.is_admin() {
        return AccessDecision::allow(AccessReason::AdminOverride);
    }

    let Some(app) = app else {
        return AccessDecision::deny(AccessReason::UnknownApp);
    };

    if let Some(role) = bypass
        .roles_for(&app.key)
        .and_then(|roles| roles.iter().find(|r| subject.roles.contains(r)))
    {
        return AccessDecision::allow(AccessReason::RoleBypass { role: role.clone() });
    }

    let Some(member) = subject.active_rank else {
        return AccessDecision::deny(AccessReason::NoActiveMembership);
    };

    let Some(required) = app.effective_min_rank(tiers) else {
        return AccessDecision::deny(AccessReason::NoAllowRules);
    };

    if member.satisfies(required) {
        AccessDecision::allow(AccessReason::TierSufficient { member, required })
    } else {
        AccessDecision::deny(AccessReason::TierInsufficient { member, required })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn subject(roles: &[RoleKey], tier: Option<TierKey>) -> AccessSubject {
        AccessSubject {
            roles: roles.iter().cloned().collect(),
            active_rank: tier.map(|t| t.standard_rank()),
        }
    }

    fn talent_discovery() -> App {
        App::new(
            AppKey::new("talent_discovery"),
            "Talent Discovery",
            vec![AccessRule::allow(TierKey::Bronze), AccessRule::allow(TierKey::Gold)],
        )
    }

    #[test]
    fn lowest_allow_rule_wins() {
        let tiers = TierCatalog::standard();
        let app = talent_discovery();
        let silver = subject(&[RoleKey::Member], Some(TierKey::Silver));
        let decision = decide(&silver, Some(&app), &BypassTable::standard(), &tiers);
        assert!(decision.granted);
        assert_eq!(
            decision.reason,
            AccessReason::TierSufficient {
                member: TierRank::new(2),
                required: TierRank::new(1)
            }
        );
    }

    #[test]
    fn no_roles_and_no_membership_is_denied() {
        let tiers = TierCatalog::standard();
        let decision = decide(&subject(&[], None), Some(&talent_discovery()), &BypassTable::standard(), &tiers);
        assert_eq!(decision, AccessDecision::deny(AccessReason::NoActiveMembership));
    }

    #[test]
    fn one_rank_short_is_denied() {
        let tiers = TierCatalog::standard();
        let app = App::new(AppKey::new("X"), "X", vec![AccessRule::allow(TierKey::Gold)]);
        let decision = decide(&subject(&[], Some(TierKey::Silver)), Some(&app), &BypassTable::new(), &tiers);
        assert!(!decision.granted);
    }

    #[test]
    fn admin_passes_even_for_unknown_apps() {
        let tiers = TierCatalog::standard();
        let admin = subject(&[RoleKey::Admin], None);
        assert!(decide(&admin, None, &BypassTable::new(), &tiers).granted);

        let empty = App::new(AppKey::new("EMPTY"), "Empty", vec![]);
        assert!(decide(&admin, Some(&empty), &BypassTable::new(), &tiers).granted);
        assert_eq!(
            decide(&subject(&[RoleKey::Member], Some(TierKey::Platinum)), Some(&empty), &BypassTable::new(), &tiers).reason,
            AccessReason::NoAllowRules
        );
    }

    #[test]
    fn bypass_roles_apply_per_app() {
        let tiers = TierCatalog::standard();
        let bypass = BypassTable::standard();
        let leader = subject(&[RoleKey::ModuleLeader], None);
        let ixn = App::new(AppKey::new(AppKey::IXN_WORKFLOW_MANAGER), "IXN", vec![]);

        let decision = decide(&leader, Some(&ixn), &bypass, &tiers);
        assert_eq!(decision.reason, AccessReason::RoleBypass { role: RoleKey::ModuleLeader });
        assert!(!decide(&leader, Some(&talent_discovery()), &bypass, &tiers).granted);
        assert!(!decide(&leader, None, &bypass, &tiers).granted);
    }

    #[test]
    fn bypass_table_parses_config_syntax() {
        let table = BypassTable::parse("ixn_workflow_manager=module_leader|student; TALENT_DISCOVERY=STUDENT").unwrap();
        assert_eq!(table.len(), 2);
        let roles = table.roles_for(&AppKey::new("IXN_WORKFLOW_MANAGER")).unwrap();
        assert!(roles.contains(&RoleKey::Student) && roles.contains(&RoleKey::ModuleLeader));

        assert!(BypassTable::parse("").unwrap().is_empty());
        assert!(BypassTable::parse("NO_EQUALS").is_err());
        assert!(BypassTable::parse("APP=").is_err());
        assert!(BypassTable::parse("APP=bad role").is_err());
    }

    fn tier_strategy() -> impl Strategy<Value = TierKey> {
        prop::sample::select(TierKey::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn access_is_monotonic_in_rank(
            rules in prop::collection::vec(tier_strategy(), 0..4),
            low in tier_strategy(),
            high in tier_strategy(),
        ) {
            prop_assume!(low.standard_rank() < high.standard_rank());
            let tiers = TierCatalog::standard();
            let app = App::new(
                AppKey::new("P"),
                "P",
                rules.into_iter().map(AccessRule::allow).collect(),
            );
            let bypass = BypassTable::new();
            let low_ok = decide(&subject(&[RoleKey::Member], Some(low)), Some(&app), &bypass, &tiers).granted;
            let high_ok = decide(&subject(&[RoleKey::Member], Some(high)), Some(&app), &bypass, &tiers).granted;
            prop_assert!(!low_ok || high_ok);
        }
    }
}
