use serde::Deserialize;

use guildhall_core::OrganisationId;
use guildhall_membership::{BenefitState, MembershipForm};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct DefaultAppRequest {
    pub app: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    /// Defaults to the user's own organisation.
    pub organisation_id: Option<OrganisationId>,
    #[serde(flatten)]
    pub form: MembershipForm,
}

#[derive(Debug, Deserialize)]
pub struct RedemptionsRequest {
    #[serde(default)]
    pub benefits: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganisationRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub label: String,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct BenefitFilterQuery {
    pub state: Option<BenefitState>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectedMemberQuery {
    pub selected: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessQuery {
    /// Check another user instead of the caller (admins only).
    pub user_id: Option<String>,
}
