//! Where a user lands after signing in.

use serde::Serialize;

use crate::access::AppKey;
use crate::roles::{RoleKey, RoleSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Landing {
    Home,
    App {
        app: AppKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        view: Option<&'static str>,
    },
}

/// Admins go to the membership dashboard; everyone else to their default
/// app, or home when they have none. Talent discovery opens on the student
/// view for students and the job board otherwise.
pub fn resolve_landing(roles: &RoleSet, default_app: Option<&AppKey>) -> Landing {
    if roles.is_admin() {
        return Landing::App {
            app: AppKey::new(AppKey::MEMBERSHIP_DASHBOARD),
            view: None,
        };
    }
    match default_app {
        None => Landing::Home,
        Some(app) if app.is(AppKey::TALENT_DISCOVERY) => Landing::App {
            app: app.clone(),
            view: Some(if roles.contains(&RoleKey::Student) { "student" } else { "job-board" }),
        },
        Some(app) => Landing::App {
            app: app.clone(),
            view: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(keys: &[RoleKey]) -> RoleSet {
        keys.iter().cloned().collect()
    }

    #[test]
    fn admin_lands_on_dashboard_regardless_of_default() {
        let talent = AppKey::new(AppKey::TALENT_DISCOVERY);
        let landing = resolve_landing(&roles(&[RoleKey::Admin]), Some(&talent));
        assert_eq!(
            landing,
            Landing::App {
                app: AppKey::new(AppKey::MEMBERSHIP_DASHBOARD),
                view: None
            }
        );
    }

    #[test]
    fn talent_discovery_view_depends_on_student_role() {
        let talent = AppKey::new(AppKey::TALENT_DISCOVERY);
        let student = resolve_landing(&roles(&[RoleKey::Student]), Some(&talent));
        let other = resolve_landing(&roles(&[RoleKey::Member]), Some(&talent));
        assert!(matches!(student, Landing::App { view: Some("student"), .. }));
        assert!(matches!(other, Landing::App { view: Some("job-board"), .. }));
    }

    #[test]
    fn no_default_app_lands_home() {
        assert_eq!(resolve_landing(&roles(&[RoleKey::Member]), None), Landing::Home);
    }
}
