use serde::{Deserialize, Serialize};

use crate::models::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Employees,
    Invoices,
    Projects,
    Files,
    Settings,
    Analytics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resource::Employees => "employees",
            Resource::Invoices => "invoices",
            Resource::Projects => "projects",
            Resource::Files => "files",
            Resource::Settings => "settings",
            Resource::Analytics => "analytics",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub resource: Resource,
    pub actions: Vec<Action>,
}

const ALL: &[Action] = &[Action::Create, Action::Read, Action::Update, Action::Delete];
const MANAGE: &[Action] = &[Action::Create, Action::Read, Action::Update];
const READ_UPDATE: &[Action] = &[Action::Read, Action::Update];
const READ: &[Action] = &[Action::Read];

/// Actions a role may perform on a resource.
pub fn allowed_actions(role: UserRole, resource: Resource) -> &'static [Action] {
    use Resource::*;
    match (role, resource) {
        (UserRole::Admin, Analytics) => READ,
        (UserRole::Admin, _) => ALL,

        (UserRole::Employer | UserRole::Freelancer, Settings) => READ_UPDATE,
        (UserRole::Employer | UserRole::Freelancer, Analytics) => READ,
        (UserRole::Employer | UserRole::Freelancer, _) => MANAGE,

        (UserRole::Employee, Projects | Files) => READ_UPDATE,
        (UserRole::Employee, _) => READ,

        (UserRole::Client, Projects | Files) => READ,
        (UserRole::Client, _) => &[],
    }
}

pub fn can(role: UserRole, resource: Resource, action: Action) -> bool {
    allowed_actions(role, resource).contains(&action)
}

/// The full permission list for a role, in resource order.
pub fn role_permissions(role: UserRole) -> Vec<Permission> {
    use Resource::*;
    [Employees, Invoices, Projects, Files, Settings, Analytics]
        .into_iter()
        .filter_map(|resource| {
            let actions = allowed_actions(role, resource);
            (!actions.is_empty()).then(|| Permission {
                resource,
                actions: actions.to_vec(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_do_everything_but_write_analytics() {
        assert!(can(UserRole::Admin, Resource::Employees, Action::Delete));
        assert!(can(UserRole::Admin, Resource::Analytics, Action::Read));
        assert!(!can(UserRole::Admin, Resource::Analytics, Action::Update));
    }

    #[test]
    fn employer_cannot_delete() {
        assert!(can(UserRole::Employer, Resource::Invoices, Action::Create));
        assert!(!can(UserRole::Employer, Resource::Invoices, Action::Delete));
        assert!(!can(UserRole::Employer, Resource::Settings, Action::Create));
    }

    #[test]
    fn freelancer_matches_employer() {
        assert_eq!(
            role_permissions(UserRole::Freelancer),
            role_permissions(UserRole::Employer)
        );
    }

    #[test]
    fn employee_reads_and_updates_projects_only() {
        assert!(can(UserRole::Employee, Resource::Projects, Action::Update));
        assert!(!can(UserRole::Employee, Resource::Invoices, Action::Update));
        assert!(can(UserRole::Employee, Resource::Analytics, Action::Read));
    }

    #[test]
    fn client_sees_only_projects_and_files() {
        let permissions = role_permissions(UserRole::Client);
        assert_eq!(permissions.len(), 2);
        assert!(!can(UserRole::Client, Resource::Projects, Action::Update));
        assert!(!can(UserRole::Client, Resource::Analytics, Action::Read));
    }
}
