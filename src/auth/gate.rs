use crate::{auth::auth::AuthUser, error::AppError, model::role::Role};

/// Admits an identity only if its role is in the accepted set.
#[derive(Debug, Clone, Copy)]
pub struct RoleGate(pub &'static [Role]);

impl RoleGate {
    pub const APPROVERS: RoleGate = RoleGate(Role::APPROVERS);
    pub const ADMIN: RoleGate = RoleGate(Role::ADMIN_ONLY);

    pub fn allows(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn check(&self, user: Option<&AuthUser>) -> Result<(), AppError> {
        match user {
            None => Err(AppError::Unauthenticated),
            Some(user) if self.allows(user.role) => Ok(()),
            Some(_) => Err(AppError::forbidden(self.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            department_id: None,
        }
    }

    #[rstest]
    #[case(RoleGate::APPROVERS, Role::Employee, false)]
    #[case(RoleGate::APPROVERS, Role::Manager, true)]
    #[case(RoleGate::APPROVERS, Role::Admin, true)]
    #[case(RoleGate::ADMIN, Role::Employee, false)]
    #[case(RoleGate::ADMIN, Role::Manager, false)]
    #[case(RoleGate::ADMIN, Role::Admin, true)]
    fn gate_decision_depends_only_on_role(
        #[case] gate: RoleGate,
        #[case] role: Role,
        #[case] allowed: bool,
    ) {
        let result = gate.check(Some(&user(role)));
        assert_eq!(result.is_ok(), allowed);
        if !allowed {
            assert!(matches!(result, Err(AppError::Forbidden { .. })));
        }
    }

    #[test]
    fn anonymous_caller_is_unauthenticated() {
        assert!(matches!(
            RoleGate::ADMIN.check(None),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn forbidden_names_accepted_roles() {
        match RoleGate::APPROVERS.check(Some(&user(Role::Employee))) {
            Err(AppError::Forbidden { allowed }) => {
                assert_eq!(allowed, vec![Role::Manager, Role::Admin])
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
