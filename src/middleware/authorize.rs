use crate::errors::ApiError;
use crate::models::auth::AuthenticatedUser;
use crate::models::user::Role;

/// Role check for a route. Runs after authentication; enforcement is
/// symmetric, so an admin is rejected from user-only routes just as a user is
/// rejected from admin routes.
pub fn require_role(user: &AuthenticatedUser, required: Role) -> Result<(), ApiError> {
    if user.role != required {
        return Err(ApiError::forbidden("Forbidden"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn identity(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            account_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn matching_role_passes() {
        assert!(require_role(&identity(Role::Admin), Role::Admin).is_ok());
        assert!(require_role(&identity(Role::User), Role::User).is_ok());
    }

    #[test]
    fn mismatched_role_is_forbidden_in_both_directions() {
        assert!(matches!(
            require_role(&identity(Role::User), Role::Admin).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            require_role(&identity(Role::Admin), Role::User).unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }
}
