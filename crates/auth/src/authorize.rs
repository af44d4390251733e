use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{actual}' may not perform this operation")]
    Forbidden { actual: Role },
}

/// Pure role check. No IO, no panics.
pub fn require_role(actual: Role, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&actual) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_listed_roles_only() {
        assert!(require_role(Role::Admin, &[Role::Admin]).is_ok());
        assert!(require_role(Role::Staff, &[Role::Admin, Role::Staff]).is_ok());
        assert_eq!(
            require_role(Role::Citizen, &[Role::Staff]),
            Err(AuthzError::Forbidden { actual: Role::Citizen })
        );
    }
}
