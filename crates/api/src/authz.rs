//! Role guard and birth-id ownership checks applied by handlers.

use evax_auth::{Role, require_role};
use evax_core::BirthId;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Reject the request unless the caller holds `role`.
pub fn require(principal: &PrincipalContext, role: Role) -> Result<(), ApiError> {
    require_role(principal.role(), &[role])?;
    Ok(())
}

/// Resolve the birth id a citizen acts on.
///
/// Defaults to the citizen's own; any other birth id is forbidden.
pub fn scope_birth_id(own: &BirthId, requested: Option<&str>) -> Result<BirthId, ApiError> {
    let Some(raw) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(own.clone());
    };
    let requested = BirthId::parse(raw)?;
    if &requested != own {
        return Err(ApiError::Forbidden(
            "you may only access your own vaccine records".into(),
        ));
    }
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn own() -> BirthId {
        BirthId::parse("2024000001").unwrap()
    }

    #[test]
    fn birth_id_defaults_to_own() {
        assert_eq!(scope_birth_id(&own(), None).unwrap(), own());
        assert_eq!(scope_birth_id(&own(), Some("  ")).unwrap(), own());
        assert_eq!(scope_birth_id(&own(), Some("2024000001")).unwrap(), own());
    }

    #[test]
    fn foreign_birth_id_is_forbidden() {
        let err = scope_birth_id(&own(), Some("2024000002")).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn role_guard() {
        let staff = PrincipalContext::new(Uuid::now_v7(), Role::Staff);
        assert!(require(&staff, Role::Staff).is_ok());
        assert!(matches!(require(&staff, Role::Admin), Err(ApiError::Forbidden(_))));
    }
}
