use actix_web::error::{ErrorForbidden, ErrorUnauthorized};
use actix_web::{Error, HttpRequest};

use super::jwt::validate_token;
use super::model::{Claims, UserRole};
use crate::nfe::models::CarrierScope;

/// Sentinel an admin may pass to list across every carrier.
pub const ALL_CARRIERS: &str = "ALL";

/// Extract token from Authorization header
fn extract_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer ").map(str::to_string))
}

/// Validate token from HttpRequest and return claims
pub fn validate_request_token(req: &HttpRequest) -> Result<Claims, Error> {
    let token =
        extract_token(req).ok_or_else(|| ErrorUnauthorized("Missing authorization token"))?;

    let claims = validate_token(&token).map_err(|e| {
        log::warn!("Token validation failed: {:?}", e);
        ErrorUnauthorized("Invalid or expired token")
    })?;

    Ok(claims)
}

/// Reject non-admin callers.
pub fn require_admin(claims: &Claims) -> Result<(), Error> {
    if claims.role != UserRole::Admin {
        return Err(ErrorForbidden("Admin role required"));
    }
    Ok(())
}

/// Resolve the document visibility scope for a request.
///
/// Carrier users are always locked to their own carrier, whatever they ask
/// for. Admins default to the `ALL` sentinel and may narrow to one carrier.
pub fn carrier_scope_for(claims: &Claims, requested: Option<&str>) -> Result<CarrierScope, Error> {
    match claims.role {
        UserRole::Admin => match requested {
            None => Ok(CarrierScope::All),
            Some(id) if id.eq_ignore_ascii_case(ALL_CARRIERS) || id.is_empty() => {
                Ok(CarrierScope::All)
            }
            Some(id) => Ok(CarrierScope::Carrier(id.to_string())),
        },
        UserRole::Carrier => claims
            .carrier_id
            .clone()
            .map(CarrierScope::Carrier)
            .ok_or_else(|| ErrorForbidden("User has no carrier assigned")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: UserRole, carrier_id: Option<&str>) -> Claims {
        Claims {
            sub: "u1".to_string(),
            email: "user@portal.com".to_string(),
            role,
            carrier_id: carrier_id.map(str::to_string),
            exp: 2_000_000_000,
            iat: 1_000_000_000,
        }
    }

    #[test]
    fn admin_defaults_to_all_and_may_narrow() {
        let admin = claims(UserRole::Admin, None);
        assert_eq!(carrier_scope_for(&admin, None).unwrap(), CarrierScope::All);
        assert_eq!(
            carrier_scope_for(&admin, Some("ALL")).unwrap(),
            CarrierScope::All
        );
        assert_eq!(
            carrier_scope_for(&admin, Some("c2")).unwrap(),
            CarrierScope::Carrier("c2".to_string())
        );
    }

    #[test]
    fn carrier_user_is_locked_to_own_scope() {
        let user = claims(UserRole::Carrier, Some("c1"));
        assert_eq!(
            carrier_scope_for(&user, Some("c2")).unwrap(),
            CarrierScope::Carrier("c1".to_string())
        );
        assert_eq!(
            carrier_scope_for(&user, Some("ALL")).unwrap(),
            CarrierScope::Carrier("c1".to_string())
        );
    }

    #[test]
    fn carrier_user_without_binding_is_rejected() {
        let user = claims(UserRole::Carrier, None);
        assert!(carrier_scope_for(&user, None).is_err());
    }

    #[test]
    fn non_admin_fails_admin_gate() {
        assert!(require_admin(&claims(UserRole::Carrier, Some("c1"))).is_err());
        assert!(require_admin(&claims(UserRole::Admin, None)).is_ok());
    }
}
