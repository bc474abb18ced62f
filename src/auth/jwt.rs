use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::env;

use super::model::{Claims, User};

const DEFAULT_JWT_SECRET: &str = "carrier-portal-jwt-secret-change-in-production";
const ACCESS_TOKEN_EXPIRY_SECONDS: i64 = 8 * 60 * 60; // one work shift

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        log::warn!("JWT_SECRET not set, using default secret. SET THIS IN PRODUCTION!");
        DEFAULT_JWT_SECRET.to_string()
    })
}

/// Generate an access token carrying the user's role and carrier binding.
pub fn generate_access_token(user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        carrier_id: user.carrier_id.clone(),
        exp: now + ACCESS_TOKEN_EXPIRY_SECONDS as usize,
        iat: now,
    };

    let secret = get_jwt_secret();
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate and decode a token
pub fn validate_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let secret = get_jwt_secret();
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Get access token expiry in seconds
pub fn get_access_token_expiry() -> i64 {
    ACCESS_TOKEN_EXPIRY_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::model::UserRole;

    fn carrier_user() -> User {
        User {
            id: "u2".to_string(),
            name: "Operador TransRapido".to_string(),
            email: "user@transrapido.com".to_string(),
            role: UserRole::Carrier,
            carrier_id: Some("c1".to_string()),
            password_hash: "irrelevant".to_string(),
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let token = generate_access_token(&carrier_user()).unwrap();
        let claims = validate_token(&token).unwrap();

        assert_eq!(claims.sub, "u2");
        assert_eq!(claims.email, "user@transrapido.com");
        assert_eq!(claims.role, UserRole::Carrier);
        assert_eq!(claims.carrier_id.as_deref(), Some("c1"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(validate_token("not-a-token").is_err());
    }
}
