use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{Caller, JwtClaims, Role};

type HmacSha256 = Hmac<Sha256>;

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Caller, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };
    mac.update(signing_input.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid subject".to_string())?;

    // Tokens without a role claim belong to patients.
    let role = match claims.role.as_deref() {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::User,
    };

    let issued_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let caller = Caller {
        id,
        email: claims.email,
        role,
        issued_at,
    };

    debug!("Token validated successfully for user: {}", caller.id);
    Ok(caller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

    #[test]
    fn valid_token_yields_caller() {
        let user = TestUser::staff("desk@example.com");
        let token = JwtTestUtils::create_test_token(&user, SECRET, Some(1));

        let caller = validate_token(&token, SECRET).unwrap();
        assert_eq!(caller.id, user.id);
        assert_eq!(caller.role, Role::Staff);
        assert_eq!(caller.email.as_deref(), Some("desk@example.com"));
    }

    #[test]
    fn expired_and_tampered_tokens_are_rejected() {
        let user = TestUser::default();

        let expired = JwtTestUtils::create_expired_token(&user, SECRET);
        assert_eq!(validate_token(&expired, SECRET).unwrap_err(), "Token expired");

        let forged = JwtTestUtils::create_invalid_signature_token(&user);
        assert_eq!(validate_token(&forged, SECRET).unwrap_err(), "Invalid token signature");

        let malformed = JwtTestUtils::create_malformed_token();
        assert!(validate_token(&malformed, SECRET).is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        let token = JwtTestUtils::create_test_token(&TestUser::default(), SECRET, None);
        assert!(validate_token(&token, "").is_err());
    }
}
