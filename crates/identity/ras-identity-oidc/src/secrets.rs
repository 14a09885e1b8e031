//! Client secret computation for Sign in with Apple.
//!
//! Apple does not issue static client secrets; the relying party signs a short
//! lived ES256 JWT with its developer key instead.

use crate::error::{OidcError, OidcResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

const APPLE_AUDIENCE: &str = "https://appleid.apple.com";
const APPLE_CLIENT_SECRET_TTL_SECONDS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleClientSecretClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
    pub sub: String,
}

#[derive(Debug, Clone)]
pub struct AppleClientSecretInput {
    pub developer_team_id: String,
    pub client_id: String,
    pub private_key_id: String,
    /// PKCS#8 PEM encoded P-256 private key downloaded from the Apple developer portal.
    pub private_key_pem: String,
}

/// Sign a fresh client secret. Generate on demand, they expire after ten minutes.
pub fn compute_client_secret_for_apple(input: &AppleClientSecretInput) -> OidcResult<String> {
    let now = Utc::now();

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(input.private_key_id.clone());

    let claims = AppleClientSecretClaims {
        iss: input.developer_team_id.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(APPLE_CLIENT_SECRET_TTL_SECONDS)).timestamp(),
        aud: APPLE_AUDIENCE.to_string(),
        sub: input.client_id.clone(),
    };

    let key = EncodingKey::from_ec_pem(input.private_key_pem.as_bytes())
        .map_err(|e| OidcError::ConfigError(format!("invalid apple private key: {}", e)))?;
    encode(&header, &claims, &key)
        .map_err(|e| OidcError::ConfigError(format!("failed to sign apple client secret: {}", e)))
}
