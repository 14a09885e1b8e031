//! Provider specific identity token claims.

use crate::error::{OidcError, OidcResult};
use crate::jwt::{TokenAudience, TokenVerifier};
use crate::provider::OidcIdentityProvider;
use serde::{Deserialize, Serialize};

/// Apple sends some booleans as `"true"`/`"false"` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoolOrString {
    Bool(bool),
    String(String),
}

impl BoolOrString {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::String(value) => value.parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleIdentityTokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<BoolOrString>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub locale: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppleIdentityTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub nonce: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<BoolOrString>,
    pub is_private_email: Option<BoolOrString>,
}

/// Verified identity token claims, narrowed by the issuer that signed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum OidcIdentityTokenClaims {
    Google(GoogleIdentityTokenClaims),
    Apple(AppleIdentityTokenClaims),
}

impl OidcIdentityTokenClaims {
    pub fn provider(&self) -> OidcIdentityProvider {
        match self {
            Self::Google(_) => OidcIdentityProvider::Google,
            Self::Apple(_) => OidcIdentityProvider::Apple,
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            Self::Google(claims) => &claims.sub,
            Self::Apple(claims) => &claims.sub,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Google(claims) => claims.email.as_deref(),
            Self::Apple(claims) => claims.email.as_deref(),
        }
    }
}

/// Verify an identity token issued by `provider` for `client_id` and narrow its claims.
pub async fn get_authed_claims_from_identity_token<V>(
    verifier: &V,
    token: &str,
    provider: OidcIdentityProvider,
    client_id: &str,
) -> OidcResult<OidcIdentityTokenClaims>
where
    V: TokenVerifier + ?Sized,
{
    let mut audience = TokenAudience::new(provider.issuer(), client_id);
    audience.jwks_uri = provider.jwks_endpoint().map(String::from);

    let claims = verifier.verify_and_decode(token, &audience).await?;
    narrow_identity_token_claims(provider, claims)
}

/// Pick the claims shape for `provider`, checking the verified issuer matches.
pub fn narrow_identity_token_claims(
    provider: OidcIdentityProvider,
    claims: crate::jwt::TokenClaims,
) -> OidcResult<OidcIdentityTokenClaims> {
    let issuer = claims
        .get("iss")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    let unexpected = || OidcError::UnexpectedClaims {
        provider: provider.to_string(),
        issuer: issuer.clone(),
    };

    if OidcIdentityProvider::from_issuer(&issuer) != Some(provider) {
        return Err(unexpected());
    }

    let claims = serde_json::Value::Object(claims);
    match provider {
        OidcIdentityProvider::Google => serde_json::from_value(claims)
            .map(OidcIdentityTokenClaims::Google)
            .map_err(|_| unexpected()),
        OidcIdentityProvider::Apple => serde_json::from_value(claims)
            .map(OidcIdentityTokenClaims::Apple)
            .map_err(|_| unexpected()),
        OidcIdentityProvider::Facebook => Err(unexpected()),
    }
}
