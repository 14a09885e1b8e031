//! Well known OIDC identity providers and their endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity providers this relying party knows how to talk to.
///
/// Every lookup below is an exhaustive `match`, so adding a variant without
/// its endpoints fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OidcIdentityProvider {
    Google,
    Apple,
    Facebook,
}

impl OidcIdentityProvider {
    pub const ALL: [OidcIdentityProvider; 3] = [Self::Google, Self::Apple, Self::Facebook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Apple => "apple",
            Self::Facebook => "facebook",
        }
    }

    // https://developers.google.com/identity/openid-connect/openid-connect
    // https://developer.apple.com/documentation/sign_in_with_apple
    // https://www.facebook.com/.well-known/openid-configuration/
    pub fn authorization_endpoint(&self) -> &'static str {
        match self {
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            Self::Apple => "https://appleid.apple.com/auth/authorize",
            Self::Facebook => "https://facebook.com/dialog/oauth/",
        }
    }

    pub fn token_endpoint(&self) -> &'static str {
        match self {
            Self::Google => "https://oauth2.googleapis.com/token",
            Self::Apple => "https://appleid.apple.com/auth/token",
            Self::Facebook => "https://graph.facebook.com/v17.0/oauth/token",
        }
    }

    pub fn issuer(&self) -> &'static str {
        match self {
            Self::Google => "https://accounts.google.com",
            Self::Apple => "https://appleid.apple.com",
            Self::Facebook => "https://www.facebook.com",
        }
    }

    /// Explicit JWKS location, for providers that do not support discovery of it.
    pub fn jwks_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::Google => Some("https://www.googleapis.com/oauth2/v3/certs"),
            Self::Apple => Some("https://appleid.apple.com/auth/keys"),
            Self::Facebook => None,
        }
    }

    pub fn from_issuer(issuer: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|provider| provider.issuer() == issuer)
    }

    pub fn endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            authorization_endpoint: self.authorization_endpoint().to_string(),
            token_endpoint: self.token_endpoint().to_string(),
            issuer: self.issuer().to_string(),
            jwks_endpoint: self.jwks_endpoint().map(String::from),
        }
    }
}

impl fmt::Display for OidcIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved endpoints for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub issuer: String,
    pub jwks_endpoint: Option<String>,
}
