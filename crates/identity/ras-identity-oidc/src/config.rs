//! OIDC relying party configuration.

use crate::cookies::SessionAudience;
use crate::error::{OidcError, OidcResult};
use crate::provider::{OidcIdentityProvider, ProviderEndpoints};
use crate::request::scope_includes_openid;
use serde::{Deserialize, Serialize};

fn default_scope() -> String {
    "openid email".to_string()
}

/// Configuration for one relying party registered with one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    pub provider: OidcIdentityProvider,
    pub client_id: String,
    pub client_secret: String,
    /// Callback endpoint, byte for byte as registered with the provider
    pub redirect_uri: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Issuer/audience of the relying party's own session tokens, for binding
    /// flows started by signed in users
    #[serde(default)]
    pub session: Option<SessionAudience>,
    /// Overrides the well known endpoints of `provider`
    #[serde(default)]
    pub endpoints: Option<ProviderEndpoints>,
    /// No timeout unless set; callers usually bound the whole request instead
    #[serde(default)]
    pub http_timeout_seconds: Option<u64>,
}

impl OidcConfig {
    pub fn new(
        provider: OidcIdentityProvider,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scope: default_scope(),
            session: None,
            endpoints: None,
            http_timeout_seconds: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_session(mut self, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        self.session = Some(SessionAudience {
            issuer: issuer.into(),
            audience: audience.into(),
        });
        self
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = Some(seconds);
        self
    }

    /// Endpoints in effect: the override if set, else the provider's well known ones.
    pub fn endpoints(&self) -> ProviderEndpoints {
        self.endpoints
            .clone()
            .unwrap_or_else(|| self.provider.endpoints())
    }

    pub fn validate(&self) -> OidcResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(OidcError::ConfigError("client_id is required".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(OidcError::ConfigError(
                "client_secret is required".to_string(),
            ));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(OidcError::ConfigError(
                "redirect_uri is required".to_string(),
            ));
        }
        if !scope_includes_openid(&self.scope) {
            return Err(OidcError::ConfigError(
                "scope must include openid".to_string(),
            ));
        }
        Ok(())
    }
}
