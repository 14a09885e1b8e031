//! OIDC error types.

use thiserror::Error;

pub type OidcResult<T> = Result<T, OidcError>;

/// Placeholder substituted for authorization codes in diagnostic metadata.
pub const REDACTED: &str = "__REDACTED__";

#[derive(Debug, Error)]
pub enum OidcError {
    /// The inbound response did not have the expected shape.
    #[error("oidc authentication response was malformed. {reason}{}", render_metadata(.metadata))]
    ResponseMalformed {
        reason: String,
        metadata: Option<serde_json::Value>,
    },

    /// The inbound response was well formed but inconsistent with an honest flow.
    #[error("a potential oidc attack was detected! {reason}{}", render_metadata(.metadata))]
    PotentialAttack {
        reason: String,
        metadata: Option<serde_json::Value>,
    },

    #[error("Token verification failed: {0}")]
    TokenVerification(#[from] jsonwebtoken::errors::Error),

    #[error("unsuccessful response from oidc identity provider: status {status}, body {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid authentication request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("unexpected claims for oidc identity token of provider {provider} (issuer {issuer})")]
    UnexpectedClaims { provider: String, issuer: String },

    #[error("JWKS error: {0}")]
    JwksError(String),
}

/// Coarse classification callers use to decide how to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidcErrorKind {
    /// Reject the request as a client error.
    Malformed,
    /// Halt and treat as a security incident.
    PotentialAttack,
    /// The provider or the network failed; fatal to the current flow.
    Transport,
    /// The relying party itself is misconfigured.
    Configuration,
}

impl OidcError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::ResponseMalformed {
            reason: reason.into(),
            metadata: None,
        }
    }

    pub fn malformed_with(reason: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self::ResponseMalformed {
            reason: reason.into(),
            metadata: Some(metadata),
        }
    }

    pub fn potential_attack(reason: impl Into<String>) -> Self {
        Self::PotentialAttack {
            reason: reason.into(),
            metadata: None,
        }
    }

    pub fn potential_attack_with(reason: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self::PotentialAttack {
            reason: reason.into(),
            metadata: Some(metadata),
        }
    }

    pub fn kind(&self) -> OidcErrorKind {
        match self {
            Self::ResponseMalformed { .. } => OidcErrorKind::Malformed,
            // a present-but-invalid token is as suspicious as a forged response
            Self::PotentialAttack { .. } | Self::TokenVerification(_) => {
                OidcErrorKind::PotentialAttack
            }
            Self::TokenExchangeFailed { .. } | Self::HttpError(_) | Self::JwksError(_) => {
                OidcErrorKind::Transport
            }
            Self::UrlError(_)
            | Self::InvalidRequest(_)
            | Self::ConfigError(_)
            | Self::UnexpectedClaims { .. } => OidcErrorKind::Configuration,
        }
    }

    pub fn is_potential_attack(&self) -> bool {
        self.kind() == OidcErrorKind::PotentialAttack
    }

    /// Diagnostic metadata attached to malformed or attack errors.
    pub fn metadata(&self) -> Option<&serde_json::Value> {
        match self {
            Self::ResponseMalformed { metadata, .. } | Self::PotentialAttack { metadata, .. } => {
                metadata.as_ref()
            }
            _ => None,
        }
    }
}

fn render_metadata(metadata: &Option<serde_json::Value>) -> String {
    match metadata {
        Some(value) => match serde_json::to_string_pretty(value) {
            Ok(rendered) => format!("\n\n{}", rendered),
            Err(_) => String::new(),
        },
        None => String::new(),
    }
}
