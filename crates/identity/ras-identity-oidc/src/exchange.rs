//! Authorization code for token exchange.

use crate::error::{OidcError, OidcResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Tokens returned by the identity provider.
///
/// Both are opaque here. A provider may omit either, so both are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcTokens {
    pub access: Option<String>,
    pub identity: Option<String>,
}

/// Inputs to one token exchange.
#[derive(Debug, Clone)]
pub struct TokenExchangeRequest<'a> {
    pub endpoint: &'a str,
    pub response_code: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
    pub pkce_code_verifier: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    id_token: Option<String>,
}

/// Exchange an authorization code for tokens (RFC 6749 section 4.1.3, RFC 7636 section 4.5).
///
/// Any non 2xx reply fails with the provider's status and body. Codes are single
/// use, so nothing is retried.
pub async fn exchange_code_for_tokens(
    http_client: &Client,
    request: &TokenExchangeRequest<'_>,
) -> OidcResult<OidcTokens> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", request.response_code),
        ("client_id", request.client_id),
        ("client_secret", request.client_secret),
        ("redirect_uri", request.redirect_uri),
        ("code_verifier", request.pkce_code_verifier),
    ];

    let response = http_client
        .post(request.endpoint)
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = error_body(response.text().await);
        error!(status = status.as_u16(), "Token exchange failed");
        return Err(OidcError::TokenExchangeFailed {
            status: status.as_u16(),
            body,
        });
    }

    let token_response: TokenEndpointResponse = response.json().await?;

    info!("Successfully exchanged code for tokens");
    Ok(OidcTokens {
        access: token_response.access_token,
        identity: token_response.id_token,
    })
}

/// Body reported for a failed exchange; a body that could not be read is described, not dropped.
fn error_body(body: reqwest::Result<String>) -> String {
    match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to read token endpoint error body: {}", e);
            format!("<unreadable response body: {}>", e)
        }
    }
}
