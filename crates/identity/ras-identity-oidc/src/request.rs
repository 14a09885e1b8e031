//! Construction of the authentication request redirect.
//!
//! See <https://openid.net/specs/openid-connect-core-1_0.html#AuthRequest>.

use crate::error::{OidcError, OidcResult};
use crate::pkce::CODE_CHALLENGE_METHOD;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Only the authorization code grant is supported.
const RESPONSE_TYPE: &str = "code";

/// Required by Apple, accepted by the others.
const RESPONSE_MODE: &str = "form_post";

/// The provider side of the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationProvider {
    pub authorization_endpoint: String,
}

/// The relying party making the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationOperator {
    pub client_id: String,
}

/// Request specific values for one authentication request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationRequest {
    /// Space separated scopes, which must include `openid`.
    pub scope: String,
    /// Request hash echoed back by the provider inside `state`.
    pub hash: String,
    /// PKCE `S256` code challenge.
    pub pkce_challenge: String,
    pub redirect_uri: String,
}

pub fn scope_includes_openid(scope: &str) -> bool {
    scope.split(' ').any(|token| token == "openid")
}

/// Build the authorization URI the user agent is redirected to.
///
/// Fails if `scope` does not include `openid`, since identity token issuance
/// is unspecified without it.
pub fn build_authentication_request_uri(
    provider: &AuthorizationProvider,
    operator: &AuthorizationOperator,
    request: &AuthenticationRequest,
) -> OidcResult<String> {
    if !scope_includes_openid(&request.scope) {
        return Err(OidcError::InvalidRequest(
            "scope must include openid".to_string(),
        ));
    }

    let mut url = Url::parse(&provider.authorization_endpoint)?;

    // nested so that state can grow into a composite payload
    let state = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("hash", &request.hash)
        .finish();

    url.query_pairs_mut()
        .append_pair("client_id", &operator.client_id)
        .append_pair("response_type", RESPONSE_TYPE)
        .append_pair("code_challenge", &request.pkce_challenge)
        .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
        .append_pair("scope", &request.scope)
        .append_pair("redirect_uri", &request.redirect_uri)
        .append_pair("state", &state)
        .append_pair("response_mode", RESPONSE_MODE);

    debug!(
        "Generated authentication request uri for {}",
        provider.authorization_endpoint
    );

    Ok(url.to_string())
}
