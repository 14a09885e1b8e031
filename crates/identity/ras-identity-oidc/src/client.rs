//! OIDC client tying the request, response and exchange steps together.

use crate::claims::{OidcIdentityTokenClaims, get_authed_claims_from_identity_token};
use crate::config::OidcConfig;
use crate::error::{OidcError, OidcResult};
use crate::exchange::{OidcTokens, TokenExchangeRequest, exchange_code_for_tokens};
use crate::hash::{compute_request_hash, verify_request_hash};
use crate::jwt::TokenVerifier;
use crate::pkce::{PkceChallenge, compute_pkce_code_verifier};
use crate::provider::ProviderEndpoints;
use crate::request::{
    AuthenticationRequest, AuthorizationOperator, AuthorizationProvider,
    build_authentication_request_uri,
};
use crate::response::{AuthenticationCallback, ResponseClaims, parse_authentication_response};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Generate the request id stored in the `origination` cookie when a flow starts.
pub fn new_request_id() -> Uuid {
    Uuid::new_v4()
}

/// Credentials the relying party authenticates to the token endpoint with.
#[derive(Debug, Clone, Copy)]
pub struct OperatorCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

/// Exchange the code of a response for tokens, after verifying the response is ours.
///
/// The request hash check runs first and halts on mismatch; the PKCE verifier
/// is then recomputed from the same secure claims.
pub async fn get_tokens_from_response_claims(
    http_client: &Client,
    claims: &ResponseClaims,
    token_endpoint: &str,
    credentials: OperatorCredentials<'_>,
) -> OidcResult<OidcTokens> {
    let session_id = claims.secure.session_id.as_deref();

    verify_request_hash(
        &claims.public.request_hash,
        &claims.secure.request_id,
        session_id,
    )?;

    let pkce_code_verifier = compute_pkce_code_verifier(&claims.secure.request_id, session_id);

    exchange_code_for_tokens(
        http_client,
        &TokenExchangeRequest {
            endpoint: token_endpoint,
            response_code: &claims.public.response_code,
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            redirect_uri: &claims.public.redirect_uri,
            pkce_code_verifier: &pkce_code_verifier,
        },
    )
    .await
}

/// OIDC relying party client for a single provider registration
#[derive(Clone)]
pub struct OidcClient {
    http_client: Client,
    config: OidcConfig,
    endpoints: ProviderEndpoints,
}

impl OidcClient {
    pub fn new(config: OidcConfig) -> OidcResult<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.http_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http_client = builder.build()?;

        Self::with_http_client(config, http_client)
    }

    pub fn with_http_client(config: OidcConfig, http_client: Client) -> OidcResult<Self> {
        config.validate()?;
        let endpoints = config.endpoints();

        Ok(Self {
            http_client,
            config,
            endpoints,
        })
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Authorization URI for a flow started with `request_id`, bound to the
    /// caller's session if they have one.
    pub fn authentication_request_uri(
        &self,
        request_id: &Uuid,
        session_id: Option<&str>,
    ) -> OidcResult<String> {
        let pkce = PkceChallenge::for_request(request_id, session_id);

        build_authentication_request_uri(
            &AuthorizationProvider {
                authorization_endpoint: self.endpoints.authorization_endpoint.clone(),
            },
            &AuthorizationOperator {
                client_id: self.config.client_id.clone(),
            },
            &AuthenticationRequest {
                scope: self.config.scope.clone(),
                hash: compute_request_hash(request_id, session_id),
                pkce_challenge: pkce.code_challenge,
                redirect_uri: self.config.redirect_uri.clone(),
            },
        )
    }

    /// Parse an inbound callback, using `verifier` for the session cookie.
    pub async fn parse_response<V>(
        &self,
        callback: &AuthenticationCallback,
        verifier: &V,
    ) -> OidcResult<ResponseClaims>
    where
        V: TokenVerifier + ?Sized,
    {
        if callback.endpoint != self.config.redirect_uri {
            debug!(
                "Callback endpoint {} differs from configured redirect uri",
                callback.endpoint
            );
        }

        parse_authentication_response(callback, self.config.session.as_ref(), verifier).await
    }

    pub async fn get_tokens(&self, claims: &ResponseClaims) -> OidcResult<OidcTokens> {
        get_tokens_from_response_claims(
            &self.http_client,
            claims,
            &self.endpoints.token_endpoint,
            OperatorCredentials {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
            },
        )
        .await
    }

    /// Verify the identity token from [`OidcTokens`] and narrow its claims.
    pub async fn get_identity_claims<V>(
        &self,
        verifier: &V,
        tokens: &OidcTokens,
    ) -> OidcResult<OidcIdentityTokenClaims>
    where
        V: TokenVerifier + ?Sized,
    {
        let identity_token = tokens.identity.as_deref().ok_or_else(|| {
            OidcError::malformed("the token response did not include an `id_token`")
        })?;

        get_authed_claims_from_identity_token(
            verifier,
            identity_token,
            self.config.provider,
            &self.config.client_id,
        )
        .await
    }
}
