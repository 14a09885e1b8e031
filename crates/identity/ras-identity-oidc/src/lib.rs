//! OpenID Connect relying party with CSRF and parameter injection hardening.
//!
//! This crate implements the Authorization Code flow with PKCE. Each outbound
//! authentication request is bound to its inbound response by a one way hash of
//! the request id (held in the `origination` cookie) and the caller's session
//! id, carried through the provider in `state`. The PKCE verifier is derived
//! from the same secure values, so nothing has to be stored between the
//! redirect and the code exchange.
//!
//! The flow is:
//!
//! 1. [`OidcClient::authentication_request_uri`] builds the redirect.
//! 2. [`OidcClient::parse_response`] reads the callback into [`ResponseClaims`].
//! 3. [`OidcClient::get_tokens`] verifies the request hash and exchanges the code.

mod claims;
mod client;
mod config;
mod cookies;
mod error;
mod exchange;
mod hash;
mod jwt;
mod pkce;
mod provider;
mod request;
mod response;
mod secrets;


pub use claims::{
    AppleIdentityTokenClaims, BoolOrString, GoogleIdentityTokenClaims, OidcIdentityTokenClaims,
    get_authed_claims_from_identity_token, narrow_identity_token_claims,
};
pub use client::{OidcClient, OperatorCredentials, get_tokens_from_response_claims, new_request_id};
pub use config::OidcConfig;
pub use cookies::{
    AUTHORIZATION_COOKIE, ORIGINATION_COOKIE, SessionAudience,
    extract_request_id_from_origination_cookie, extract_session_id_from_authorization_cookie,
    find_cookie,
};
pub use error::{OidcError, OidcErrorKind, OidcResult, REDACTED};
pub use exchange::{OidcTokens, TokenExchangeRequest, exchange_code_for_tokens};
pub use hash::{compute_request_hash, verify_request_hash};
pub use jwt::{
    JwksVerifier, SharedSecretVerifier, TokenAudience, TokenClaims, TokenVerifier,
    decode_unverified, is_expired,
};
pub use pkce::{
    CODE_CHALLENGE_METHOD, PkceChallenge, compute_pkce_code_challenge, compute_pkce_code_verifier,
};
pub use provider::{OidcIdentityProvider, ProviderEndpoints};
pub use request::{
    AuthenticationRequest, AuthorizationOperator, AuthorizationProvider,
    build_authentication_request_uri,
};
pub use response::{
    AuthenticationCallback, PublicClaims, ResponseClaims, ResponseParameters, SecureClaims,
    parse_authentication_response, parse_response_body, parse_response_query_params,
};
pub use secrets::{AppleClientSecretClaims, AppleClientSecretInput, compute_client_secret_for_apple};
