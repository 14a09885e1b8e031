//! JWT verification capability.
//!
//! Signature, issuer, audience and expiry checks are delegated to implementors
//! of [`TokenVerifier`]. Two implementations are provided: a JWKS backed one
//! for provider issued identity tokens and a shared secret one for first party
//! session tokens.

use crate::error::{OidcError, OidcResult};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decoded JWT claims.
pub type TokenClaims = serde_json::Map<String, serde_json::Value>;

/// Who a token must have been issued by and for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAudience {
    pub issuer: String,
    pub audience: String,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

impl TokenAudience {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_uri: None,
        }
    }

    pub fn with_jwks_uri(mut self, jwks_uri: impl Into<String>) -> Self {
        self.jwks_uri = Some(jwks_uri.into());
        self
    }
}

/// Verifies a token's signature, issuer, audience and expiry.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_and_decode(&self, token: &str, audience: &TokenAudience)
    -> OidcResult<TokenClaims>;
}

/// Decode claims without checking the signature or any registered claim.
pub fn decode_unverified(token: &str) -> OidcResult<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(token_data.claims)
}

/// Whether the token's `exp` lies in the past.
///
/// A token that cannot be decoded is not reported as expired, so that the
/// subsequent verification surfaces it.
pub fn is_expired(token: &str) -> bool {
    decode_unverified(token)
        .ok()
        .and_then(|claims| claims.get("exp").and_then(serde_json::Value::as_f64))
        .is_some_and(|exp| (exp as i64) < Utc::now().timestamp())
}

fn validation_for(algorithm: Algorithm, audience: &TokenAudience) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.set_issuer(&[audience.issuer.as_str()]);
    validation.set_audience(&[audience.audience.as_str()]);
    validation
}

/// Verifies HMAC signed tokens, e.g. the relying party's own session tokens.
#[derive(Clone)]
pub struct SharedSecretVerifier {
    secret: String,
    algorithm: Algorithm,
}

impl SharedSecretVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

#[async_trait]
impl TokenVerifier for SharedSecretVerifier {
    async fn verify_and_decode(
        &self,
        token: &str,
        audience: &TokenAudience,
    ) -> OidcResult<TokenClaims> {
        let token_data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation_for(self.algorithm, audience),
        )?;

        Ok(token_data.claims)
    }
}

/// Verifies asymmetrically signed tokens against the issuer's published JWK set.
#[derive(Clone, Default)]
pub struct JwksVerifier {
    http_client: Client,
}

impl JwksVerifier {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    async fn fetch_jwks(&self, jwks_uri: &str) -> OidcResult<JwkSet> {
        let jwks = self
            .http_client
            .get(jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;

        debug!("Fetched {} keys from {}", jwks.keys.len(), jwks_uri);
        Ok(jwks)
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify_and_decode(
        &self,
        token: &str,
        audience: &TokenAudience,
    ) -> OidcResult<TokenClaims> {
        let header = decode_header(token)?;
        if matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(OidcError::TokenVerification(
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm.into(),
            ));
        }

        let jwks_uri = match &audience.jwks_uri {
            Some(uri) => uri.clone(),
            None => format!(
                "{}/.well-known/jwks.json",
                audience.issuer.trim_end_matches('/')
            ),
        };
        let jwks = self.fetch_jwks(&jwks_uri).await?;

        let jwk = match header.kid.as_deref() {
            Some(kid) => jwks.find(kid),
            None if jwks.keys.len() == 1 => jwks.keys.first(),
            None => None,
        }
        .ok_or_else(|| {
            OidcError::JwksError(format!(
                "no key in {} matches kid {:?}",
                jwks_uri, header.kid
            ))
        })?;

        let key = DecodingKey::from_jwk(jwk)?;
        let token_data = decode::<TokenClaims>(token, &key, &validation_for(header.alg, audience))?;

        Ok(token_data.claims)
    }
}
