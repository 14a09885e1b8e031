//! Extraction of the secure claims from request cookies.
//!
//! Cookie names are matched exactly and only at a pair boundary: a cookie
//! named `Origination` or `attackerorigination` is never taken for
//! `origination`.

use crate::error::{OidcError, OidcResult};
use crate::jwt::{TokenAudience, TokenVerifier, is_expired};
use http::HeaderMap;
use http::header::COOKIE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Cookie holding the request id set when the flow started.
pub const ORIGINATION_COOKIE: &str = "origination";

/// Cookie holding the caller's existing session token, if any.
pub const AUTHORIZATION_COOKIE: &str = "authorization";

/// Issuer and audience the relying party's own session tokens are minted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAudience {
    pub issuer: String,
    pub audience: String,
}

/// Join every `cookie` header into one cookie string.
///
/// `HeaderMap` lookups are case insensitive on the header name. Values are read
/// as raw bytes: a sibling cookie carrying non-ASCII text must not hide the rest
/// of the header.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<String> = headers
        .get_all(COOKIE)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .filter(|value| !value.trim().is_empty())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

/// Find the first cookie whose name is exactly `name`.
pub fn find_cookie<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies
        .split(';')
        .map(|pair| pair.trim_start())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_end())
}

/// Extract the request id from the `origination` cookie.
///
/// No cookie header at all is a malformed request. A cookie header without a
/// correctly named `origination` cookie, or one holding anything but a UUID,
/// is treated as a potential attack.
pub fn extract_request_id_from_origination_cookie(headers: &HeaderMap) -> OidcResult<Uuid> {
    let cookies = cookie_header(headers)
        .ok_or_else(|| OidcError::malformed("no `cookies` were provided in the headers"))?;

    let Some(origination) =
        find_cookie(&cookies, ORIGINATION_COOKIE).filter(|value| !value.is_empty())
    else {
        warn!("oidc callback carried cookies but no `origination` cookie");
        return Err(OidcError::potential_attack(
            "no `origination` cookie was found",
        ));
    };

    match Uuid::parse_str(origination) {
        // only the canonical hyphenated form is ever issued
        Ok(request_id) if origination.len() == 36 => Ok(request_id),
        _ => {
            warn!("oidc callback `origination` cookie is not a uuid");
            Err(OidcError::potential_attack_with(
                "the `origination` cookie does not contain a valid uuid",
                serde_json::json!({ "origination": origination }),
            ))
        }
    }
}

pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = cookie_header(headers)?;
    let value = find_cookie(&cookies, AUTHORIZATION_COOKIE)?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Extract the session id (`jti`) from the `authorization` cookie, if a live session exists.
///
/// Absent and expired tokens yield `None`. A live token that fails
/// verification propagates that failure.
pub async fn extract_session_id_from_authorization_cookie<V>(
    headers: &HeaderMap,
    session: &SessionAudience,
    verifier: &V,
) -> OidcResult<Option<String>>
where
    V: TokenVerifier + ?Sized,
{
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    // logged out, never logged back in, cookie not removed
    if is_expired(&token) {
        debug!("Ignoring expired session token on oidc callback");
        return Ok(None);
    }

    let audience = TokenAudience::new(&session.issuer, &session.audience);
    let claims = verifier.verify_and_decode(&token, &audience).await?;

    match claims.get("jti").and_then(serde_json::Value::as_str) {
        Some(jti) if !jti.is_empty() => Ok(Some(jti.to_string())),
        _ => Err(OidcError::malformed_with(
            "no `jti` found on the authorization token",
            // claims of a verified token are not secret
            serde_json::Value::Object(claims),
        )),
    }
}
