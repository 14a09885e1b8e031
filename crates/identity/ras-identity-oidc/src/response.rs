//! Parsing of the authentication response delivered to the callback endpoint.

use crate::cookies::{
    SessionAudience, extract_request_id_from_origination_cookie,
    extract_session_id_from_authorization_cookie, session_token,
};
use crate::error::{OidcError, OidcResult, REDACTED};
use crate::jwt::TokenVerifier;
use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Form post bodies arrive base64url encoded, with or without padding.
const FORM_POST_BODY: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Values the identity provider returned over a channel an attacker can also influence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicClaims {
    pub response_code: String,
    pub request_hash: String,
    pub redirect_uri: String,
}

/// Values only readable from cookies an attacker cannot set cross-origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureClaims {
    pub request_id: Uuid,
    pub session_id: Option<String>,
}

/// Everything known about one authentication response.
///
/// Nothing in here may be trusted for a token exchange until the request hash
/// has been verified against the secure claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseClaims {
    pub public: PublicClaims,
    pub secure: SecureClaims,
}

/// The inbound callback request, as received by the relying party.
#[derive(Debug, Clone)]
pub struct AuthenticationCallback {
    pub method: Method,
    /// The callback URI exactly as sent to the provider as `redirect_uri`.
    pub endpoint: String,
    pub headers: HeaderMap,
    pub query_params: Option<HashMap<String, String>>,
    pub body: Option<String>,
}

/// `code` and `hash` as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseParameters {
    pub response_code: String,
    pub request_hash: String,
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn redacted(params: &HashMap<String, String>) -> serde_json::Value {
    let mut params = params.clone();
    if params.contains_key("code") {
        params.insert("code".to_string(), REDACTED.to_string());
    }
    serde_json::json!(params)
}

/// Extract `code`, `state` and the `hash` within `state`.
///
/// `source` names where the parameters came from, for the error message.
fn extract_parameters(
    params: &HashMap<String, String>,
    source: &str,
    metadata_key: &str,
) -> OidcResult<ResponseParameters> {
    let Some(response_code) = non_empty(params, "code") else {
        return Err(OidcError::malformed_with(
            format!(
                "the `code` parameter was missing from the authentication response {}",
                source
            ),
            serde_json::json!({ metadata_key: redacted(params) }),
        ));
    };

    let Some(state) = non_empty(params, "state") else {
        return Err(OidcError::malformed_with(
            format!(
                "the `state` parameter was missing from the authentication response {}",
                source
            ),
            serde_json::json!({ metadata_key: redacted(params) }),
        ));
    };

    let parsed_state: HashMap<String, String> = url::form_urlencoded::parse(state.as_bytes())
        .into_owned()
        .collect();
    let Some(request_hash) = non_empty(&parsed_state, "hash") else {
        return Err(OidcError::malformed_with(
            format!(
                "the `hash` was missing from the parsed output of the `state` parameter of the authentication response {}",
                source
            ),
            serde_json::json!({ "state": state, "parsedState": parsed_state }),
        ));
    };

    Ok(ResponseParameters {
        response_code: response_code.to_string(),
        request_hash: request_hash.to_string(),
    })
}

/// Parse a `GET` callback, where the parameters are in the query string.
pub fn parse_response_query_params(
    query_params: &HashMap<String, String>,
) -> OidcResult<ResponseParameters> {
    extract_parameters(query_params, "query params", "queryParams")
}

/// Parse a `POST` callback (`response_mode=form_post`), where the parameters
/// are in a base64url encoded, form encoded body.
pub fn parse_response_body(body: &str) -> OidcResult<ResponseParameters> {
    let decoded = FORM_POST_BODY
        .decode(body.trim())
        .map_err(|e| OidcError::malformed(format!("the body is not valid base64url: {}", e)))?;

    let parsed: HashMap<String, String> = url::form_urlencoded::parse(&decoded)
        .into_owned()
        .collect();

    extract_parameters(&parsed, "body", "parsed")
}

/// Parse the callback into the full set of response claims.
///
/// Secure claims come from cookies, public claims from the wire, and the
/// redirect uri is recorded verbatim from the callback endpoint. Without a
/// `session` audience every flow is treated as anonymous.
pub async fn parse_authentication_response<V>(
    callback: &AuthenticationCallback,
    session: Option<&SessionAudience>,
    verifier: &V,
) -> OidcResult<ResponseClaims>
where
    V: TokenVerifier + ?Sized,
{
    let request_id = extract_request_id_from_origination_cookie(&callback.headers)?;
    let session_id = match session {
        Some(session) => {
            extract_session_id_from_authorization_cookie(&callback.headers, session, verifier)
                .await?
        }
        None => {
            if session_token(&callback.headers).is_some() {
                warn!(
                    "oidc callback carried an `authorization` cookie but no session audience is configured; treating the flow as anonymous"
                );
            }
            None
        }
    };

    let parameters = match callback.method {
        Method::GET => {
            let query_params = callback.query_params.as_ref().ok_or_else(|| {
                OidcError::malformed("query params must be defined for a get request")
            })?;
            parse_response_query_params(query_params)?
        }
        Method::POST => {
            let body = callback
                .body
                .as_deref()
                .filter(|body| !body.is_empty())
                .ok_or_else(|| OidcError::malformed("body must be defined for a post request"))?;
            parse_response_body(body)?
        }
        ref other => {
            return Err(OidcError::malformed_with(
                "this method is not supported",
                serde_json::json!({ "method": other.as_str() }),
            ));
        }
    };

    debug!(
        method = %callback.method,
        anonymous = session_id.is_none(),
        "Parsed oidc authentication response"
    );

    Ok(ResponseClaims {
        public: PublicClaims {
            response_code: parameters.response_code,
            request_hash: parameters.request_hash,
            redirect_uri: callback.endpoint.clone(),
        },
        secure: SecureClaims {
            request_id,
            session_id,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::SharedSecretVerifier;
    use crate::tests::support::TEST_SESSION_SECRET;
    use base64::engine::general_purpose::{URL_SAFE as URL_SAFE_PADDED, URL_SAFE_NO_PAD};
    use http::HeaderValue;
    use std::sync::{Arc, Mutex};

    const REQUEST_ID: &str = "0e0b6f1a-8d3c-4b5a-9f2e-7c6d5b4a3f21";

    fn state_for(hash: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("hash", hash)
            .finish()
    }

    fn form_body(pairs: &[(&str, &str)]) -> String {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        URL_SAFE_NO_PAD.encode(form)
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn callback(method: Method) -> AuthenticationCallback {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::COOKIE,
            HeaderValue::from_str(&format!("origination={}", REQUEST_ID)).unwrap(),
        );
        AuthenticationCallback {
            method,
            endpoint: "https://app.example.com/oidc/callback".to_string(),
            headers,
            query_params: None,
            body: None,
        }
    }

    fn session() -> SessionAudience {
        SessionAudience {
            issuer: "https://api.example.com".to_string(),
            audience: "example-web".to_string(),
        }
    }

    #[test]
    fn test_query_params_round_trip() {
        let state = state_for("orh_abc");
        let params = parse_response_query_params(&query(&[
            ("code", "4/0Ab-code"),
            ("state", state.as_str()),
        ]))
        .unwrap();

        assert_eq!(params.response_code, "4/0Ab-code");
        assert_eq!(params.request_hash, "orh_abc");
    }

    #[test]
    fn test_body_round_trip() {
        let state = state_for("orh_abc");
        let pairs = [("code", "c.0d+/x"), ("state", state.as_str())];

        let params = parse_response_body(&form_body(&pairs)).unwrap();
        assert_eq!(params.response_code, "c.0d+/x");
        assert_eq!(params.request_hash, "orh_abc");

        let form = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish();
        let padded = URL_SAFE_PADDED.encode(form);
        assert_eq!(parse_response_body(&padded).unwrap(), params);
    }

    #[test]
    fn test_missing_code() {
        let state = state_for("orh_abc");
        let error = parse_response_query_params(&query(&[("state", state.as_str())])).unwrap_err();
        assert!(error.to_string().contains("the `code` parameter was missing"));
    }

    #[test]
    fn test_missing_state_redacts_code() {
        let error =
            parse_response_query_params(&query(&[("code", "super-secret-code")])).unwrap_err();
        let message = error.to_string();

        assert!(message.contains("the `state` parameter was missing"));
        assert!(!message.contains("super-secret-code"));
        assert_eq!(error.metadata().unwrap()["queryParams"]["code"], REDACTED);

        let error = parse_response_body(&form_body(&[("code", "super-secret-code")])).unwrap_err();
        assert!(!error.to_string().contains("super-secret-code"));
        assert_eq!(error.metadata().unwrap()["parsed"]["code"], REDACTED);
    }

    #[test]
    fn test_missing_hash_within_state() {
        let error = parse_response_query_params(&query(&[
            ("code", "abc"),
            ("state", "nonce=123"),
        ]))
        .unwrap_err();

        assert!(error.to_string().contains("the `hash` was missing"));
        assert!(!error.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_invalid_body_encoding() {
        let error = parse_response_body("%%%not base64%%%").unwrap_err();
        assert_eq!(error.kind(), crate::OidcErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_parse_get_callback() {
        let verifier = SharedSecretVerifier::new(TEST_SESSION_SECRET);
        let state = state_for("orh_abc");
        let mut callback = callback(Method::GET);
        callback.query_params = Some(query(&[("code", "abc"), ("state", state.as_str())]));

        let claims = parse_authentication_response(&callback, Some(&session()), &verifier)
            .await
            .unwrap();

        assert_eq!(claims.public.response_code, "abc");
        assert_eq!(claims.public.request_hash, "orh_abc");
        assert_eq!(
            claims.public.redirect_uri,
            "https://app.example.com/oidc/callback"
        );
        assert_eq!(claims.secure.request_id.to_string(), REQUEST_ID);
        assert_eq!(claims.secure.session_id, None);
    }

    #[tokio::test]
    async fn test_parse_post_callback() {
        let verifier = SharedSecretVerifier::new(TEST_SESSION_SECRET);
        let state = state_for("orh_abc");
        let mut callback = callback(Method::POST);
        callback.body = Some(form_body(&[("code", "abc"), ("state", state.as_str())]));

        let claims = parse_authentication_response(&callback, Some(&session()), &verifier)
            .await
            .unwrap();
        assert_eq!(claims.public.response_code, "abc");
        assert_eq!(claims.public.request_hash, "orh_abc");
    }

    #[tokio::test]
    async fn test_parse_rejects_missing_inputs() {
        let verifier = SharedSecretVerifier::new(TEST_SESSION_SECRET);

        let error =
            parse_authentication_response(&callback(Method::GET), Some(&session()), &verifier)
                .await
                .unwrap_err();
        assert!(error.to_string().contains("query params must be defined"));

        let error =
            parse_authentication_response(&callback(Method::POST), Some(&session()), &verifier)
                .await
                .unwrap_err();
        assert!(error.to_string().contains("body must be defined"));

        let error =
            parse_authentication_response(&callback(Method::PUT), Some(&session()), &verifier)
                .await
                .unwrap_err();
        assert!(error.to_string().contains("this method is not supported"));
        assert_eq!(error.kind(), crate::OidcErrorKind::Malformed);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_session_cookie_without_session_audience_is_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let verifier = SharedSecretVerifier::new(TEST_SESSION_SECRET);
        let state = state_for("orh_abc");
        let mut callback = callback(Method::POST);
        callback.headers.insert(
            http::header::COOKIE,
            HeaderValue::from_str(&format!(
                "origination={}; authorization=some.session.token",
                REQUEST_ID
            ))
            .unwrap(),
        );
        callback.body = Some(form_body(&[("code", "abc"), ("state", state.as_str())]));

        let claims = parse_authentication_response(&callback, None, &verifier)
            .await
            .unwrap();

        assert_eq!(claims.secure.session_id, None);
        let output = logs.contents();
        assert!(output.contains("WARN"));
        assert!(output.contains("no session audience is configured"));
    }

    #[tokio::test]
    async fn test_anonymous_callback_without_session_audience_is_quiet() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let verifier = SharedSecretVerifier::new(TEST_SESSION_SECRET);
        let state = state_for("orh_abc");
        let mut callback = callback(Method::POST);
        callback.body = Some(form_body(&[("code", "abc"), ("state", state.as_str())]));

        parse_authentication_response(&callback, None, &verifier)
            .await
            .unwrap();
        assert!(!logs.contents().contains("no session audience is configured"));
    }

    #[tokio::test]
    async fn test_parse_checks_cookies_first() {
        let verifier = SharedSecretVerifier::new(TEST_SESSION_SECRET);
        let state = state_for("orh_abc");
        let mut callback = callback(Method::GET);
        callback.headers = HeaderMap::new();
        callback.query_params = Some(query(&[("code", "abc"), ("state", state.as_str())]));

        let error = parse_authentication_response(&callback, Some(&session()), &verifier)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("no `cookies` were provided"));
    }
}
