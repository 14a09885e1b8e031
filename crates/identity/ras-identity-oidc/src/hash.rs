//! Request hash binding an authorization request to its response.
//!
//! The hash is carried through the provider in the `state` parameter and
//! recomputed on callback from values that only the browser's own cookies can
//! supply. A response whose claimed hash does not match was not started by
//! this browser.

use crate::error::{OidcError, OidcResult};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

const REQUEST_HASH_PREFIX: &str = "orh";
const REQUEST_HASH_PURPOSE: &str = "oidcRequestHash";

/// Deterministic, purpose tagged SHA-256 fingerprint of `(request_id, session_id)`.
///
/// The purpose is part of the hashed payload, so two derivations over the same
/// inputs never produce the same digest.
pub(crate) fn fingerprint(
    prefix: &str,
    purpose: &str,
    request_id: &Uuid,
    session_id: Option<&str>,
) -> String {
    let digest = Sha256::digest(fingerprint_payload(purpose, request_id, session_id).as_bytes());
    format!("{}_{:x}", prefix, digest)
}

/// Compact JSON hashed by [`fingerprint`].
fn fingerprint_payload(purpose: &str, request_id: &Uuid, session_id: Option<&str>) -> String {
    serde_json::json!({
        "purpose": purpose,
        "requestId": request_id.hyphenated().to_string(),
        "sessionId": session_id,
    })
    .to_string()
}

/// Compute the request hash placed into `state` when the flow starts.
pub fn compute_request_hash(request_id: &Uuid, session_id: Option<&str>) -> String {
    fingerprint(
        REQUEST_HASH_PREFIX,
        REQUEST_HASH_PURPOSE,
        request_id,
        session_id,
    )
}

/// Verify that the publicly claimed hash was computed from the secure claims.
///
/// A mismatch halts the flow; there is no soft failure.
pub fn verify_request_hash(
    claimed_hash: &str,
    request_id: &Uuid,
    session_id: Option<&str>,
) -> OidcResult<()> {
    let expected_hash = compute_request_hash(request_id, session_id);

    if expected_hash != claimed_hash {
        warn!(
            hash_expected = %expected_hash,
            hash_claimed = %claimed_hash,
            "oidc request hash mismatch"
        );
        return Err(OidcError::potential_attack_with(
            "The public claims do not match the response's secure claims. Can not verify this responder has ownership of the response's secure claims. Halting to eliminate potential CSRF and parameter injection vulnerabilities.",
            serde_json::json!({
                "hashExpected": expected_hash,
                "hashClaimed": claimed_hash,
            }),
        ));
    }

    Ok(())
}
