//! Deterministic PKCE (RFC 7636) derivation.
//!
//! The verifier is recomputed on callback from the same secure claims the
//! request hash uses, so nothing has to be persisted between the redirect and
//! the code exchange.

use crate::hash::fingerprint;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const CODE_CHALLENGE_METHOD: &str = "S256";

const CODE_VERIFIER_PREFIX: &str = "opcv";
const CODE_VERIFIER_PURPOSE: &str = "oidcPkceCodeVerifier";

/// PKCE code verifier and challenge for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: &'static str,
}

impl PkceChallenge {
    pub fn for_request(request_id: &Uuid, session_id: Option<&str>) -> Self {
        let code_verifier = compute_pkce_code_verifier(request_id, session_id);
        let code_challenge = compute_pkce_code_challenge(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: CODE_CHALLENGE_METHOD,
        }
    }
}

pub fn compute_pkce_code_verifier(request_id: &Uuid, session_id: Option<&str>) -> String {
    fingerprint(
        CODE_VERIFIER_PREFIX,
        CODE_VERIFIER_PURPOSE,
        request_id,
        session_id,
    )
}

/// `S256` challenge: base64url of the raw SHA-256 digest, unpadded.
pub fn compute_pkce_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let result = hasher.finalize();
    URL_SAFE_NO_PAD.encode(result)
}
