//! PKCE (RFC 7636) challenge/verifier pairs
//!
//! The verifier stays with the wizard; only the S256 challenge goes into the
//! authorize URL. A new pair is generated for every challenge, including
//! retries after a failed exchange.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::config::SecretString;

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// One-time challenge bound to this wizard session.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: SecretString,
    pub challenge: String,
    /// Opaque value echoed back by the authorization server
    pub state: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; VERIFIER_BYTES];
        let mut state_bytes = [0u8; STATE_BYTES];
        let mut rng = rand::rng();
        rng.fill_bytes(&mut verifier_bytes);
        rng.fill_bytes(&mut state_bytes);

        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let challenge = s256(&verifier);
        Self {
            verifier: SecretString::new(verifier),
            challenge,
            state: URL_SAFE_NO_PAD.encode(state_bytes),
        }
    }

    pub fn method(&self) -> &'static str {
        "S256"
    }
}

/// `BASE64URL(SHA256(verifier))`
pub fn s256(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Standard authorization-code URL with PKCE parameters.
pub fn build_authorize_url(
    authorize_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    pkce: &Pkce,
) -> String {
    format!(
        "{}?code=true&response_type=code&client_id={}&redirect_uri={}&scope={}&code_challenge={}&code_challenge_method={}&state={}",
        authorize_endpoint,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(scope),
        pkce.challenge,
        pkce.method(),
        pkce.state,
    )
}
