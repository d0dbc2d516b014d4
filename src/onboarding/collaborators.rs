//! External collaborators
//!
//! The wizard never talks to the OS, the network, or the discovery transport
//! directly. Hosts implement these traits; tests use in-memory mocks.

use async_trait::async_trait;

use super::pkce::Pkce;
use super::types::{PeerProbeResult, PermissionKind, PermissionStatus};
use crate::config::SecretString;
use crate::error::Result;

/// Finds the local service process the app expects to be talking to.
///
/// May be slow; every call is bounded by the peer monitor's timeout and
/// abandoned when the connection page is left.
#[async_trait]
pub trait PeerDiscovery: Send + Sync {
    async fn find_expected_peer(&self) -> Result<Option<PeerProbeResult>>;
}

/// Reads OS-level permission grants.
#[async_trait]
pub trait PermissionProbe: Send + Sync {
    async fn status(&self, kind: PermissionKind) -> Result<PermissionStatus>;
}

/// Shared system clipboard.
pub trait Clipboard: Send + Sync {
    fn current_text(&self) -> Option<String>;

    /// Monotonically increasing on every clipboard mutation.
    fn change_counter(&self) -> u64;

    /// Counter and text from the same clipboard state, or `None` when the
    /// clipboard changed while it was being read.
    fn snapshot(&self) -> Option<(u64, Option<String>)> {
        let before = self.change_counter();
        let text = self.current_text();
        (self.change_counter() == before).then_some((before, text))
    }
}

/// Credentials returned by a successful exchange.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_in_secs: Option<u64>,
}

/// Remote authorization server.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Start a new PKCE session. The default generates a fresh S256 pair.
    fn begin_challenge(&self) -> Result<Pkce> {
        Ok(Pkce::generate())
    }

    /// URL the user opens to obtain a code for this challenge.
    fn authorize_url(&self, pkce: &Pkce) -> String;

    /// Exchange a code for credentials. Persisting the grant is the
    /// provider's job.
    async fn exchange(&self, code: &SecretString, verifier: &SecretString) -> Result<AuthGrant>;
}
