//! Onboarding Wizard
//!
//! Orchestration core for the first-run setup flow: which pages a session
//! shows, where the user is, and which background monitors (permissions,
//! peer discovery, clipboard code capture, auth exchange) run while each
//! page is visible.

mod auth;
mod clipboard;
mod collaborators;
mod monitors;
mod navigation;
mod peer;
mod permissions;
mod pkce;
mod planner;
mod store;
#[cfg(test)]
mod test_helpers;
mod ticker;
mod types;
mod wizard;


// Re-export all public types
pub use types::{
    AuthFlowState, ClipboardSnapshot, ConnectionMode, MonitorKind, Navigation, PeerProbeResult,
    PermissionKind, PermissionSnapshot, PermissionStatus, WizardPage,
};

pub use auth::{AuthFlowMonitor, ExchangeRequest, normalize_code};
pub use clipboard::{ClipboardWatcher, CodeMatcher, DEFAULT_CODE_PATTERN};
pub use collaborators::{AuthGrant, AuthProvider, Clipboard, PeerDiscovery, PermissionProbe};
pub use monitors::{EventSink, MonitorEvent, MonitorPayload};
pub use peer::PeerProbeMonitor;
pub use permissions::{PermissionWatcher, guidance as permission_guidance, required_granted};
pub use pkce::{Pkce, build_authorize_url, s256};
pub use planner::{page_order, reconcile_position};
pub use store::{
    CURRENT_ONBOARDING_VERSION, FileOnboardingStore, MemoryOnboardingStore, NIX_MODE_ENV,
    OnboardingRecord, OnboardingStore, nix_mode_from_env, should_show, should_show_with,
};
pub use ticker::{Clock, ManualClock, MonitorHandle, Ticker, TokioClock};
pub use wizard::{Collaborators, WizardOrchestrator};

#[cfg(feature = "system-clipboard")]
mod system_clipboard;
#[cfg(feature = "system-clipboard")]
pub use system_clipboard::SystemClipboard;
