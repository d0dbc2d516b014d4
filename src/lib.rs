//! setupflow - Orchestration core for a guided first-run setup wizard
//!
//! Drives a multi-step onboarding flow: which pages are shown for the current
//! connection mode, where the user is, and which background monitors run
//! while a page is visible.
//!
//! ## Features
//!
//! - **Page planning:** Deterministic page order per connection mode and bootstrap state
//! - **Cancellable monitors:** Permission, peer-discovery and clipboard pollers tied to page visits
//! - **OAuth code capture:** PKCE challenge, clipboard auto-detection, and code exchange
//! - **Single writer:** Monitor results are merged through one channel, stale results are dropped
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the pages planned for a local setup that needs bootstrapping
//! setupflow plan --mode local --bootstrap
//!
//! # Check whether onboarding would be shown on next launch
//! setupflow status
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod onboarding;

// Re-export commonly used types
pub use error::{CollaboratorError, WizardError};
pub use onboarding::{
    AuthFlowState, ConnectionMode, Navigation, WizardOrchestrator, WizardPage, page_order,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
