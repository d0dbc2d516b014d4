use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// How the app reaches its backing service. Owned by the host's app state;
/// the wizard only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    Remote,
    Unconfigured,
    Local,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Unconfigured => "unconfigured",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionMode {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "unconfigured" | "none" => Ok(Self::Unconfigured),
            "local" => Ok(Self::Local),
            other => Err(WizardError::UnknownMode(other.to_string())),
        }
    }
}

/// A wizard step. Discriminants are the stable page ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum WizardPage {
    Welcome = 0,
    Connection = 1,
    Auth = 2,
    AdvancedConnection = 3,
    CliInstall = 4,
    Permissions = 5,
    Workspace = 6,
    ChannelSetup = 7,
    Chat = 8,
    Finish = 9,
}

impl WizardPage {
    pub const ALL: [WizardPage; 10] = [
        Self::Welcome,
        Self::Connection,
        Self::Auth,
        Self::AdvancedConnection,
        Self::CliInstall,
        Self::Permissions,
        Self::Workspace,
        Self::ChannelSetup,
        Self::Chat,
        Self::Finish,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self, WizardError> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or(WizardError::UnknownPage(id))
    }

    /// Step title
    pub fn title(&self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Connection => "Choose your connection",
            Self::Auth => "Connect your account",
            Self::AdvancedConnection => "Advanced connection",
            Self::CliInstall => "Install the command-line helper",
            Self::Permissions => "Grant permissions",
            Self::Workspace => "Pick a workspace",
            Self::ChannelSetup => "Connect chat channels",
            Self::Chat => "Meet your assistant",
            Self::Finish => "All set",
        }
    }
}

impl fmt::Display for WizardPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Welcome => "welcome",
            Self::Connection => "connection",
            Self::Auth => "auth",
            Self::AdvancedConnection => "advanced",
            Self::CliInstall => "cli",
            Self::Permissions => "permissions",
            Self::Workspace => "workspace",
            Self::ChannelSetup => "channels",
            Self::Chat => "chat",
            Self::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// Result of a navigation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Position changed; the page now shown
    Moved(WizardPage),
    /// Already at the boundary, nothing changed
    Unchanged,
    /// `advance()` on the last page: onboarding is complete
    Finished,
}

/// Authentication sub-flow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFlowState {
    #[default]
    Idle,
    ChallengeIssued,
    AwaitingCode,
    Exchanging,
    Connected,
    Failed,
}

impl AuthFlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// One clipboard observation: the change counter and, when the content is
/// new and looks like an authorization code, that code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    pub change_counter: u64,
    pub code: Option<String>,
}

/// What discovery reports about the local service process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerProbeResult {
    pub port: u16,
    pub pid: u32,
    pub command: String,
    /// Whether the process is the one app state expects to be running
    pub matches_expected: bool,
}

/// OS permissions the wizard asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Notifications,
    Accessibility,
    ScreenRecording,
    Microphone,
    SpeechRecognition,
    Automation,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 6] = [
        Self::Notifications,
        Self::Accessibility,
        Self::ScreenRecording,
        Self::Microphone,
        Self::SpeechRecognition,
        Self::Automation,
    ];

    /// Kinds that must be granted before "Next" is enabled on the
    /// permissions page. The rest are optional capabilities.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Notifications | Self::Accessibility)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Notifications => "Notifications",
            Self::Accessibility => "Accessibility",
            Self::ScreenRecording => "Screen Recording",
            Self::Microphone => "Microphone",
            Self::SpeechRecognition => "Speech Recognition",
            Self::Automation => "Automation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

pub type PermissionSnapshot = BTreeMap<PermissionKind, PermissionStatus>;

/// Background monitor classes. At most one live handle per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MonitorKind {
    Permissions,
    PeerProbe,
    Clipboard,
    /// The in-flight authorization code exchange
    AuthExchange,
}

impl MonitorKind {
    pub fn page(&self) -> WizardPage {
        match self {
            Self::Permissions => WizardPage::Permissions,
            Self::PeerProbe => WizardPage::Connection,
            Self::Clipboard | Self::AuthExchange => WizardPage::Auth,
        }
    }
}
