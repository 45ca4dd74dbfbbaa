use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The two independent location grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionTier {
    /// "While in use".
    Foreground,
    /// "Always". Only meaningful once foreground access is granted.
    Background,
}

/// Current answer of the OS for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    /// Never asked; a request will show the consent prompt.
    Undetermined,
    /// Declined, but the OS may prompt again.
    Denied,
    /// Declined permanently; only the system settings can change it.
    Blocked,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// OS permission API.
#[async_trait]
pub trait LocationPermissionProvider: Send + Sync {
    /// Reads the current status without prompting.
    async fn check(&self, tier: PermissionTier) -> Result<PermissionStatus>;

    /// Shows the consent prompt if the OS allows it and waits for the answer.
    async fn request(&self, tier: PermissionTier) -> Result<PermissionStatus>;
}
