//! Sharing domain models.

use serde::{Deserialize, Serialize};

use crate::location::ProfileSnapshot;

/// Everything a background invocation needs to publish a position without the
/// app in the foreground.
///
/// Persisted locally while sharing is enabled. The background task may run
/// in a fresh process, so this is the only state it can rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingContext {
    pub user_id: String,
    pub profile: ProfileSnapshot,
    /// Whether the user opted into background updates. Contexts written
    /// before this field existed read as foreground only.
    #[serde(default)]
    pub background: bool,
}

impl SharingContext {
    pub fn new(user_id: impl Into<String>, profile: ProfileSnapshot) -> Self {
        Self {
            user_id: user_id.into(),
            profile,
            background: false,
        }
    }

    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }
}

/// Lifecycle of location sharing for the signed-in user.
///
/// ```text
/// Disabled -> Enabling -> Sharing -> Disabling -> Disabled
///                           |
///                           +-> Error -> Disabled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingState {
    #[default]
    Disabled,
    Enabling,
    Sharing,
    Disabling,
    Error,
}

impl SharingState {
    /// Returns true while producers may be writing positions.
    pub fn is_sharing(&self) -> bool {
        matches!(self, SharingState::Sharing)
    }

    /// Returns true while an enable or disable is in progress.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, SharingState::Enabling | SharingState::Disabling)
    }
}
