//! Location permission checks and requests.

use std::sync::Arc;

use nearby_core::error::{NearbyError, PermissionDeniedReason, Result};
use nearby_core::platform::{LocationPermissionProvider, PermissionStatus, PermissionTier};

/// Thin gate over the OS permission API.
///
/// Holds no state and always asks the OS. A request is only issued when the
/// OS can still show a prompt (`Undetermined` or `Denied`), and at most once
/// per `ensure_*` call, so callers never loop-prompt; a `Blocked` tier is
/// reported immediately so the UI can point the user at system settings.
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn LocationPermissionProvider>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn LocationPermissionProvider>) -> Self {
        Self { provider }
    }

    pub async fn check_foreground(&self) -> PermissionStatus {
        self.check(PermissionTier::Foreground).await
    }

    pub async fn request_foreground(&self) -> PermissionStatus {
        self.request(PermissionTier::Foreground).await
    }

    pub async fn check_background(&self) -> PermissionStatus {
        self.check(PermissionTier::Background).await
    }

    pub async fn request_background(&self) -> PermissionStatus {
        self.request(PermissionTier::Background).await
    }

    /// Reads the status without prompting. Platform errors read as `Denied`.
    pub async fn check(&self, tier: PermissionTier) -> PermissionStatus {
        match self.provider.check(tier).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("[PermissionGate] Failed to check {:?} permission: {}", tier, e);
                PermissionStatus::Denied
            }
        }
    }

    /// Prompts the user. Platform errors read as `Denied`.
    pub async fn request(&self, tier: PermissionTier) -> PermissionStatus {
        match self.provider.request(tier).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("[PermissionGate] Failed to request {:?} permission: {}", tier, e);
                PermissionStatus::Denied
            }
        }
    }

    /// Returns true if `tier` is already granted. Never prompts.
    pub async fn is_granted(&self, tier: PermissionTier) -> bool {
        self.check(tier).await.is_granted()
    }

    /// Makes sure foreground access is granted, prompting at most once.
    pub async fn ensure_foreground(&self) -> Result<()> {
        self.ensure(PermissionTier::Foreground).await
    }

    /// Makes sure background access is granted, prompting at most once.
    ///
    /// Foreground access is a precondition and is never requested here.
    pub async fn ensure_background(&self) -> Result<()> {
        if !self.is_granted(PermissionTier::Foreground).await {
            return Err(NearbyError::permission_denied(
                PermissionTier::Background,
                PermissionDeniedReason::ForegroundRequired,
            ));
        }
        self.ensure(PermissionTier::Background).await
    }

    async fn ensure(&self, tier: PermissionTier) -> Result<()> {
        let status = match self.check(tier).await {
            PermissionStatus::Granted => return Ok(()),
            PermissionStatus::Blocked => PermissionStatus::Blocked,
            PermissionStatus::Undetermined | PermissionStatus::Denied => {
                tracing::info!("[PermissionGate] Requesting {:?} location permission", tier);
                self.request(tier).await
            }
        };

        match status {
            PermissionStatus::Granted => Ok(()),
            PermissionStatus::Blocked => Err(NearbyError::permission_denied(
                tier,
                PermissionDeniedReason::Blocked,
            )),
            PermissionStatus::Undetermined | PermissionStatus::Denied => Err(
                NearbyError::permission_denied(tier, PermissionDeniedReason::Denied),
            ),
        }
    }
}
