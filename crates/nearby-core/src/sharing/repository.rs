//! Sharing state repository trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::sharing::model::SharingContext;

/// Durable storage for the sharing toggle and the background execution
/// context.
///
/// Reads never fail: unset, unreadable or malformed values are reported as
/// absent (`false` / `None`) so that a damaged store fails safe to "not
/// sharing".
#[async_trait]
pub trait SharingStateRepository: Send + Sync {
    /// Persists the user's last explicit toggle choice.
    async fn set_preference(&self, enabled: bool) -> Result<()>;

    /// Returns the last toggle choice, `false` if unset or corrupt.
    async fn get_preference(&self) -> bool;

    /// Persists the context the background task and launch resume read.
    async fn save_context(&self, context: &SharingContext) -> Result<()>;

    /// Loads the persisted context, `None` if absent or corrupt.
    async fn load_context(&self) -> Option<SharingContext>;

    /// Removes the persisted context.
    async fn clear_context(&self) -> Result<()>;
}
