//! What happens on a position tick, regardless of who produced it.

use nearby_core::location::Position;
use nearby_core::sharing::SharingContext;

use crate::publisher::LocationPublisher;

/// Publishes one position on behalf of `context`.
///
/// Shared by the foreground watcher and the background task.
pub async fn publish_tick(
    publisher: &LocationPublisher,
    context: &SharingContext,
    position: &Position,
) -> bool {
    tracing::trace!(
        target: "nearby::tick",
        "Tick for '{}' at ({:.5}, {:.5})",
        context.user_id,
        position.point.latitude,
        position.point.longitude
    );
    publisher
        .write(&context.user_id, &context.profile, position)
        .await
}
