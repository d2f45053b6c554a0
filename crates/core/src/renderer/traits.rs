use async_trait::async_trait;

use super::{RenderRequest, RenderedImage, RendererError};

/// Produces a barcode or matrix-code image for one placement.
///
/// Implementations may fail per call; callers apply their own timeout and
/// retry policy.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    /// Returns the name of this renderer implementation.
    fn name(&self) -> &str;

    /// Renders `request.payload` into an image of the requested size.
    async fn render(&self, request: RenderRequest) -> Result<RenderedImage, RendererError>;
}
