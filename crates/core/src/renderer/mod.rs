//! Image renderer boundary.
//!
//! Pixels are drawn by an external service. This module defines what is sent
//! to it (payload, symbology, target rectangle) and ships an HTTP client for
//! a renderer reachable over the network.

mod error;
mod http;
mod traits;
mod types;

pub use error::RendererError;
pub use http::HttpImageRenderer;
pub use traits::ImageRenderer;
pub use types::{RenderRequest, RenderedImage, Symbology};
