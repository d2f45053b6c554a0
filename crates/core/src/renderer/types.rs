use serde::{Deserialize, Serialize};

use crate::layout::{Face, Placement};

/// Kind of code drawn into a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    /// One-dimensional barcode (EAN-13 compatible).
    Linear,
    /// Two-dimensional matrix code (QR).
    Matrix,
}

impl Symbology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbology::Linear => "linear",
            Symbology::Matrix => "matrix",
        }
    }
}

/// One renderer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub job_id: String,
    pub ticket_id: String,
    pub placement: Placement,
    /// String encoded into the image.
    pub payload: String,
    pub symbology: Symbology,
}

impl RenderRequest {
    /// Builds the request for `placement`. Fronts and stubs carry the
    /// canonical barcode as a linear code; backs carry the verification
    /// reference as a matrix code.
    pub fn for_placement(
        job_id: &str,
        ticket_id: &str,
        placement: Placement,
        barcode: &str,
        verification_ref: &str,
    ) -> Self {
        let (payload, symbology) = match placement.face {
            Face::Front => (barcode, Symbology::Linear),
            Face::Back => (verification_ref, Symbology::Matrix),
        };
        Self {
            job_id: job_id.to_string(),
            ticket_id: ticket_id.to_string(),
            placement,
            payload: payload.to_string(),
            symbology,
        }
    }

    pub fn width(&self) -> u32 {
        self.placement.width
    }

    pub fn height(&self) -> u32 {
        self.placement.height
    }
}

/// Image returned by a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub content_type: String,
    pub data: Vec<u8>,
}
