//! Page layout: where every ticket face lands on paper.
//!
//! Tickets fill each sheet row-major (column varies fastest), starting again
//! at the top-left cell on every sheet. Depending on the template, each
//! ticket yields:
//!
//! - a front placement (the main section when the cell is split),
//! - a stub placement below the perforation line, on the same page,
//! - a back placement on the following physical page, mirrored horizontally
//!   so that it sits behind its front after long-edge duplex printing.
//!
//! Layout is a pure function of the ticket count and the template.

mod engine;
mod types;

pub use engine::PageLayoutEngine;
pub use types::{CellPosition, Face, LayoutPlan, PerforationGuide, Placement};
