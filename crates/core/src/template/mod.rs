//! Paper templates: named, immutable page geometries.
//!
//! All lengths are in PostScript points (1/72 inch). The catalog checks every
//! entry's geometry once at load, never per request.

mod catalog;
mod error;
mod types;

pub use catalog::TemplateCatalog;
pub use error::TemplateError;
pub use types::{BackSide, CellSize, DuplexSplit, Margins, PageSize, PaperTemplate};
