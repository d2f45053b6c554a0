//! Paper template geometry.

use serde::{Deserialize, Serialize};

use super::TemplateError;

/// Physical page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width: 595,
        height: 842,
    };
    pub const LETTER: PageSize = PageSize {
        width: 612,
        height: 792,
    };
}

/// Size of one ticket cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSize {
    pub width: u32,
    pub height: u32,
}

/// Page margins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// Split of a ticket cell into the customer-kept main section and the
/// seller-kept stub, separated by a perforation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplexSplit {
    pub main_section_height: u32,
    pub stub_section_height: u32,
}

/// Where the back faces of tickets go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackSide {
    /// Front only.
    #[default]
    None,
    /// Back faces on the following physical page, mirrored for long-edge
    /// duplex printing.
    SeparatePage,
}

/// A named physical layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub page: PageSize,
    pub cell: CellSize,
    pub columns: u32,
    pub rows: u32,
    #[serde(default)]
    pub margins: Margins,
    #[serde(default)]
    pub duplex: Option<DuplexSplit>,
    #[serde(default)]
    pub back_side: BackSide,
}

impl PaperTemplate {
    /// Cells per sheet.
    pub fn tickets_per_page(&self) -> u32 {
        self.columns * self.rows
    }

    /// Whether cells are split into main section and stub.
    pub fn has_duplex(&self) -> bool {
        self.duplex.is_some()
    }

    /// Whether a perforation guide is drawn between main section and stub.
    pub fn has_perforation(&self) -> bool {
        self.duplex.is_some()
    }

    /// Whether back faces are printed on a separate physical page.
    pub fn has_back_page(&self) -> bool {
        self.back_side == BackSide::SeparatePage
    }

    /// Offset of the perforation line from the top of the cell.
    pub fn perforation_offset(&self) -> Option<u32> {
        self.duplex.map(|d| d.main_section_height)
    }

    /// Physical pages per sheet.
    pub fn pages_per_sheet(&self) -> u32 {
        if self.has_back_page() {
            2
        } else {
            1
        }
    }

    /// Checks the geometry contract: cells tile the page exactly within the
    /// margins, the duplex split sums to the cell height, and back pages can
    /// be mirrored onto their fronts.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let invalid = |reason: String| TemplateError::InvalidGeometry {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        if self.columns == 0 || self.rows == 0 {
            return Err(invalid("columns and rows must be positive".to_string()));
        }
        if self.cell.width == 0 || self.cell.height == 0 {
            return Err(invalid("cell dimensions must be positive".to_string()));
        }
        if self.columns.checked_mul(self.rows).is_none() {
            return Err(invalid("too many cells per page".to_string()));
        }

        let used_width = tiled_extent(
            self.margins.left,
            self.columns,
            self.cell.width,
            self.margins.right,
        )
        .ok_or_else(|| invalid("horizontal extent overflows".to_string()))?;
        if used_width != self.page.width {
            return Err(invalid(format!(
                "{} columns of {} plus margins {}+{} = {}, page width is {}",
                self.columns,
                self.cell.width,
                self.margins.left,
                self.margins.right,
                used_width,
                self.page.width
            )));
        }

        let used_height = tiled_extent(
            self.margins.top,
            self.rows,
            self.cell.height,
            self.margins.bottom,
        )
        .ok_or_else(|| invalid("vertical extent overflows".to_string()))?;
        if used_height != self.page.height {
            return Err(invalid(format!(
                "{} rows of {} plus margins {}+{} = {}, page height is {}",
                self.rows,
                self.cell.height,
                self.margins.top,
                self.margins.bottom,
                used_height,
                self.page.height
            )));
        }

        if let Some(split) = self.duplex {
            if split.main_section_height == 0 || split.stub_section_height == 0 {
                return Err(invalid("duplex sections must be positive".to_string()));
            }
            let split_height = split.main_section_height.checked_add(split.stub_section_height);
            if split_height != Some(self.cell.height) {
                return Err(invalid(format!(
                    "main {} + stub {} does not equal cell height {}",
                    split.main_section_height, split.stub_section_height, self.cell.height
                )));
            }
        }

        if self.has_back_page() && self.margins.left != self.margins.right {
            return Err(invalid(
                "back pages need equal left and right margins to align after duplex".to_string(),
            ));
        }

        Ok(())
    }
}

/// `before + count * size + after`, or `None` if it does not fit in `u32`.
fn tiled_extent(before: u32, count: u32, size: u32, after: u32) -> Option<u32> {
    count.checked_mul(size)?.checked_add(before)?.checked_add(after)
}
