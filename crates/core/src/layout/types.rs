//! Placement types.

use serde::{Deserialize, Serialize};

/// Which side of the paper a placement is printed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    Front,
    Back,
}

/// Grid position of a ticket on its sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPosition {
    /// Sheet index.
    pub page_index: u32,
    /// Position on the sheet, row-major.
    pub pos_on_page: u32,
    pub row: u32,
    pub column: u32,
    /// Top-left corner of the cell on the front page.
    pub x: u32,
    pub y: u32,
}

/// Rectangle where one ticket face is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Index of the ticket in the laid-out sequence.
    pub ticket_index: usize,
    /// Sheet index. Front and back of a ticket share it.
    pub page_index: u32,
    /// Physical page in the output document.
    pub physical_page: u32,
    pub row: u32,
    pub column: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub face: Face,
    pub is_stub: bool,
}

/// Horizontal perforation line between main sections and stubs of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerforationGuide {
    pub physical_page: u32,
    pub y: u32,
    pub x_start: u32,
    pub x_end: u32,
}

/// Complete layout of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPlan {
    /// Placements grouped by sheet: fronts and stubs, then backs.
    pub placements: Vec<Placement>,
    /// Number of sheets used.
    pub sheets: u32,
    /// Number of physical pages (sheets times sides).
    pub physical_pages: u32,
    /// Perforation guides for the used rows.
    pub perforations: Vec<PerforationGuide>,
}

impl LayoutPlan {
    /// Placements belonging to ticket `index`.
    pub fn faces_of(&self, index: usize) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(move |p| p.ticket_index == index)
    }

    /// Placements on physical page `page`.
    pub fn on_physical_page(&self, page: u32) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(move |p| p.physical_page == page)
    }
}
