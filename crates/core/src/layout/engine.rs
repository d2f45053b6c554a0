//! Placement computation.

use super::{CellPosition, Face, LayoutPlan, PerforationGuide, Placement};
use crate::template::PaperTemplate;

/// Stateless layout engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageLayoutEngine;

impl PageLayoutEngine {
    pub fn new() -> Self {
        Self
    }

    /// Number of sheets needed for `ticket_count` tickets.
    pub fn sheet_count(&self, ticket_count: usize, template: &PaperTemplate) -> u32 {
        let per_page = template.tickets_per_page() as usize;
        ticket_count.div_ceil(per_page) as u32
    }

    /// Grid position of ticket `index` (0-based).
    pub fn cell_position(&self, index: usize, template: &PaperTemplate) -> CellPosition {
        let per_page = template.tickets_per_page() as usize;
        let page_index = (index / per_page) as u32;
        let pos_on_page = (index % per_page) as u32;
        let column = pos_on_page % template.columns;
        let row = pos_on_page / template.columns;

        CellPosition {
            page_index,
            pos_on_page,
            row,
            column,
            x: template.margins.left + column * template.cell.width,
            y: template.margins.top + row * template.cell.height,
        }
    }

    /// Placements for every face of `tickets`, in order.
    pub fn layout<T>(&self, tickets: &[T], template: &PaperTemplate) -> Vec<Placement> {
        self.plan(tickets.len(), template).placements
    }

    /// Full layout of `ticket_count` tickets: placements, page counts and
    /// perforation guides.
    pub fn plan(&self, ticket_count: usize, template: &PaperTemplate) -> LayoutPlan {
        if ticket_count == 0 {
            return LayoutPlan::default();
        }

        let per_page = template.tickets_per_page() as usize;
        let sheets = self.sheet_count(ticket_count, template);
        let sides = template.pages_per_sheet();
        let faces_per_ticket =
            1 + template.has_duplex() as usize + template.has_back_page() as usize;

        let mut placements = Vec::with_capacity(ticket_count * faces_per_ticket);
        let mut perforations = Vec::new();

        for sheet in 0..sheets {
            let first = sheet as usize * per_page;
            let last = (first + per_page).min(ticket_count);
            let front_page = sheet * sides;

            for index in first..last {
                let cell = self.cell_position(index, template);
                placements.extend(self.front_faces(index, &cell, front_page, template));
            }

            if template.has_back_page() {
                let back_page = front_page + 1;
                for index in first..last {
                    let cell = self.cell_position(index, template);
                    placements.push(self.back_face(index, &cell, back_page, template));
                }
            }

            if let Some(offset) = template.perforation_offset() {
                perforations.extend(self.perforation_guides(
                    last - first,
                    front_page,
                    offset,
                    template,
                ));
            }
        }

        LayoutPlan {
            placements,
            sheets,
            physical_pages: sheets * sides,
            perforations,
        }
    }

    fn front_faces(
        &self,
        index: usize,
        cell: &CellPosition,
        physical_page: u32,
        template: &PaperTemplate,
    ) -> Vec<Placement> {
        let base = Placement {
            ticket_index: index,
            page_index: cell.page_index,
            physical_page,
            row: cell.row,
            column: cell.column,
            x: cell.x,
            y: cell.y,
            width: template.cell.width,
            height: template.cell.height,
            face: Face::Front,
            is_stub: false,
        };

        match template.duplex {
            None => vec![base],
            Some(split) => vec![
                Placement {
                    height: split.main_section_height,
                    ..base
                },
                Placement {
                    y: cell.y + split.main_section_height,
                    height: split.stub_section_height,
                    is_stub: true,
                    ..base
                },
            ],
        }
    }

    /// The back covers the main section only; stubs are torn off.
    fn back_face(
        &self,
        index: usize,
        cell: &CellPosition,
        physical_page: u32,
        template: &PaperTemplate,
    ) -> Placement {
        let height = template
            .duplex
            .map(|d| d.main_section_height)
            .unwrap_or(template.cell.height);

        Placement {
            ticket_index: index,
            page_index: cell.page_index,
            physical_page,
            row: cell.row,
            column: cell.column,
            x: template.page.width - cell.x - template.cell.width,
            y: cell.y,
            width: template.cell.width,
            height,
            face: Face::Back,
            is_stub: false,
        }
    }

    fn perforation_guides(
        &self,
        tickets_on_sheet: usize,
        physical_page: u32,
        offset: u32,
        template: &PaperTemplate,
    ) -> Vec<PerforationGuide> {
        let columns = template.columns as usize;
        let used_rows = tickets_on_sheet.div_ceil(columns);

        (0..used_rows)
            .map(|row| {
                let in_row = (tickets_on_sheet - row * columns).min(columns) as u32;
                let y = template.margins.top + row as u32 * template.cell.height + offset;
                PerforationGuide {
                    physical_page,
                    y,
                    x_start: template.margins.left,
                    x_end: template.margins.left + in_row * template.cell.width,
                }
            })
            .collect()
    }
}
