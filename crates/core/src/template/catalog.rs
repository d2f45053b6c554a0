//! Read-only template registry.

use std::collections::HashMap;

use tracing::debug;

use super::{BackSide, CellSize, DuplexSplit, Margins, PageSize, PaperTemplate, TemplateError};

/// Immutable registry of paper templates, loaded once at startup.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<PaperTemplate>,
    index: HashMap<String, usize>,
}

impl TemplateCatalog {
    /// Builds a catalog from `templates`, validating every entry.
    pub fn new(templates: Vec<PaperTemplate>) -> Result<Self, TemplateError> {
        let mut index = HashMap::with_capacity(templates.len());
        for (i, template) in templates.iter().enumerate() {
            template.validate()?;
            if index.insert(template.name.clone(), i).is_some() {
                return Err(TemplateError::Duplicate(template.name.clone()));
            }
        }
        debug!(count = templates.len(), "Template catalog loaded");
        Ok(Self { templates, index })
    }

    /// Catalog of the built-in templates.
    pub fn builtin() -> Self {
        Self::new(builtin_templates()).expect("built-in templates are valid")
    }

    /// Built-in templates followed by `extra` configured ones.
    pub fn with_extra(extra: Vec<PaperTemplate>) -> Result<Self, TemplateError> {
        let mut templates = builtin_templates();
        templates.extend(extra);
        Self::new(templates)
    }

    /// Looks up a template by name.
    pub fn get(&self, name: &str) -> Result<&PaperTemplate, TemplateError> {
        self.index
            .get(name)
            .map(|&i| &self.templates[i])
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }

    /// Whether a template with that name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All templates in load order.
    pub fn iter(&self) -> impl Iterator<Item = &PaperTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn builtin_templates() -> Vec<PaperTemplate> {
    vec![
        PaperTemplate {
            name: "a4-stub-2x5".to_string(),
            description: "A4, 10 tickets with tear-off stub below the perforation".to_string(),
            page: PageSize::A4,
            cell: CellSize {
                width: 280,
                height: 160,
            },
            columns: 2,
            rows: 5,
            margins: Margins {
                top: 21,
                right: 18,
                bottom: 21,
                left: 17,
            },
            duplex: Some(DuplexSplit {
                main_section_height: 112,
                stub_section_height: 48,
            }),
            back_side: BackSide::None,
        },
        PaperTemplate {
            name: "a4-grid-3x8".to_string(),
            description: "A4, 24 single-sided tickets".to_string(),
            page: PageSize::A4,
            cell: CellSize {
                width: 195,
                height: 100,
            },
            columns: 3,
            rows: 8,
            margins: Margins {
                top: 21,
                right: 5,
                bottom: 21,
                left: 5,
            },
            duplex: None,
            back_side: BackSide::None,
        },
        PaperTemplate {
            name: "a4-portrait-1x4".to_string(),
            description: "A4, 4 large tickets with stub, verification code on the back".to_string(),
            page: PageSize::A4,
            cell: CellSize {
                width: 555,
                height: 200,
            },
            columns: 1,
            rows: 4,
            margins: Margins {
                top: 21,
                right: 20,
                bottom: 21,
                left: 20,
            },
            duplex: Some(DuplexSplit {
                main_section_height: 150,
                stub_section_height: 50,
            }),
            back_side: BackSide::SeparatePage,
        },
        PaperTemplate {
            name: "letter-duplex-2x4".to_string(),
            description: "US Letter, 8 tickets with stub, duplex back page".to_string(),
            page: PageSize::LETTER,
            cell: CellSize {
                width: 288,
                height: 180,
            },
            columns: 2,
            rows: 4,
            margins: Margins {
                top: 36,
                right: 18,
                bottom: 36,
                left: 18,
            },
            duplex: Some(DuplexSplit {
                main_section_height: 130,
                stub_section_height: 50,
            }),
            back_side: BackSide::SeparatePage,
        },
    ]
}
