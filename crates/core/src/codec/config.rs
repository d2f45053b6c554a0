//! Codec configuration.

use serde::{Deserialize, Serialize};

use super::Category;

/// Configuration for the identifier codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Fixed 3-digit prefix shared by every barcode of the deployment.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Base of the verification reference; the ticket number is appended.
    #[serde(default = "default_verification_base_url")]
    pub verification_base_url: String,

    /// Per-category code and capacity.
    #[serde(default)]
    pub categories: CategoryTable,
}

fn default_prefix() -> String {
    "978".to_string()
}

fn default_verification_base_url() -> String {
    "https://raffle.local/verify/".to_string()
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            verification_base_url: default_verification_base_url(),
            categories: CategoryTable::default(),
        }
    }
}

/// Code and capacity for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// 3-digit code embedded in the barcode.
    pub code: String,
    /// Highest sequence number sold in this category.
    #[serde(default = "default_max_sequence")]
    pub max_sequence: u32,
}

fn default_max_sequence() -> u32 {
    super::MAX_SEQUENCE_CAPACITY
}

impl CategoryConfig {
    pub fn new(code: impl Into<String>, max_sequence: u32) -> Self {
        Self {
            code: code.into(),
            max_sequence,
        }
    }
}

/// Category mapping. A category set to `None` is unmapped in this deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    #[serde(rename = "A", default)]
    pub a: Option<CategoryConfig>,
    #[serde(rename = "B", default)]
    pub b: Option<CategoryConfig>,
    #[serde(rename = "C", default)]
    pub c: Option<CategoryConfig>,
    #[serde(rename = "D", default)]
    pub d: Option<CategoryConfig>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            a: Some(CategoryConfig::new("001", default_max_sequence())),
            b: Some(CategoryConfig::new("002", default_max_sequence())),
            c: Some(CategoryConfig::new("003", default_max_sequence())),
            d: Some(CategoryConfig::new("004", default_max_sequence())),
        }
    }
}

impl CategoryTable {
    /// Configuration for `category`, if mapped.
    pub fn get(&self, category: Category) -> Option<&CategoryConfig> {
        match category {
            Category::A => self.a.as_ref(),
            Category::B => self.b.as_ref(),
            Category::C => self.c.as_ref(),
            Category::D => self.d.as_ref(),
        }
    }

    /// Mapped categories with their configuration.
    pub fn entries(&self) -> impl Iterator<Item = (Category, &CategoryConfig)> {
        Category::ALL
            .into_iter()
            .filter_map(|c| self.get(c).map(|cfg| (c, cfg)))
    }
}
